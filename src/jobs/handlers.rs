//! Handlers for one screening attempt

use chrono::Duration;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::jobs::context::JobContext;
use crate::jobs::report::compose_report;
use crate::jobs::types::{NotificationKind, ScreeningReport};
use crate::jobs::workflow::ScreeningWorkflow;
use crate::models::Entity;
use crate::signals::{TargetSelector, UniverseBuilder};

/// Run the full pipeline once for `workflow`.
///
/// Any data or computation error propagates to the runner. Watchlist registration is
/// isolated: its failure is reported on its own and the attempt still succeeds.
pub async fn handle_screening(
    workflow: &ScreeningWorkflow,
    ctx: &JobContext,
) -> Result<ScreeningReport> {
    let provider = ctx.data_provider.clone();

    let target_date = provider
        .latest_available_date(workflow.entity_type, workflow.adjust)
        .await?;
    debug!(
        job = %workflow.name,
        target_date = %target_date,
        "Screening: target date {}",
        target_date
    );

    let universe_start = target_date - Duration::days(workflow.universe_lookback_days);
    let pool = UniverseBuilder::new(provider.clone())
        .build(
            workflow.entity_type,
            universe_start,
            target_date,
            workflow.top_fraction,
        )
        .await?;

    let candidates = if pool.is_empty() {
        BTreeSet::new()
    } else {
        let mut selector =
            TargetSelector::new(workflow.history_start, target_date, workflow.mode);
        for factor in workflow.build_factors(provider.clone(), &pool)? {
            selector.add_factor(factor);
        }
        selector.run().await?;
        selector.get_open_long_targets(target_date)?
    };

    let mut entities: Vec<Entity> = Vec::new();
    let mut watchlist_registered = None;

    if !candidates.is_empty() {
        let ids: Vec<_> = candidates.iter().cloned().collect();
        entities = provider
            .entities_by_id(&ctx.reference_provider, workflow.entity_type, &ids)
            .await?;
        // nothing to register without reference codes
        if !entities.is_empty() {
            watchlist_registered = Some(register_candidates(workflow, ctx, &entities).await);
        }
    }

    info!(
        job = %workflow.name,
        target_date = %target_date,
        pool = pool.len(),
        candidates = candidates.len(),
        "Screening: {} found {} candidates out of {} on {}",
        workflow.name,
        candidates.len(),
        pool.len(),
        target_date
    );

    let body = compose_report(&candidates, &entities);
    Ok(ScreeningReport {
        workflow: workflow.name.clone(),
        target_date,
        candidates,
        entities,
        body,
        watchlist_registered,
    })
}

/// Register candidate codes under the workflow's group. A failure sends the side-effect
/// notification and returns `false`; it never fails the attempt.
async fn register_candidates(
    workflow: &ScreeningWorkflow,
    ctx: &JobContext,
    entities: &[Entity],
) -> bool {
    let codes: Vec<String> = entities.iter().map(|e| e.code.clone()).collect();

    match ctx
        .watchlist
        .register(&codes, workflow.entity_type, &workflow.group)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(
                job = %workflow.name,
                group = %workflow.group,
                error = %e,
                "Screening: watchlist registration failed for {}",
                workflow.name
            );
            if let Some(ref metrics) = ctx.metrics {
                metrics
                    .side_effect_failures_total
                    .with_label_values(&[workflow.name.as_str()])
                    .inc();
            }
            let subject = format!("{} watchlist error", workflow.name);
            let body = format!("{} watchlist error: {}", workflow.name, e);
            ctx.notify(NotificationKind::SideEffect, &subject, &body).await;
            false
        }
    }
}
