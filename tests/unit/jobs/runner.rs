//! Unit tests for the retry/escalation runner

use std::sync::Arc;
use std::time::Duration;

use bullscan::error::ScreenerError;
use bullscan::jobs::{JobOutcome, JobRunner, RetryPolicy, RunnerState, TriggerOutcome};
use bullscan::metrics::Metrics;

use crate::test_utils::{context, RecordingNotifier, ScriptedPipeline};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1)).unwrap()
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[test]
fn retry_policy_defaults_and_validation() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts(), 10);
    assert_eq!(policy.cooldown(), Duration::from_secs(180));

    assert!(matches!(
        RetryPolicy::new(0, Duration::from_secs(1)),
        Err(ScreenerError::Config(_))
    ));
    assert!(matches!(
        RetryPolicy::new(3, Duration::ZERO),
        Err(ScreenerError::Config(_))
    ));
}

#[tokio::test]
async fn always_failing_pipeline_escalates_exactly_once() {
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = Arc::new(ScriptedPipeline::always_failing());
    let runner = JobRunner::new(
        pipeline.clone(),
        Arc::new(context(notifier.clone())),
        fast_policy(10),
    );

    let outcome = runner.trigger().await;

    assert_eq!(outcome, TriggerOutcome::Completed(RunnerState::GaveUpDone));
    assert_eq!(pipeline.calls(), 10);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "scripted failed after 10 attempts");
    assert_eq!(messages[0].recipient, "operator@example.com");
    assert!(messages[0].body.contains("no data available"));

    let last = runner.last_outcome().await.unwrap();
    assert!(!last.succeeded);
    assert_eq!(last.attempts, 10);
}

#[tokio::test]
async fn success_after_transient_failures_sends_one_primary() {
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = Arc::new(ScriptedPipeline::new(2));
    let runner = JobRunner::new(
        pipeline.clone(),
        Arc::new(context(notifier.clone())),
        fast_policy(10),
    );

    let outcome = runner.trigger().await;

    assert_eq!(outcome, TriggerOutcome::Completed(RunnerState::SucceededDone));
    assert_eq!(pipeline.calls(), 3);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "2024-03-01 scripted screen result");
    assert_eq!(messages[0].body, "no targets");

    let last = runner.last_outcome().await.unwrap();
    assert!(last.succeeded);
    assert_eq!(last.attempts, 3);
    assert_eq!(last.candidates, Some(0));
}

#[tokio::test]
async fn success_on_the_last_attempt_is_not_escalated() {
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = Arc::new(ScriptedPipeline::new(2));
    let runner = JobRunner::new(
        pipeline.clone(),
        Arc::new(context(notifier.clone())),
        fast_policy(3),
    );

    assert_eq!(
        runner.trigger().await,
        TriggerOutcome::Completed(RunnerState::SucceededDone)
    );
    assert_eq!(notifier.subjects_containing("failed after"), 0);
    assert_eq!(notifier.subjects_containing("result"), 1);
}

#[tokio::test]
async fn attempts_are_classified_against_the_cap() {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = JobRunner::new(
        Arc::new(ScriptedPipeline::always_failing()),
        Arc::new(context(notifier)),
        fast_policy(3),
    );

    assert!(matches!(
        runner.attempt(1).await,
        JobOutcome::TransientFailure { attempt: 1, .. }
    ));
    assert!(matches!(
        runner.attempt(3).await,
        JobOutcome::Exhausted { attempts: 3, .. }
    ));
}

#[tokio::test]
async fn notifier_failure_is_logged_and_counted() {
    let notifier = Arc::new(RecordingNotifier::failing());
    let metrics = Arc::new(Metrics::new().unwrap());
    let ctx = context(notifier.clone()).with_metrics(metrics.clone());
    let runner = JobRunner::new(Arc::new(ScriptedPipeline::new(0)), Arc::new(ctx), fast_policy(3));

    assert_eq!(
        runner.trigger().await,
        TriggerOutcome::Completed(RunnerState::SucceededDone)
    );
    // one delivery attempt, no retry
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(
        metrics
            .notification_failures_total
            .with_label_values(&["primary"])
            .get(),
        1
    );
}

#[tokio::test]
async fn overlapping_trigger_is_skipped() {
    let notifier = Arc::new(RecordingNotifier::default());
    let metrics = Arc::new(Metrics::new().unwrap());
    let pipeline = Arc::new(ScriptedPipeline::new(0).with_delay(Duration::from_millis(300)));
    let runner = Arc::new(JobRunner::new(
        pipeline.clone(),
        Arc::new(context(notifier.clone()).with_metrics(metrics.clone())),
        fast_policy(3),
    ));

    let first = tokio::spawn({
        let runner = runner.clone();
        async move { runner.trigger().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(runner.is_running());

    assert_eq!(runner.trigger().await, TriggerOutcome::Skipped);
    assert_eq!(
        first.await.unwrap(),
        TriggerOutcome::Completed(RunnerState::SucceededDone)
    );

    assert!(!runner.is_running());
    assert_eq!(pipeline.calls(), 1);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(
        metrics
            .skipped_triggers_total
            .with_label_values(&["scripted"])
            .get(),
        1
    );
}

#[tokio::test]
async fn metrics_track_attempts_and_failures() {
    let notifier = Arc::new(RecordingNotifier::default());
    let metrics = Arc::new(Metrics::new().unwrap());
    let runner = JobRunner::new(
        Arc::new(ScriptedPipeline::new(2)),
        Arc::new(context(notifier).with_metrics(metrics.clone())),
        fast_policy(5),
    );
    runner.trigger().await;

    let job = ["scripted"];
    assert_eq!(metrics.job_runs_total.with_label_values(&job).get(), 1);
    assert_eq!(metrics.job_attempts_total.with_label_values(&job).get(), 3);
    assert_eq!(
        metrics.job_attempt_failures_total.with_label_values(&job).get(),
        2
    );
    assert_eq!(
        metrics.notifications_total.with_label_values(&["primary"]).get(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_wait_out_the_cooldown() {
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = Arc::new(ScriptedPipeline::always_failing());
    let runner = Arc::new(JobRunner::new(
        pipeline.clone(),
        Arc::new(context(notifier.clone())),
        RetryPolicy::new(3, Duration::from_secs(180)).unwrap(),
    ));
    let started = tokio::time::Instant::now();

    let run = tokio::spawn({
        let runner = runner.clone();
        async move { runner.trigger().await }
    });
    settle().await;
    assert_eq!(pipeline.calls(), 1);

    tokio::time::advance(Duration::from_secs(179)).await;
    settle().await;
    assert_eq!(pipeline.calls(), 1, "retried before the cool-down elapsed");

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(pipeline.calls(), 2);

    assert_eq!(
        run.await.unwrap(),
        TriggerOutcome::Completed(RunnerState::GaveUpDone)
    );
    assert_eq!(pipeline.calls(), 3);
    // two pauses: after the first and second failures, none after the last
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(360), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(540), "elapsed {:?}", elapsed);
    assert_eq!(notifier.subjects_containing("failed after 3 attempts"), 1);
}
