//! Plain-text report bodies

use std::collections::BTreeSet;

use crate::models::{Entity, EntityId};

/// Body sent when a run produced no candidates.
pub const NO_TARGETS: &str = "no targets";

/// One line per candidate: `name(code)` followed by industries when known. Candidates
/// without a reference record fall back to their id. Lines end with `\n`.
pub fn compose_report(candidates: &BTreeSet<EntityId>, entities: &[Entity]) -> String {
    if candidates.is_empty() {
        return NO_TARGETS.to_string();
    }

    let mut body = String::new();
    for id in candidates {
        match entities.iter().find(|e| &e.id == id) {
            Some(entity) => {
                body.push_str(&format!("{}({})", entity.name, entity.code));
                if let Some(ref industries) = entity.industries {
                    body.push(' ');
                    body.push_str(industries);
                }
            }
            None => body.push_str(id),
        }
        body.push('\n');
    }
    body
}
