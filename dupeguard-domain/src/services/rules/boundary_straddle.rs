use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::entities::{ItemTransaction, TransactionKind};
use crate::services::rules::{RuleMatch, SignatureRule};
use crate::value_objects::{ContainerId, MitigationAction, Severity};

/// Item re-appears after a world save from a location it had already left.
pub struct BoundaryStraddleRule {
    horizon_ms: i64,
}

impl BoundaryStraddleRule {
    pub fn new(horizon_ms: i64) -> Self {
        Self { horizon_ms }
    }
}

impl SignatureRule for BoundaryStraddleRule {
    fn name(&self) -> &'static str {
        "boundary-straddle"
    }

    fn default_severity(&self) -> Severity {
        Severity::HIGH
    }

    fn default_action(&self) -> MitigationAction {
        MitigationAction::RemoveItems
    }

    fn horizon_ms(&self) -> i64 {
        self.horizon_ms
    }

    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        for (index, save) in entries.iter().enumerate() {
            if save.kind != TransactionKind::WorldSaveBoundary {
                continue;
            }

            // latest pre-save location per signature; None when it left the actor's hands
            let mut located: HashMap<&str, Option<(&Arc<ItemTransaction>, &ContainerId)>> =
                HashMap::new();
            for tx in entries[..index].iter().rev() {
                if save.timestamp_ms - tx.timestamp_ms > self.horizon_ms
                    || tx.kind == TransactionKind::WorldSaveBoundary
                {
                    break;
                }
                let Some(signature) = tx.signature() else {
                    continue;
                };
                located
                    .entry(signature)
                    .or_insert_with(|| tx.dest_container.as_ref().map(|dest| (tx, dest)));
            }
            if located.is_empty() {
                continue;
            }

            let mut resolved: HashSet<&str> = HashSet::new();
            for tx in &entries[index + 1..] {
                if tx.timestamp_ms - save.timestamp_ms > self.horizon_ms
                    || tx.kind == TransactionKind::WorldSaveBoundary
                {
                    break;
                }
                let Some(signature) = tx.signature() else {
                    continue;
                };
                let Some(Some((before, location))) = located.get(signature) else {
                    continue;
                };
                if !resolved.insert(signature) {
                    continue;
                }
                if tx.timestamp_ms - before.timestamp_ms > self.horizon_ms {
                    continue;
                }
                let Some(source) = tx.source_container.as_ref() else {
                    continue;
                };
                if source == *location {
                    continue;
                }
                let item = tx
                    .item
                    .as_ref()
                    .map(|item| format!("{} x{}", item.item_type, item.quantity))
                    .unwrap_or_default();
                matches.push(RuleMatch {
                    evidence: vec![Arc::clone(before), Arc::clone(save), Arc::clone(tx)],
                    summary: format!(
                        "{} was in {} before the world save at {} but moved out of {} after it",
                        item, location, save.timestamp_ms, source
                    ),
                    action: None,
                });
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rules::test_support::{boundary, container_move, sequences};

    #[test]
    fn move_from_stale_location_after_save_matches() {
        let rule = BoundaryStraddleRule::new(5_000);
        let entries = vec![
            container_move(1, 150, "S", "C1", "C2"),
            boundary(2, 200),
            container_move(3, 201, "S", "C1", "C3"),
        ];
        let matches = rule.evaluate(&entries);
        assert_eq!(matches.len(), 1);
        assert_eq!(sequences(&matches[0].evidence), vec![1, 2, 3]);
    }

    #[test]
    fn move_from_current_location_is_legitimate() {
        let rule = BoundaryStraddleRule::new(5_000);
        let entries = vec![
            container_move(1, 150, "S", "C1", "C2"),
            boundary(2, 200),
            container_move(3, 201, "S", "C2", "C3"),
        ];
        assert!(rule.evaluate(&entries).is_empty());
    }

    #[test]
    fn only_the_first_post_save_touch_counts() {
        let rule = BoundaryStraddleRule::new(5_000);
        let entries = vec![
            container_move(1, 150, "S", "C1", "C2"),
            boundary(2, 200),
            container_move(3, 210, "S", "C2", "C3"),
            container_move(4, 220, "S", "C1", "C4"),
        ];
        assert!(rule.evaluate(&entries).is_empty());
    }

    #[test]
    fn evidence_outside_the_horizon_is_ignored() {
        let rule = BoundaryStraddleRule::new(100);
        let entries = vec![
            container_move(1, 0, "S", "C1", "C2"),
            boundary(2, 200),
            container_move(3, 201, "S", "C1", "C3"),
        ];
        assert!(rule.evaluate(&entries).is_empty());

        let late = vec![
            container_move(1, 150, "S", "C1", "C2"),
            boundary(2, 200),
            container_move(3, 260, "S", "C1", "C3"),
        ];
        assert!(rule.evaluate(&late).is_empty());
    }
}
