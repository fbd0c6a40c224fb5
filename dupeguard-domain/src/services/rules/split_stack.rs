use std::sync::Arc;

use crate::entities::{ItemTransaction, TransactionKind};
use crate::services::rules::{RuleMatch, SignatureRule};
use crate::value_objects::{MitigationAction, Severity};

/// Same stack moved twice along different container paths in a short window.
pub struct SplitStackRule {
    window_ms: i64,
}

impl SplitStackRule {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms }
    }
}

impl SignatureRule for SplitStackRule {
    fn name(&self) -> &'static str {
        "split-stack-replay"
    }

    fn default_severity(&self) -> Severity {
        Severity::HIGH
    }

    fn default_action(&self) -> MitigationAction {
        MitigationAction::CancelTransaction
    }

    fn horizon_ms(&self) -> i64 {
        self.window_ms
    }

    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch> {
        let mut matches = Vec::new();
        for (index, later) in entries.iter().enumerate() {
            if later.kind != TransactionKind::ContainerMove {
                continue;
            }
            let Some(signature) = later.signature() else {
                continue;
            };
            for earlier in entries[..index].iter().rev() {
                if later.timestamp_ms - earlier.timestamp_ms > self.window_ms {
                    break;
                }
                if earlier.kind != TransactionKind::ContainerMove
                    || earlier.signature() != Some(signature)
                {
                    continue;
                }
                let same_path = earlier.source_container == later.source_container
                    && earlier.dest_container == later.dest_container;
                // moving the stack onward from where it just landed
                let continuation = later.source_container.is_some()
                    && later.source_container == earlier.dest_container;
                if same_path || continuation {
                    continue;
                }
                matches.push(RuleMatch {
                    evidence: vec![Arc::clone(earlier), Arc::clone(later)],
                    summary: format!(
                        "stack moved {} within {}ms of {}",
                        later.describe(),
                        later.timestamp_ms - earlier.timestamp_ms,
                        earlier.describe()
                    ),
                    action: None,
                });
                break;
            }
        }
        matches
    }
}
