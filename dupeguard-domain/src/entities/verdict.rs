// Verdict entity

use std::sync::Arc;

use crate::entities::{AlertEntry, ItemTransaction};
use crate::utils::{millis_to_rfc3339, sha256_hex};
use crate::value_objects::{ActorId, MitigationAction, Severity, VerdictKey};

#[derive(Debug, Clone)]
pub struct Verdict {
    pub key: VerdictKey,
    pub actor_id: ActorId,
    pub rule_name: String,
    pub severity: Severity,
    pub action: MitigationAction,
    pub evidence: Vec<Arc<ItemTransaction>>,
    pub summary: String,
    pub detected_at_ms: i64,
    pub under_scrutiny: bool,
}

impl Verdict {
    pub fn latest_evidence(&self) -> Option<&Arc<ItemTransaction>> {
        self.evidence.last()
    }

    /// Last evidence entry that carries an item, used as the mitigation target.
    pub fn latest_item_evidence(&self) -> Option<&Arc<ItemTransaction>> {
        self.evidence.iter().rev().find(|tx| tx.item.is_some())
    }

    pub fn to_alert_entry(&self) -> AlertEntry {
        let summary = if self.under_scrutiny {
            format!("{} (actor flagged for out-of-order events)", self.summary)
        } else {
            self.summary.clone()
        };
        AlertEntry {
            timestamp: millis_to_rfc3339(self.detected_at_ms),
            actor_id: self.actor_id.0.clone(),
            severity: self.severity,
            rule_name: self.rule_name.clone(),
            evidence_count: self.evidence.len(),
            summary,
        }
    }
}

pub fn verdict_key(actor_id: &ActorId, rule_name: &str, evidence: &[Arc<ItemTransaction>]) -> VerdictKey {
    let mut material = format!("{}|{}", actor_id.0, rule_name);
    for tx in evidence {
        material.push_str(&format!("|{}:{}:{}", tx.sequence, tx.event_id, tx.timestamp_ms));
    }
    VerdictKey(sha256_hex(material.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TransactionKind;

    fn marker(sequence: u64, timestamp_ms: i64) -> Arc<ItemTransaction> {
        Arc::new(ItemTransaction {
            event_id: format!("evt-{}", sequence),
            timestamp_ms,
            actor_id: ActorId::new("p1"),
            kind: TransactionKind::WorldSaveBoundary,
            item: None,
            source_container: None,
            dest_container: None,
            sequence,
        })
    }

    #[test]
    fn verdict_key_depends_on_evidence_and_rule() {
        let actor = ActorId::new("p1");
        let evidence = vec![marker(1, 100), marker(2, 101)];
        let first = verdict_key(&actor, "split-stack-replay", &evidence);
        let again = verdict_key(&actor, "split-stack-replay", &evidence);
        let other_rule = verdict_key(&actor, "boundary-straddle", &evidence);
        let other_evidence = verdict_key(&actor, "split-stack-replay", &evidence[..1]);
        assert_eq!(first, again);
        assert_ne!(first, other_rule);
        assert_ne!(first, other_evidence);
        assert_eq!(first.as_str().len(), 64);
    }
}
