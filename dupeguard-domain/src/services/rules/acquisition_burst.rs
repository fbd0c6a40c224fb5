use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::entities::ItemTransaction;
use crate::services::rules::{RuleMatch, SignatureRule};
use crate::value_objects::{MitigationAction, Severity};

/// Too much of a limited item acquired inside a sliding window.
pub struct AcquisitionBurstRule {
    window_ms: i64,
    limits: BTreeMap<String, u64>,
}

impl AcquisitionBurstRule {
    pub fn new(window_ms: i64, limits: BTreeMap<String, u64>) -> Self {
        Self { window_ms, limits }
    }
}

#[derive(Default)]
struct Window<'a> {
    entries: VecDeque<&'a Arc<ItemTransaction>>,
    total: u64,
}

impl SignatureRule for AcquisitionBurstRule {
    fn name(&self) -> &'static str {
        "acquisition-burst"
    }

    fn default_severity(&self) -> Severity {
        Severity::LOW
    }

    fn default_action(&self) -> MitigationAction {
        MitigationAction::LogOnly
    }

    fn horizon_ms(&self) -> i64 {
        self.window_ms
    }

    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch> {
        if self.limits.is_empty() {
            return Vec::new();
        }
        let mut windows: HashMap<&str, Window> = HashMap::new();
        let mut reported: HashSet<&str> = HashSet::new();
        let mut matches = Vec::new();

        for tx in entries.iter().filter(|tx| tx.kind.is_acquisition()) {
            let Some(item) = tx.item.as_ref() else {
                continue;
            };
            let Some(limit) = self.limits.get(&item.item_type) else {
                continue;
            };
            let item_type = item.item_type.as_str();
            let window = windows.entry(item_type).or_default();
            while let Some(front) = window.entries.front() {
                if tx.timestamp_ms - front.timestamp_ms <= self.window_ms {
                    break;
                }
                window.total -= u64::from(front.quantity());
                window.entries.pop_front();
            }
            window.entries.push_back(tx);
            window.total += u64::from(item.quantity);

            if window.total >= *limit && reported.insert(item_type) {
                matches.push(RuleMatch {
                    evidence: window.entries.iter().map(|entry| Arc::clone(entry)).collect(),
                    summary: format!(
                        "acquired {} x{} within {}ms, limit {}",
                        item_type, window.total, self.window_ms, limit
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
    use crate::entities::TransactionKind;
    use crate::services::rules::test_support::{sequences, stack, tx};

    fn pickup(sequence: u64, timestamp_ms: i64, quantity: u32) -> Arc<ItemTransaction> {
        tx(
            sequence,
            timestamp_ms,
            TransactionKind::Pickup,
            Some(stack("minecraft:netherite_ingot", quantity, &format!("q{}", quantity))),
            None,
            Some("inv"),
        )
    }

    fn rule() -> AcquisitionBurstRule {
        let mut limits = BTreeMap::new();
        limits.insert("minecraft:netherite_ingot".to_string(), 16);
        AcquisitionBurstRule::new(1_000, limits)
    }

    #[test]
    fn burst_over_limit_matches_once() {
        let entries = vec![pickup(1, 0, 8), pickup(2, 100, 8), pickup(3, 200, 8)];
        let matches = rule().evaluate(&entries);
        assert_eq!(matches.len(), 1);
        assert_eq!(sequences(&matches[0].evidence), vec![1, 2]);
    }

    #[test]
    fn spread_out_acquisitions_do_not_match() {
        let entries = vec![pickup(1, 0, 8), pickup(2, 1_500, 8), pickup(3, 3_000, 8)];
        assert!(rule().evaluate(&entries).is_empty());
    }

    #[test]
    fn unlisted_items_are_ignored() {
        let entries = vec![tx(
            1,
            0,
            TransactionKind::Pickup,
            Some(stack("minecraft:dirt", 64, "dirt")),
            None,
            None,
        )];
        assert!(rule().evaluate(&entries).is_empty());
    }
}
