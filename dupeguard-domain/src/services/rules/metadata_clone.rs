use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::entities::{ItemTransaction, MetadataCloneConfig, MonitoredItem};
use crate::services::rules::{RuleMatch, SignatureRule};
use crate::value_objects::{ContainerId, MitigationAction, Severity};

/// One uniquely customized item held in several places at once.
pub struct MetadataCloneRule {
    min_copies: usize,
    horizon_ms: i64,
    monitored: BTreeMap<String, MonitoredItem>,
}

impl MetadataCloneRule {
    pub fn new(min_copies: usize, horizon_ms: i64) -> Self {
        Self {
            min_copies: min_copies.max(2),
            horizon_ms,
            monitored: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &MetadataCloneConfig) -> Self {
        Self::new(config.min_copies, config.horizon_ms).with_monitored(config.monitored.clone())
    }

    /// Restricts the rule to the listed item types, each with its own threshold.
    pub fn with_monitored(mut self, monitored: BTreeMap<String, MonitoredItem>) -> Self {
        self.monitored = monitored;
        self
    }

    /// Copies needed to match and the per-item action; None when the item is not watched.
    fn threshold(&self, item_type: &str) -> Option<(usize, Option<MitigationAction>)> {
        if self.monitored.is_empty() {
            return Some((self.min_copies, None));
        }
        self.monitored.get(item_type).map(|item| {
            let copies = item.min_copies.unwrap_or(self.min_copies).max(2);
            (copies, item.action)
        })
    }
}

impl SignatureRule for MetadataCloneRule {
    fn name(&self) -> &'static str {
        "metadata-clone"
    }

    fn default_severity(&self) -> Severity {
        Severity::MEDIUM
    }

    fn default_action(&self) -> MitigationAction {
        MitigationAction::LogOnly
    }

    fn horizon_ms(&self) -> i64 {
        self.horizon_ms
    }

    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch> {
        let mut holders: HashMap<&str, Vec<(&ContainerId, &Arc<ItemTransaction>)>> = HashMap::new();
        let mut reported: HashSet<&str> = HashSet::new();
        let mut matches = Vec::new();

        for tx in entries {
            let Some(item) = tx.item.as_ref().filter(|item| item.has_custom_data) else {
                continue;
            };
            let Some((min_copies, action)) = self.threshold(&item.item_type) else {
                continue;
            };
            let digest = item.content_digest.as_str();
            let places = holders.entry(digest).or_default();
            places.retain(|(_, holder)| tx.timestamp_ms - holder.timestamp_ms <= self.horizon_ms);
            if let Some(source) = tx.source_container.as_ref() {
                if let Some(position) = places.iter().position(|(place, _)| *place == source) {
                    places.remove(position);
                }
            }
            if let Some(dest) = tx.dest_container.as_ref() {
                places.retain(|(place, _)| *place != dest);
                places.push((dest, tx));
            }

            if places.len() >= min_copies && !reported.contains(digest) {
                reported.insert(digest);
                let mut evidence: Vec<Arc<ItemTransaction>> =
                    places.iter().map(|(_, holder)| Arc::clone(holder)).collect();
                evidence.sort_by_key(|entry| (entry.timestamp_ms, entry.sequence));
                let locations = places
                    .iter()
                    .map(|(place, _)| place.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                matches.push(RuleMatch {
                    summary: format!(
                        "{} with identical metadata held in {} places: {}",
                        item.item_type,
                        places.len(),
                        locations
                    ),
                    evidence,
                    action,
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
    use crate::services::rules::test_support::{custom_stack, sequences, stack, tx};

    fn custom_move(sequence: u64, timestamp_ms: i64, source: Option<&str>, dest: &str) -> Arc<ItemTransaction> {
        tx(
            sequence,
            timestamp_ms,
            TransactionKind::ContainerMove,
            Some(custom_stack("blade")),
            source,
            Some(dest),
        )
    }

    #[test]
    fn copies_in_three_places_match() {
        let rule = MetadataCloneRule::new(3, 30_000);
        let entries = vec![
            custom_move(1, 10, None, "inv"),
            custom_move(2, 20, Some("C1"), "C2"),
            custom_move(3, 30, Some("C1"), "C3"),
        ];
        let matches = rule.evaluate(&entries);
        assert_eq!(matches.len(), 1);
        assert_eq!(sequences(&matches[0].evidence), vec![1, 2, 3]);
    }

    #[test]
    fn moving_one_item_around_is_legitimate() {
        let rule = MetadataCloneRule::new(3, 30_000);
        let entries = vec![
            custom_move(1, 10, None, "inv"),
            custom_move(2, 20, Some("inv"), "C1"),
            custom_move(3, 30, Some("C1"), "C2"),
            custom_move(4, 40, Some("C2"), "inv"),
        ];
        assert!(rule.evaluate(&entries).is_empty());
    }

    #[test]
    fn plain_items_are_ignored() {
        let rule = MetadataCloneRule::new(3, 30_000);
        let entries: Vec<_> = (1..=5)
            .map(|sequence| {
                tx(
                    sequence,
                    sequence as i64,
                    TransactionKind::ContainerMove,
                    Some(stack("minecraft:stone", 64, "plain")),
                    Some("C0"),
                    Some(format!("C{}", sequence).as_str()),
                )
            })
            .collect();
        assert!(rule.evaluate(&entries).is_empty());
    }

    #[test]
    fn stale_holders_fall_out_of_the_horizon() {
        let rule = MetadataCloneRule::new(3, 100);
        let entries = vec![
            custom_move(1, 0, None, "inv"),
            custom_move(2, 150, Some("C1"), "C2"),
            custom_move(3, 160, Some("C1"), "C3"),
        ];
        assert!(rule.evaluate(&entries).is_empty());
    }

    fn monitored(
        entries: &[(&str, Option<usize>, Option<MitigationAction>)],
    ) -> BTreeMap<String, MonitoredItem> {
        entries
            .iter()
            .map(|(item, min_copies, action)| {
                (
                    item.to_string(),
                    MonitoredItem {
                        min_copies: *min_copies,
                        action: *action,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn monitored_item_uses_its_own_threshold_and_action() {
        let rule = MetadataCloneRule::new(3, 30_000).with_monitored(monitored(&[(
            "minecraft:diamond_sword",
            Some(2),
            Some(MitigationAction::RemoveItems),
        )]));
        let entries = vec![
            custom_move(1, 10, None, "inv"),
            custom_move(2, 20, Some("C1"), "C2"),
        ];
        let matches = rule.evaluate(&entries);
        assert_eq!(matches.len(), 1);
        assert_eq!(sequences(&matches[0].evidence), vec![1, 2]);
        assert_eq!(matches[0].action, Some(MitigationAction::RemoveItems));
    }

    #[test]
    fn unlisted_items_are_ignored_once_a_watch_list_exists() {
        let rule = MetadataCloneRule::new(3, 30_000)
            .with_monitored(monitored(&[("minecraft:elytra", Some(2), None)]));
        let entries = vec![
            custom_move(1, 10, None, "inv"),
            custom_move(2, 20, Some("C1"), "C2"),
            custom_move(3, 30, Some("C1"), "C3"),
        ];
        assert!(rule.evaluate(&entries).is_empty());
    }

    #[test]
    fn monitored_item_without_overrides_falls_back_to_rule_values() {
        let rule = MetadataCloneRule::new(3, 30_000)
            .with_monitored(monitored(&[("minecraft:diamond_sword", None, None)]));
        let two = vec![
            custom_move(1, 10, None, "inv"),
            custom_move(2, 20, Some("C1"), "C2"),
        ];
        assert!(rule.evaluate(&two).is_empty());

        let mut three = two;
        three.push(custom_move(3, 30, Some("C1"), "C3"));
        let matches = rule.evaluate(&three);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].action, None);
    }
}
