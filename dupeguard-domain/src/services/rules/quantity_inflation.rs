use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entities::{ItemTransaction, QuantityInflationConfig, TransactionKind};
use crate::services::rules::{RuleMatch, SignatureRule};
use crate::value_objects::{MitigationAction, Severity};

/// Crafted or picked-up quantity above what the recipe or stack allows.
pub struct QuantityInflationRule {
    default_stack_limit: u32,
    stack_limits: BTreeMap<String, u32>,
    recipe_yields: BTreeMap<String, u32>,
}

impl QuantityInflationRule {
    pub fn from_config(config: &QuantityInflationConfig) -> Self {
        Self {
            default_stack_limit: config.default_stack_limit,
            stack_limits: config.stack_limits.clone(),
            recipe_yields: config.recipe_yields.clone(),
        }
    }

    fn ceiling(&self, kind: TransactionKind, item_type: &str) -> u32 {
        if kind == TransactionKind::Craft {
            if let Some(recipe_yield) = self.recipe_yields.get(item_type) {
                return *recipe_yield;
            }
        }
        self.stack_limits
            .get(item_type)
            .copied()
            .unwrap_or(self.default_stack_limit)
    }
}

impl SignatureRule for QuantityInflationRule {
    fn name(&self) -> &'static str {
        "quantity-inflation"
    }

    fn default_severity(&self) -> Severity {
        Severity::MEDIUM
    }

    fn default_action(&self) -> MitigationAction {
        MitigationAction::RemoveItems
    }

    fn horizon_ms(&self) -> i64 {
        0
    }

    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch> {
        entries
            .iter()
            .filter(|tx| tx.kind.is_acquisition())
            .filter_map(|tx| {
                let item = tx.item.as_ref()?;
                let ceiling = self.ceiling(tx.kind, &item.item_type);
                if item.quantity <= ceiling {
                    return None;
                }
                Some(RuleMatch {
                    evidence: vec![Arc::clone(tx)],
                    summary: format!(
                        "{} produced {} x{} over ceiling {}",
                        tx.kind.as_str(),
                        item.item_type,
                        item.quantity,
                        ceiling
                    ),
                    action: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rules::test_support::{stack, tx};

    fn rule() -> QuantityInflationRule {
        let mut config = QuantityInflationConfig::default();
        config
            .stack_limits
            .insert("minecraft:ender_pearl".to_string(), 16);
        config
            .recipe_yields
            .insert("minecraft:stick".to_string(), 4);
        QuantityInflationRule::from_config(&config)
    }

    #[test]
    fn craft_over_recipe_yield_matches() {
        let entries = vec![
            tx(1, 10, TransactionKind::Craft, Some(stack("minecraft:stick", 4, "a")), None, Some("inv")),
            tx(2, 20, TransactionKind::Craft, Some(stack("minecraft:stick", 8, "b")), None, Some("inv")),
        ];
        let matches = rule().evaluate(&entries);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].evidence[0].sequence, 2);
    }

    #[test]
    fn pickups_use_stack_limits() {
        let entries = vec![
            tx(1, 10, TransactionKind::Pickup, Some(stack("minecraft:ender_pearl", 17, "a")), None, None),
            tx(2, 20, TransactionKind::Pickup, Some(stack("minecraft:stone", 64, "b")), None, None),
            tx(3, 30, TransactionKind::Pickup, Some(stack("minecraft:stone", 65, "c")), None, None),
        ];
        let matches = rule().evaluate(&entries);
        let flagged: Vec<u64> = matches.iter().map(|found| found.evidence[0].sequence).collect();
        assert_eq!(flagged, vec![1, 3]);
    }

    #[test]
    fn container_moves_are_not_checked() {
        let entries = vec![tx(
            1,
            10,
            TransactionKind::ContainerMove,
            Some(stack("minecraft:stone", 500, "a")),
            Some("C1"),
            Some("C2"),
        )];
        assert!(rule().evaluate(&entries).is_empty());
    }
}
