// Item limit entity
// Per-item ceilings loaded from the item limits file

use serde::{Deserialize, Serialize};

use crate::entities::RulesConfig;
use crate::value_objects::MitigationAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLimitRule {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_yield: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_limit: Option<u64>,
    /// Either clone field puts the item on the metadata-clone watch list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_min_copies: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_action: Option<MitigationAction>,
}

impl ItemLimitRule {
    pub fn normalized(&self) -> Self {
        let item_id = self.item_id.trim().to_lowercase();
        let item_id = if item_id.contains(':') {
            item_id
        } else {
            format!("minecraft:{}", item_id)
        };
        Self {
            item_id,
            stack_limit: self.stack_limit.filter(|value| *value > 0),
            recipe_yield: self.recipe_yield.filter(|value| *value > 0),
            burst_limit: self.burst_limit.filter(|value| *value > 0),
            clone_min_copies: self.clone_min_copies.filter(|value| *value > 0),
            clone_action: self.clone_action,
        }
    }
}

impl RulesConfig {
    /// Merges file-based item limits; entries from the file win over inline values.
    pub fn apply_item_limits(&mut self, limits: &[ItemLimitRule]) {
        for limit in limits.iter().map(ItemLimitRule::normalized) {
            if let Some(value) = limit.stack_limit {
                self.quantity_inflation
                    .stack_limits
                    .insert(limit.item_id.clone(), value);
            }
            if let Some(value) = limit.recipe_yield {
                self.quantity_inflation
                    .recipe_yields
                    .insert(limit.item_id.clone(), value);
            }
            if let Some(value) = limit.burst_limit {
                self.acquisition_burst
                    .limits
                    .insert(limit.item_id.clone(), value);
            }
            if limit.clone_min_copies.is_some() || limit.clone_action.is_some() {
                let watched = self
                    .metadata_clone
                    .monitored
                    .entry(limit.item_id.clone())
                    .or_default();
                if let Some(copies) = limit.clone_min_copies {
                    watched.min_copies = Some(copies);
                }
                if let Some(action) = limit.clone_action {
                    watched.action = Some(action);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MonitoredItem;

    #[test]
    fn apply_item_limits_normalizes_ids_and_skips_zero() {
        let mut rules = RulesConfig::default();
        rules.apply_item_limits(&[
            ItemLimitRule {
                item_id: " Diamond ".to_string(),
                stack_limit: Some(16),
                recipe_yield: None,
                burst_limit: Some(0),
                clone_min_copies: None,
                clone_action: None,
            },
            ItemLimitRule {
                item_id: "minecraft:stick".to_string(),
                stack_limit: None,
                recipe_yield: Some(4),
                burst_limit: Some(512),
                clone_min_copies: None,
                clone_action: None,
            },
        ]);
        assert_eq!(
            rules.quantity_inflation.stack_limits.get("minecraft:diamond"),
            Some(&16)
        );
        assert!(!rules.acquisition_burst.limits.contains_key("minecraft:diamond"));
        assert_eq!(
            rules.quantity_inflation.recipe_yields.get("minecraft:stick"),
            Some(&4)
        );
        assert_eq!(rules.acquisition_burst.limits.get("minecraft:stick"), Some(&512));
        assert!(rules.metadata_clone.monitored.is_empty());
    }

    #[test]
    fn clone_fields_add_items_to_the_watch_list() {
        let mut rules = RulesConfig::default();
        rules.metadata_clone.monitored.insert(
            "minecraft:elytra".to_string(),
            MonitoredItem {
                min_copies: Some(4),
                action: None,
            },
        );
        rules.apply_item_limits(&[
            ItemLimitRule {
                item_id: "Elytra".to_string(),
                stack_limit: Some(1),
                recipe_yield: None,
                burst_limit: None,
                clone_min_copies: None,
                clone_action: Some(MitigationAction::RemoveItems),
            },
            ItemLimitRule {
                item_id: "netherite_sword".to_string(),
                stack_limit: None,
                recipe_yield: None,
                burst_limit: None,
                clone_min_copies: Some(2),
                clone_action: None,
            },
        ]);
        assert_eq!(
            rules.metadata_clone.monitored.get("minecraft:elytra"),
            Some(&MonitoredItem {
                min_copies: Some(4),
                action: Some(MitigationAction::RemoveItems),
            })
        );
        assert_eq!(
            rules.metadata_clone.monitored.get("minecraft:netherite_sword"),
            Some(&MonitoredItem {
                min_copies: Some(2),
                action: None,
            })
        );
    }
}
