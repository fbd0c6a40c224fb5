// Raw host event
// Loosely-typed payload as delivered by the host event bus

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub event_time: Option<i64>,
    pub actor_uuid: Option<String>,
    pub actor_name: Option<String>,
    pub sequence: Option<u64>,
    pub item: Option<RawItem>,
    pub source_container: Option<String>,
    pub dest_container: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub item_type: String,
    pub amount: i64,
    pub display_name: Option<String>,
    pub lore: Vec<String>,
    pub enchantments: BTreeMap<String, u32>,
    pub stored_enchantments: BTreeMap<String, u32>,
    pub damage: Option<i32>,
    pub custom_model_data: Option<i32>,
    pub potion_effects: Vec<String>,
    pub custom_data: Option<String>,
}

impl RawItem {
    /// Blank names and blank custom data count as absent.
    pub fn has_custom_data(&self) -> bool {
        let present = |value: &Option<String>| {
            value.as_deref().map(|value| !value.trim().is_empty()).unwrap_or(false)
        };
        present(&self.display_name)
            || !self.lore.is_empty()
            || !self.enchantments.is_empty()
            || !self.stored_enchantments.is_empty()
            || !self.potion_effects.is_empty()
            || self.custom_model_data.is_some()
            || self.damage.map(|damage| damage > 0).unwrap_or(false)
            || present(&self.custom_data)
    }
}
