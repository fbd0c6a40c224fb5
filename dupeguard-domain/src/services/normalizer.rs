use std::collections::BTreeMap;

use crate::entities::{ItemStack, ItemTransaction, RawEvent, RawItem, TransactionKind};
use crate::errors::MalformedEventError;
use crate::utils::sha256_hex;
use crate::value_objects::{ActorId, ContainerId};

pub fn normalize(raw: &RawEvent) -> Result<ItemTransaction, MalformedEventError> {
    let kind = TransactionKind::parse(&raw.event_type)
        .ok_or_else(|| MalformedEventError::UnknownKind(raw.event_type.trim().to_string()))?;
    let actor_id = resolve_actor(raw).ok_or(MalformedEventError::MissingActor)?;
    let sequence = raw.sequence.ok_or(MalformedEventError::MissingSequence)?;
    let timestamp_ms = raw
        .event_time
        .filter(|time| *time > 0)
        .ok_or(MalformedEventError::InvalidTimestamp(raw.event_time.unwrap_or(0)))?;

    let item = if kind.is_marker() {
        None
    } else {
        let raw_item = raw
            .item
            .as_ref()
            .ok_or(MalformedEventError::MissingItem(kind.as_str()))?;
        Some(normalize_item(raw_item)?)
    };

    let event_id = match non_blank(raw.event_id.as_deref()) {
        Some(value) => value.to_string(),
        None => format!("{}#{}", actor_id, sequence),
    };

    Ok(ItemTransaction {
        event_id,
        timestamp_ms,
        actor_id,
        kind,
        item,
        source_container: non_blank(raw.source_container.as_deref()).map(ContainerId::new),
        dest_container: non_blank(raw.dest_container.as_deref()).map(ContainerId::new),
        sequence,
    })
}

/// Canonical actor key: compact lowercase uuid, or the lowercased name.
pub fn normalize_actor_identifier(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let compact = trimmed.replace('-', "").to_lowercase();
    if compact.len() == 32 && compact.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Some(compact);
    }
    Some(trimmed.to_lowercase())
}

pub fn normalize_item_type(value: &str) -> Option<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }
    let item_type = if trimmed.contains(':') {
        trimmed
    } else {
        format!("minecraft:{}", trimmed)
    };
    if item_type == "minecraft:air" {
        return None;
    }
    Some(item_type)
}

pub fn content_digest(item_type: &str, item: &RawItem) -> String {
    let mut canonical = String::new();
    push_field(&mut canonical, "type", item_type);
    for (name, level) in sorted_levels(&item.enchantments) {
        push_field(&mut canonical, "ench", &format!("{}={}", name, level));
    }
    for (name, level) in sorted_levels(&item.stored_enchantments) {
        push_field(&mut canonical, "stored", &format!("{}={}", name, level));
    }
    if let Some(damage) = item.damage.filter(|damage| *damage > 0) {
        push_field(&mut canonical, "damage", &damage.to_string());
    }
    if let Some(model) = item.custom_model_data {
        push_field(&mut canonical, "model", &model.to_string());
    }
    if let Some(name) = non_blank(item.display_name.as_deref()) {
        push_field(&mut canonical, "name", name);
    }
    for line in &item.lore {
        push_field(&mut canonical, "lore", line);
    }
    let mut effects: Vec<String> = item
        .potion_effects
        .iter()
        .map(|effect| effect.trim().to_lowercase())
        .filter(|effect| !effect.is_empty())
        .collect();
    effects.sort();
    for effect in &effects {
        push_field(&mut canonical, "potion", effect);
    }
    if let Some(data) = non_blank(item.custom_data.as_deref()) {
        push_field(&mut canonical, "data", data);
    }
    sha256_hex(canonical.as_bytes())
}

pub fn stack_signature(item_type: &str, quantity: u32, digest: &str) -> String {
    sha256_hex(format!("{}|{}|{}", item_type, quantity, digest).as_bytes())
}

fn normalize_item(item: &RawItem) -> Result<ItemStack, MalformedEventError> {
    let item_type = normalize_item_type(&item.item_type).ok_or(MalformedEventError::MissingItemType)?;
    let quantity = u32::try_from(item.amount)
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or(MalformedEventError::InvalidQuantity(item.amount))?;
    let digest = content_digest(&item_type, item);
    Ok(ItemStack {
        signature: stack_signature(&item_type, quantity, &digest),
        item_type,
        quantity,
        content_digest: digest,
        has_custom_data: item.has_custom_data(),
    })
}

fn resolve_actor(raw: &RawEvent) -> Option<ActorId> {
    raw.actor_uuid
        .as_deref()
        .and_then(normalize_actor_identifier)
        .or_else(|| raw.actor_name.as_deref().and_then(normalize_actor_identifier))
        .map(ActorId)
}

fn sorted_levels(levels: &BTreeMap<String, u32>) -> BTreeMap<String, u32> {
    levels
        .iter()
        .map(|(name, level)| (name.trim().to_lowercase(), *level))
        .collect()
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("{}:{}:{};", key, value.len(), value));
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword(damage: Option<i32>) -> RawItem {
        let mut enchantments = BTreeMap::new();
        enchantments.insert("minecraft:sharpness".to_string(), 5);
        enchantments.insert("minecraft:unbreaking".to_string(), 3);
        RawItem {
            item_type: "diamond_sword".to_string(),
            amount: 1,
            display_name: Some("Excalibur".to_string()),
            enchantments,
            damage,
            ..RawItem::default()
        }
    }

    fn move_event(item: Option<RawItem>) -> RawEvent {
        RawEvent {
            event_id: Some("evt-1".to_string()),
            event_type: "CONTAINER_MOVE".to_string(),
            event_time: Some(1_700_000_000_100),
            actor_uuid: Some("01234567-89AB-CDEF-0123-456789ABCDEF".to_string()),
            actor_name: Some("Steve".to_string()),
            sequence: Some(1),
            item,
            source_container: Some("chest:1,64,1".to_string()),
            dest_container: Some(" ".to_string()),
        }
    }

    #[test]
    fn identical_stacks_share_a_signature() {
        let first = normalize(&move_event(Some(sword(Some(10))))).expect("first");
        let second = normalize(&move_event(Some(sword(Some(10))))).expect("second");
        assert_eq!(first.signature(), second.signature());
    }

    #[test]
    fn durability_changes_the_signature() {
        let worn = normalize(&move_event(Some(sword(Some(10))))).expect("worn");
        let fresh = normalize(&move_event(Some(sword(Some(11))))).expect("fresh");
        assert_ne!(worn.signature(), fresh.signature());
    }

    #[test]
    fn quantity_changes_signature_but_not_content_digest() {
        let mut small = sword(None);
        small.amount = 2;
        let single = normalize(&move_event(Some(sword(None)))).expect("single");
        let double = normalize(&move_event(Some(small))).expect("double");
        let single_item = single.item.expect("item");
        let double_item = double.item.expect("item");
        assert_ne!(single_item.signature, double_item.signature);
        assert_eq!(single_item.content_digest, double_item.content_digest);
    }

    #[test]
    fn enchantment_key_case_does_not_matter() {
        let mut shouting = sword(None);
        shouting.enchantments = shouting
            .enchantments
            .into_iter()
            .map(|(name, level)| (name.to_uppercase(), level))
            .collect();
        let lower = normalize(&move_event(Some(sword(None)))).expect("lower");
        let upper = normalize(&move_event(Some(shouting))).expect("upper");
        assert_eq!(lower.signature(), upper.signature());
    }

    #[test]
    fn normalize_fills_canonical_fields() {
        let tx = normalize(&move_event(Some(sword(None)))).expect("normalize");
        assert_eq!(tx.actor_id.as_str(), "0123456789abcdef0123456789abcdef");
        assert_eq!(tx.kind, TransactionKind::ContainerMove);
        assert_eq!(tx.dest_container, None);
        let item = tx.item.expect("item");
        assert_eq!(item.item_type, "minecraft:diamond_sword");
        assert!(item.has_custom_data);
    }

    #[test]
    fn plain_items_have_no_custom_data() {
        let raw = RawItem {
            item_type: "minecraft:cobblestone".to_string(),
            amount: 64,
            damage: Some(0),
            ..RawItem::default()
        };
        let tx = normalize(&move_event(Some(raw))).expect("normalize");
        assert!(!tx.item.expect("item").has_custom_data);
    }

    #[test]
    fn blank_name_and_data_are_not_custom_data() {
        let raw = RawItem {
            item_type: "minecraft:cobblestone".to_string(),
            amount: 64,
            display_name: Some("   ".to_string()),
            custom_data: Some(String::new()),
            ..RawItem::default()
        };
        assert!(!raw.has_custom_data());
        let tx = normalize(&move_event(Some(raw))).expect("normalize");
        assert!(!tx.item.expect("item").has_custom_data);
    }

    #[test]
    fn missing_or_zero_event_time_is_rejected() {
        let json = r#"{"event_id":"e1","event_type":"PICKUP","actor_uuid":"p1","sequence":1,"item":{"item_type":"minecraft:diamond","amount":1}}"#;
        let untimed: RawEvent = serde_json::from_str(json).expect("json");
        assert_eq!(untimed.event_time, None);
        assert_eq!(
            normalize(&untimed).unwrap_err(),
            MalformedEventError::InvalidTimestamp(0)
        );

        let mut zero = move_event(Some(sword(None)));
        zero.event_time = Some(0);
        assert_eq!(normalize(&zero).unwrap_err(), MalformedEventError::InvalidTimestamp(0));

        let mut negative = move_event(Some(sword(None)));
        negative.event_time = Some(-5);
        assert_eq!(normalize(&negative).unwrap_err(), MalformedEventError::InvalidTimestamp(-5));

        let tick = move_event(Some(sword(None)));
        assert_eq!(normalize(&tick).expect("normalize").timestamp_ms, 1_700_000_000_100);
    }

    #[test]
    fn marker_events_need_no_item() {
        let mut raw = move_event(None);
        raw.event_type = "world_save".to_string();
        raw.event_id = None;
        let tx = normalize(&raw).expect("marker");
        assert_eq!(tx.kind, TransactionKind::WorldSaveBoundary);
        assert!(tx.item.is_none());
        assert_eq!(tx.event_id, "0123456789abcdef0123456789abcdef#1");
    }

    #[test]
    fn actor_name_is_used_when_uuid_missing() {
        let mut raw = move_event(Some(sword(None)));
        raw.actor_uuid = Some("  ".to_string());
        let tx = normalize(&raw).expect("normalize");
        assert_eq!(tx.actor_id.as_str(), "steve");
    }

    #[test]
    fn malformed_events_are_rejected() {
        let mut missing_actor = move_event(Some(sword(None)));
        missing_actor.actor_uuid = None;
        missing_actor.actor_name = None;
        assert_eq!(normalize(&missing_actor).unwrap_err(), MalformedEventError::MissingActor);

        let missing_item = move_event(None);
        assert_eq!(
            normalize(&missing_item).unwrap_err(),
            MalformedEventError::MissingItem("CONTAINER_MOVE")
        );

        let mut unknown = move_event(Some(sword(None)));
        unknown.event_type = "TELEPORT".to_string();
        match normalize(&unknown).unwrap_err() {
            MalformedEventError::UnknownKind(kind) => assert_eq!(kind, "TELEPORT"),
            _ => panic!("unexpected error type"),
        }

        let mut empty = sword(None);
        empty.amount = 0;
        assert_eq!(
            normalize(&move_event(Some(empty))).unwrap_err(),
            MalformedEventError::InvalidQuantity(0)
        );

        let mut air = sword(None);
        air.item_type = "minecraft:air".to_string();
        assert_eq!(
            normalize(&move_event(Some(air))).unwrap_err(),
            MalformedEventError::MissingItemType
        );

        let mut unsequenced = move_event(Some(sword(None)));
        unsequenced.sequence = None;
        assert_eq!(normalize(&unsequenced).unwrap_err(), MalformedEventError::MissingSequence);
    }
}
