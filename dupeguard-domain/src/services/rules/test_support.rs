use std::sync::Arc;

use crate::entities::{ItemStack, ItemTransaction, TransactionKind};
use crate::value_objects::{ActorId, ContainerId};

pub fn stack(item_type: &str, quantity: u32, signature: &str) -> ItemStack {
    ItemStack {
        item_type: item_type.to_string(),
        quantity,
        signature: signature.to_string(),
        content_digest: format!("digest-{}", signature),
        has_custom_data: false,
    }
}

pub fn custom_stack(digest: &str) -> ItemStack {
    ItemStack {
        item_type: "minecraft:diamond_sword".to_string(),
        quantity: 1,
        signature: format!("sig-{}", digest),
        content_digest: digest.to_string(),
        has_custom_data: true,
    }
}

pub fn tx(
    sequence: u64,
    timestamp_ms: i64,
    kind: TransactionKind,
    item: Option<ItemStack>,
    source: Option<&str>,
    dest: Option<&str>,
) -> Arc<ItemTransaction> {
    Arc::new(ItemTransaction {
        event_id: format!("evt-{}", sequence),
        timestamp_ms,
        actor_id: ActorId::new("p1"),
        kind,
        item,
        source_container: source.map(ContainerId::new),
        dest_container: dest.map(ContainerId::new),
        sequence,
    })
}

pub fn container_move(
    sequence: u64,
    timestamp_ms: i64,
    signature: &str,
    source: &str,
    dest: &str,
) -> Arc<ItemTransaction> {
    tx(
        sequence,
        timestamp_ms,
        TransactionKind::ContainerMove,
        Some(stack("minecraft:diamond", 64, signature)),
        Some(source),
        Some(dest),
    )
}

pub fn boundary(sequence: u64, timestamp_ms: i64) -> Arc<ItemTransaction> {
    tx(
        sequence,
        timestamp_ms,
        TransactionKind::WorldSaveBoundary,
        None,
        None,
        None,
    )
}

pub fn sequences(evidence: &[Arc<ItemTransaction>]) -> Vec<u64> {
    evidence.iter().map(|entry| entry.sequence).collect()
}
