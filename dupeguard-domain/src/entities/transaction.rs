// Item transaction entity
// Normalized, immutable record of one item-handling event

use serde::{Deserialize, Serialize};

use crate::value_objects::{ActorId, ContainerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Pickup,
    Drop,
    ContainerMove,
    Craft,
    DeathDrop,
    WorldSaveBoundary,
    ContainerOpen,
    ContainerClose,
    Disconnect,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 9] = [
        TransactionKind::Pickup,
        TransactionKind::Drop,
        TransactionKind::ContainerMove,
        TransactionKind::Craft,
        TransactionKind::DeathDrop,
        TransactionKind::WorldSaveBoundary,
        TransactionKind::ContainerOpen,
        TransactionKind::ContainerClose,
        TransactionKind::Disconnect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Pickup => "PICKUP",
            TransactionKind::Drop => "DROP",
            TransactionKind::ContainerMove => "CONTAINER_MOVE",
            TransactionKind::Craft => "CRAFT",
            TransactionKind::DeathDrop => "DEATH_DROP",
            TransactionKind::WorldSaveBoundary => "WORLD_SAVE_BOUNDARY",
            TransactionKind::ContainerOpen => "CONTAINER_OPEN",
            TransactionKind::ContainerClose => "CONTAINER_CLOSE",
            TransactionKind::Disconnect => "DISCONNECT",
        }
    }

    /// Maps host event type names, including the host's aliases.
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value.trim().to_uppercase().as_str() {
            "PICKUP" | "ENTITY_PICKUP_ITEM" | "PLAYER_PICKUP_ITEM" => TransactionKind::Pickup,
            "DROP" | "PLAYER_DROP_ITEM" => TransactionKind::Drop,
            "CONTAINER_MOVE" | "INVENTORY_CLICK" | "INVENTORY_MOVE_ITEM" | "INVENTORY_DRAG"
            | "MINECART_CHEST_TRANSFER" | "HOPPER_TRANSFER" => TransactionKind::ContainerMove,
            "CRAFT" | "CRAFT_ITEM" => TransactionKind::Craft,
            "DEATH_DROP" | "PLAYER_DEATH" => TransactionKind::DeathDrop,
            "WORLD_SAVE_BOUNDARY" | "WORLD_SAVE" => TransactionKind::WorldSaveBoundary,
            "CONTAINER_OPEN" | "INVENTORY_OPEN" => TransactionKind::ContainerOpen,
            "CONTAINER_CLOSE" | "INVENTORY_CLOSE" => TransactionKind::ContainerClose,
            "DISCONNECT" | "PLAYER_QUIT" | "PLAYER_KICK" => TransactionKind::Disconnect,
            _ => return None,
        };
        Some(kind)
    }

    /// Marker kinds carry no item descriptor.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            TransactionKind::WorldSaveBoundary
                | TransactionKind::ContainerOpen
                | TransactionKind::ContainerClose
                | TransactionKind::Disconnect
        )
    }

    pub fn is_acquisition(&self) -> bool {
        matches!(self, TransactionKind::Pickup | TransactionKind::Craft)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: String,
    pub quantity: u32,
    /// Fingerprint over type, stack count and the metadata digest.
    pub signature: String,
    /// Metadata digest without the stack count.
    pub content_digest: String,
    pub has_custom_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransaction {
    pub event_id: String,
    pub timestamp_ms: i64,
    pub actor_id: ActorId,
    pub kind: TransactionKind,
    pub item: Option<ItemStack>,
    pub source_container: Option<ContainerId>,
    pub dest_container: Option<ContainerId>,
    pub sequence: u64,
}

impl ItemTransaction {
    pub fn signature(&self) -> Option<&str> {
        self.item.as_ref().map(|item| item.signature.as_str())
    }

    pub fn quantity(&self) -> u32 {
        self.item.as_ref().map(|item| item.quantity).unwrap_or(0)
    }

    pub fn describe(&self) -> String {
        let item = match &self.item {
            Some(item) => format!("{} x{}", item.item_type, item.quantity),
            None => "-".to_string(),
        };
        format!(
            "#{} {} {} {} -> {} @{}",
            self.sequence,
            self.kind.as_str(),
            item,
            self.source_container.as_ref().map(|c| c.as_str()).unwrap_or("?"),
            self.dest_container.as_ref().map(|c| c.as_str()).unwrap_or("?"),
            self.timestamp_ms
        )
    }
}
