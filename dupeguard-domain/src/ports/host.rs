use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::entities::{RawEvent, TransactionKind};
use crate::value_objects::ContainerId;

/// Push delivery of host events; at-least-once and ordered per actor.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, kinds: &[TransactionKind]) -> BoxStream<'static, RawEvent>;
}

#[async_trait]
pub trait HostCollaborator: Send + Sync {
    /// Returns whether the host still held the action and cancelled it.
    async fn cancel_pending_action(&self, event_id: &str) -> bool;
    async fn remove_items(
        &self,
        container: &ContainerId,
        signature: &str,
        quantity: u32,
    ) -> anyhow::Result<()>;
}
