use thiserror::Error;

use crate::value_objects::ActorId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEventError {
    #[error("missing actor identity")]
    MissingActor,
    #[error("unknown event type: {0}")]
    UnknownKind(String),
    #[error("{0} event without item descriptor")]
    MissingItem(&'static str),
    #[error("item descriptor without item type")]
    MissingItemType,
    #[error("invalid item quantity: {0}")]
    InvalidQuantity(i64),
    #[error("missing sequence number")]
    MissingSequence,
    #[error("invalid event time: {0}")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("out-of-order sequence for {actor}: last {last}, got {got}")]
    OutOfOrder { actor: ActorId, last: u64, got: u64 },
    #[error("window for {actor} holds {len} entries over capacity {capacity}")]
    Corrupted {
        actor: ActorId,
        len: usize,
        capacity: usize,
    },
}

impl LedgerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Corrupted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("host collaborator failed: {0}")]
    Collaborator(String),
    #[error("verdict has no mitigation target")]
    NoTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkTransportError {
    #[error("alert sink responded {0}")]
    Status(u16),
    #[error("alert sink transport failed: {0}")]
    Transport(String),
    #[error("alert payload encoding failed: {0}")]
    Encoding(String),
}
