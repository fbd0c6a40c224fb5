use async_trait::async_trait;

use crate::entities::AlertEnvelope;
use crate::errors::SinkTransportError;

#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), SinkTransportError>;
}
