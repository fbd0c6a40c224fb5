use async_trait::async_trait;
use tracing::info;

use dupeguard_domain::{ContainerId, HostCollaborator};

/// Host stand-in for replays: mitigations are logged and reported as applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyHost;

#[async_trait]
impl HostCollaborator for LogOnlyHost {
    async fn cancel_pending_action(&self, event_id: &str) -> bool {
        info!(event_id, "dry run: cancel pending action");
        true
    }

    async fn remove_items(
        &self,
        container: &ContainerId,
        signature: &str,
        quantity: u32,
    ) -> anyhow::Result<()> {
        info!(
            container = container.as_str(),
            signature,
            quantity,
            "dry run: remove items"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_only_host_reports_success() {
        let host = LogOnlyHost;
        assert!(host.cancel_pending_action("evt-1").await);
        host.remove_items(&ContainerId("C2".to_string()), "sig", 64)
            .await
            .expect("removed");
    }
}
