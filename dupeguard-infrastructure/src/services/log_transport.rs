use async_trait::async_trait;
use tracing::{info, warn};

use dupeguard_domain::{AlertEnvelope, AlertTransport, Severity, SinkTransportError};

/// Writes alerts to the log when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertTransport;

#[async_trait]
impl AlertTransport for LogAlertTransport {
    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), SinkTransportError> {
        for alert in &envelope.alerts {
            if alert.severity == Severity::HIGH {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    actor = %alert.actor_id,
                    rule = %alert.rule_name,
                    evidence = alert.evidence_count,
                    "[ALERT] {}",
                    alert.summary
                );
            } else {
                info!(
                    envelope_id = %envelope.envelope_id,
                    actor = %alert.actor_id,
                    rule = %alert.rule_name,
                    severity = alert.severity.as_str(),
                    evidence = alert.evidence_count,
                    "[ALERT] {}",
                    alert.summary
                );
            }
        }
        Ok(())
    }
}
