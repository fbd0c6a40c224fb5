use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use dupeguard_domain::{DispatchError, HostCollaborator, MitigationAction, Verdict, VerdictKey};

use crate::ops::alert_queue::AlertQueue;
use crate::ops::verdict_registry::VerdictRegistry;
use crate::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Mitigated,
    /// The host no longer held the action.
    NotApplied,
    Logged,
    Failed,
    TimedOut,
    Duplicate,
}

#[derive(Default)]
struct SeenKeys {
    keys: HashMap<VerdictKey, i64>,
    order: VecDeque<(VerdictKey, i64)>,
}

pub struct MitigationDispatcher {
    host: Arc<dyn HostCollaborator>,
    alerts: Arc<AlertQueue>,
    verdicts: Arc<VerdictRegistry>,
    metrics: Arc<Metrics>,
    call_timeout: Duration,
    key_ttl_ms: i64,
    key_capacity: usize,
    seen: Mutex<SeenKeys>,
}

impl MitigationDispatcher {
    pub fn new(
        host: Arc<dyn HostCollaborator>,
        alerts: Arc<AlertQueue>,
        verdicts: Arc<VerdictRegistry>,
        metrics: Arc<Metrics>,
        call_timeout: Duration,
        key_ttl_ms: i64,
        key_capacity: usize,
    ) -> Self {
        Self {
            host,
            alerts,
            verdicts,
            metrics,
            call_timeout,
            key_ttl_ms,
            key_capacity: key_capacity.max(1),
            seen: Mutex::new(SeenKeys::default()),
        }
    }

    /// Applies a verdict once; repeated keys are a no-op.
    pub async fn dispatch(&self, verdict: Verdict, now_ms: i64) -> DispatchOutcome {
        if !self.claim(&verdict.key, now_ms) {
            self.metrics.record_duplicate_verdict();
            return DispatchOutcome::Duplicate;
        }
        self.metrics.record_verdict();

        let outcome = match self.mitigate(&verdict).await {
            Ok(outcome) => outcome,
            Err(DispatchError::Timeout {
                operation,
                timeout_ms,
            }) => {
                warn!(
                    "near miss: {} for {} verdict on {} timed out after {}ms, failing open",
                    operation, verdict.rule_name, verdict.actor_id, timeout_ms
                );
                self.metrics.record_dispatch_timeout();
                DispatchOutcome::TimedOut
            }
            Err(err) => {
                warn!(
                    "mitigation for {} verdict on {} failed: {}",
                    verdict.rule_name, verdict.actor_id, err
                );
                self.metrics.record_mitigation_failure();
                DispatchOutcome::Failed
            }
        };

        self.alerts.push(verdict.to_alert_entry());
        self.verdicts.insert(verdict);
        outcome
    }

    async fn mitigate(&self, verdict: &Verdict) -> Result<DispatchOutcome, DispatchError> {
        match verdict.action {
            MitigationAction::CancelTransaction => {
                let target = verdict.latest_evidence().ok_or(DispatchError::NoTarget)?;
                let cancelled = timeout(
                    self.call_timeout,
                    self.host.cancel_pending_action(&target.event_id),
                )
                .await
                .map_err(|_| self.timeout_error("cancel_pending_action"))?;
                if cancelled {
                    self.metrics.record_mitigation();
                    info!(
                        "cancelled {} for {} ({})",
                        target.event_id, verdict.actor_id, verdict.rule_name
                    );
                    Ok(DispatchOutcome::Mitigated)
                } else {
                    warn!(
                        "host already committed {} for {} ({})",
                        target.event_id, verdict.actor_id, verdict.rule_name
                    );
                    Ok(DispatchOutcome::NotApplied)
                }
            }
            MitigationAction::RemoveItems => {
                let target = verdict
                    .latest_item_evidence()
                    .ok_or(DispatchError::NoTarget)?;
                let container = target
                    .dest_container
                    .as_ref()
                    .or(target.source_container.as_ref())
                    .ok_or(DispatchError::NoTarget)?;
                let item = target.item.as_ref().ok_or(DispatchError::NoTarget)?;
                timeout(
                    self.call_timeout,
                    self.host
                        .remove_items(container, &item.signature, item.quantity),
                )
                .await
                .map_err(|_| self.timeout_error("remove_items"))?
                .map_err(|err| DispatchError::Collaborator(err.to_string()))?;
                self.metrics.record_mitigation();
                info!(
                    "removed {} x{} from {} for {} ({})",
                    item.item_type, item.quantity, container, verdict.actor_id, verdict.rule_name
                );
                Ok(DispatchOutcome::Mitigated)
            }
            MitigationAction::LogOnly => {
                info!(
                    "{} verdict {} for {}: {}",
                    verdict.severity.as_str(),
                    verdict.rule_name,
                    verdict.actor_id,
                    verdict.summary
                );
                Ok(DispatchOutcome::Logged)
            }
        }
    }

    fn timeout_error(&self, operation: &'static str) -> DispatchError {
        DispatchError::Timeout {
            operation,
            timeout_ms: self.call_timeout.as_millis() as u64,
        }
    }

    fn claim(&self, key: &VerdictKey, now_ms: i64) -> bool {
        let mut seen = self.seen.lock();
        if seen.keys.contains_key(key) {
            return false;
        }
        seen.keys.insert(key.clone(), now_ms);
        seen.order.push_back((key.clone(), now_ms));
        while seen.order.len() > self.key_capacity {
            if let Some((oldest, _)) = seen.order.pop_front() {
                seen.keys.remove(&oldest);
            }
        }
        true
    }

    pub fn expire_keys(&self, now_ms: i64) -> usize {
        let cutoff = now_ms - self.key_ttl_ms;
        let mut seen = self.seen.lock();
        let mut removed = 0;
        while let Some((_, claimed_at)) = seen.order.front() {
            if *claimed_at >= cutoff {
                break;
            }
            if let Some((key, _)) = seen.order.pop_front() {
                seen.keys.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.seen.lock().keys.len()
    }

    pub fn clear(&self) {
        let mut seen = self.seen.lock();
        seen.keys.clear();
        seen.order.clear();
    }
}
