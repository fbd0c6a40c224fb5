use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use dupeguard_domain::{
    millis_to_rfc3339, normalize, ActorId, AlertEntry, AlertEnvelope, AlertTransport, ContainerId,
    ExemptionRepository, HostCollaborator, RawEvent, RawItem, RuleSet, RulesConfig, Severity,
    SignatureMatcher, SinkTransportError, Verdict, WindowSnapshot,
};

#[derive(Default)]
pub struct RecordingHost {
    delay: Option<Duration>,
    fail: bool,
    cancelled: Mutex<Vec<String>>,
    removed: Mutex<Vec<(String, String, u32)>>,
}

impl RecordingHost {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    pub fn removed(&self) -> Vec<(String, String, u32)> {
        self.removed.lock().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HostCollaborator for RecordingHost {
    async fn cancel_pending_action(&self, event_id: &str) -> bool {
        self.pause().await;
        if self.fail {
            return false;
        }
        self.cancelled.lock().push(event_id.to_string());
        true
    }

    async fn remove_items(
        &self,
        container: &ContainerId,
        signature: &str,
        quantity: u32,
    ) -> anyhow::Result<()> {
        self.pause().await;
        if self.fail {
            anyhow::bail!("container {} is not loaded", container);
        }
        self.removed
            .lock()
            .push((container.to_string(), signature.to_string(), quantity));
        Ok(())
    }
}

/// Fails the first `failures` deliveries, then accepts everything.
pub struct ScriptedTransport {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<usize>>,
}

impl ScriptedTransport {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn envelope_sizes(&self) -> Vec<usize> {
        self.delivered.lock().clone()
    }

    pub fn delivered_alerts(&self) -> usize {
        self.delivered.lock().iter().sum()
    }
}

#[async_trait]
impl AlertTransport for ScriptedTransport {
    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), SinkTransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkTransportError::Status(503));
        }
        self.delivered.lock().push(envelope.alerts.len());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryExemptions {
    saved: Mutex<Vec<String>>,
}

impl MemoryExemptions {
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ExemptionRepository for MemoryExemptions {
    async fn load_exemptions(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.saved())
    }

    async fn save_exemptions(&self, exemptions: &[String]) -> anyhow::Result<()> {
        *self.saved.lock() = exemptions.to_vec();
        Ok(())
    }
}

pub fn alert_entry(severity: Severity, rule_name: &str) -> AlertEntry {
    AlertEntry {
        timestamp: millis_to_rfc3339(0),
        actor_id: "p1".to_string(),
        severity,
        rule_name: rule_name.to_string(),
        evidence_count: 2,
        summary: format!("{} test alert", rule_name),
    }
}

pub fn raw_move(actor: &str, sequence: u64, event_time: i64, source: &str, dest: &str) -> RawEvent {
    RawEvent {
        event_id: Some(format!("{}-{}", actor, sequence)),
        event_type: "CONTAINER_MOVE".to_string(),
        event_time: Some(event_time),
        actor_uuid: Some(actor.to_string()),
        actor_name: Some(format!("{}_name", actor)),
        sequence: Some(sequence),
        item: Some(RawItem {
            item_type: "minecraft:diamond".to_string(),
            amount: 64,
            ..RawItem::default()
        }),
        source_container: Some(source.to_string()),
        dest_container: Some(dest.to_string()),
    }
}

/// The canonical split-stack replay: one stack leaves C1 for both C2 and C3.
pub fn split_stack_verdict(actor: &str) -> Verdict {
    let entries = [
        raw_move(actor, 1, 100, "C1", "C2"),
        raw_move(actor, 2, 101, "C1", "C3"),
    ]
    .iter()
    .map(|raw| normalize(raw).map(Arc::new))
    .collect::<Result<Vec<_>, _>>()
    .expect("valid raw events");
    let snapshot = WindowSnapshot {
        actor_id: ActorId::new(actor),
        entries,
        flagged: false,
    };
    let matcher = SignatureMatcher::new(Arc::new(RuleSet::from_config(&RulesConfig::default())));
    matcher
        .evaluate(&snapshot, 1_000)
        .into_iter()
        .next()
        .expect("split-stack verdict")
}
