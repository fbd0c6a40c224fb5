use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use dupeguard_domain::{
    current_millis, AlertDeliveryRecord, AlertEntry, AlertEnvelope, AlertQueueConfig,
    AlertTransport,
};

use crate::ops::alert_queue::AlertQueue;
use crate::Metrics;

pub fn build_envelope(alerts: Vec<AlertEntry>) -> AlertEnvelope {
    AlertEnvelope {
        envelope_id: Uuid::new_v4().to_string(),
        created_at: Utc::now().to_rfc3339(),
        alerts,
    }
}

/// Delay before retry `attempt` (1-based): base * 2^(attempt-1), capped.
pub fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay)
}

pub struct AlertSink {
    transport: Arc<dyn AlertTransport>,
    queue: Arc<AlertQueue>,
    config: AlertQueueConfig,
    metrics: Arc<Metrics>,
    history: Mutex<VecDeque<AlertDeliveryRecord>>,
}

impl AlertSink {
    pub fn new(
        transport: Arc<dyn AlertTransport>,
        queue: Arc<AlertQueue>,
        config: AlertQueueConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            queue,
            config,
            metrics,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Batches queued alerts by size or interval until shutdown is signalled.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let batch_size = self.config.batch_size.max(1);
        let interval = Duration::from_millis(self.config.batch_interval_ms);
        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.queue.is_empty() {
                tokio::select! {
                    _ = self.queue.wait() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }

            let deadline = Instant::now() + interval;
            let mut stopping = false;
            while self.queue.len() < batch_size {
                tokio::select! {
                    _ = sleep_until(deadline) => break,
                    _ = self.queue.wait() => {}
                    _ = shutdown.changed() => {
                        stopping = true;
                        break;
                    }
                }
            }

            let batch = self.queue.drain(batch_size);
            if !batch.is_empty() {
                self.deliver(build_envelope(batch)).await;
            }
            if stopping {
                break;
            }
        }
    }

    /// Delivers one envelope with exponential backoff; drops it once attempts run out.
    pub async fn deliver(&self, envelope: AlertEnvelope) -> bool {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            self.metrics.record_delivery_attempt();
            match self.transport.deliver(&envelope).await {
                Ok(()) => {
                    self.metrics.record_envelope_delivered();
                    self.record_history(&envelope, "delivered", attempt, None);
                    return true;
                }
                Err(err) => {
                    warn!(
                        "alert delivery attempt {}/{} for envelope {} failed: {}",
                        attempt, max_attempts, envelope.envelope_id, err
                    );
                    last_error = Some(err.to_string());
                    if attempt < max_attempts {
                        sleep(backoff_delay(
                            self.config.backoff_base_ms,
                            self.config.backoff_max_ms,
                            attempt,
                        ))
                        .await;
                    }
                }
            }
        }
        error!(
            "dropping alert envelope {} with {} alerts after {} attempts",
            envelope.envelope_id,
            envelope.alerts.len(),
            max_attempts
        );
        self.metrics.record_envelope_failed();
        self.record_history(&envelope, "failed", max_attempts, last_error);
        false
    }

    /// Best-effort delivery of whatever is still queued; returns the alerts discarded.
    pub async fn flush(&self, deadline: Instant) -> usize {
        let batch_size = self.config.batch_size.max(1);
        while !self.queue.is_empty() {
            let batch = self.queue.drain(batch_size);
            let count = batch.len();
            if timeout_at(deadline, self.deliver(build_envelope(batch)))
                .await
                .is_err()
            {
                let discarded = count + self.queue.drain(usize::MAX).len();
                warn!("shutdown grace elapsed, discarded {} pending alerts", discarded);
                return discarded;
            }
        }
        info!("alert queue flushed");
        0
    }

    fn record_history(
        &self,
        envelope: &AlertEnvelope,
        status: &str,
        attempts: u32,
        error: Option<String>,
    ) {
        let mut rule_names: Vec<String> = envelope
            .alerts
            .iter()
            .map(|entry| entry.rule_name.clone())
            .collect();
        rule_names.sort();
        rule_names.dedup();
        let record = AlertDeliveryRecord {
            timestamp_ms: current_millis(),
            envelope_id: envelope.envelope_id.clone(),
            status: status.to_string(),
            attempts,
            alert_count: envelope.alerts.len(),
            rule_names,
            error,
        };
        let mut history = self.history.lock();
        history.push_back(record);
        while history.len() > self.config.history_capacity.max(1) {
            history.pop_front();
        }
    }

    pub fn recent_deliveries(&self, limit: usize) -> Vec<AlertDeliveryRecord> {
        self.history.lock().iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{alert_entry, ScriptedTransport};
    use dupeguard_domain::Severity;

    fn sink(transport: Arc<ScriptedTransport>, config: AlertQueueConfig) -> (Arc<AlertSink>, Arc<AlertQueue>, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::default());
        let queue = Arc::new(AlertQueue::new(config.queue_capacity, metrics.clone()));
        let sink = Arc::new(AlertSink::new(transport, queue.clone(), config, metrics.clone()));
        (sink, queue, metrics)
    }

    fn fast_config() -> AlertQueueConfig {
        AlertQueueConfig {
            batch_interval_ms: 20,
            batch_size: 3,
            backoff_base_ms: 1,
            backoff_max_ms: 4,
            ..AlertQueueConfig::default()
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        assert_eq!(backoff_delay(200, 5_000, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(200, 5_000, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(200, 5_000, 4), Duration::from_millis(1_600));
        assert_eq!(backoff_delay(200, 5_000, 10), Duration::from_millis(5_000));
        assert_eq!(backoff_delay(200, 5_000, 64), Duration::from_millis(5_000));
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_envelope() {
        let transport = Arc::new(ScriptedTransport::failing_first(usize::MAX));
        let (sink, _, metrics) = sink(transport.clone(), fast_config());

        let delivered = sink
            .deliver(build_envelope(vec![alert_entry(Severity::HIGH, "split-stack-replay")]))
            .await;

        assert!(!delivered);
        assert_eq!(transport.attempts(), 5);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.envelopes_failed, 1);
        assert_eq!(snapshot.delivery_attempts, 5);
        let history = sink.recent_deliveries(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "failed");
        assert!(history[0].error.is_some());
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let transport = Arc::new(ScriptedTransport::failing_first(2));
        let (sink, _, metrics) = sink(transport.clone(), fast_config());

        let delivered = sink
            .deliver(build_envelope(vec![alert_entry(Severity::LOW, "acquisition-burst")]))
            .await;

        assert!(delivered);
        assert_eq!(transport.attempts(), 3);
        assert_eq!(metrics.snapshot().envelopes_delivered, 1);
        assert_eq!(sink.recent_deliveries(1)[0].attempts, 3);
    }

    #[tokio::test]
    async fn worker_batches_by_size() {
        let transport = Arc::new(ScriptedTransport::failing_first(0));
        let (sink, queue, _) = sink(transport.clone(), fast_config());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(sink.clone().run(shutdown_rx));

        for index in 0..7 {
            queue.push(alert_entry(Severity::MEDIUM, &format!("rule-{}", index)));
        }
        for _ in 0..100 {
            if transport.delivered_alerts() == 7 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        let _ = shutdown_tx.send(true);
        let _ = worker.await;

        assert_eq!(transport.delivered_alerts(), 7);
        assert!(transport.envelope_sizes().iter().all(|size| *size <= 3));
    }

    #[tokio::test]
    async fn flush_delivers_remaining_alerts() {
        let transport = Arc::new(ScriptedTransport::failing_first(0));
        let (sink, queue, _) = sink(transport.clone(), fast_config());
        for _ in 0..5 {
            queue.push(alert_entry(Severity::HIGH, "boundary-straddle"));
        }

        let discarded = sink.flush(Instant::now() + Duration::from_secs(1)).await;

        assert_eq!(discarded, 0);
        assert_eq!(transport.delivered_alerts(), 5);
        assert!(queue.is_empty());
    }
}
