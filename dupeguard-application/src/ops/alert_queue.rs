use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{error, warn};

use dupeguard_domain::{AlertEntry, Severity};

use crate::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Queued after evicting the oldest pending non-HIGH entry.
    ReplacedLow,
    /// Incoming non-HIGH entry dropped; the queue holds only HIGH entries.
    DroppedIncoming,
    /// HIGH entry admitted over the soft capacity.
    Overflowed,
    /// Hard ceiling reached; the oldest HIGH entry was dropped.
    DroppedOldestHigh,
}

/// Bounded alert queue that sheds low-severity entries first.
pub struct AlertQueue {
    entries: Mutex<VecDeque<AlertEntry>>,
    capacity: usize,
    notify: Notify,
    metrics: Arc<Metrics>,
}

impl AlertQueue {
    pub fn new(capacity: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            notify: Notify::new(),
            metrics,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hard_capacity(&self) -> usize {
        self.capacity * 2
    }

    pub fn push(&self, entry: AlertEntry) -> EnqueueOutcome {
        let outcome = {
            let mut entries = self.entries.lock();
            let outcome = if entries.len() < self.capacity {
                EnqueueOutcome::Queued
            } else if let Some(position) = entries
                .iter()
                .position(|pending| pending.severity != Severity::HIGH)
            {
                if let Some(dropped) = entries.remove(position) {
                    warn!(
                        "alert queue full, dropped {} alert {} for {}",
                        dropped.severity.as_str(),
                        dropped.rule_name,
                        dropped.actor_id
                    );
                }
                self.metrics.record_alert_dropped_low();
                EnqueueOutcome::ReplacedLow
            } else if entry.severity != Severity::HIGH {
                warn!(
                    "alert queue full of HIGH alerts, dropped {} alert {} for {}",
                    entry.severity.as_str(),
                    entry.rule_name,
                    entry.actor_id
                );
                self.metrics.record_alert_dropped_low();
                return EnqueueOutcome::DroppedIncoming;
            } else if entries.len() < self.hard_capacity() {
                EnqueueOutcome::Overflowed
            } else {
                if let Some(dropped) = entries.pop_front() {
                    error!(
                        "alert queue at hard capacity {}, dropped HIGH alert {} for {}",
                        self.hard_capacity(),
                        dropped.rule_name,
                        dropped.actor_id
                    );
                }
                self.metrics.record_alert_dropped_high();
                EnqueueOutcome::DroppedOldestHigh
            };
            entries.push_back(entry);
            outcome
        };
        self.metrics.record_alert_enqueued();
        self.notify.notify_one();
        outcome
    }

    pub fn drain(&self, max: usize) -> Vec<AlertEntry> {
        let mut entries = self.entries.lock();
        let count = max.min(entries.len());
        entries.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Resolves once an entry was pushed since the last wait.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}
