use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::entities::{ItemTransaction, LedgerConfig};
use crate::errors::LedgerError;
use crate::value_objects::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Redelivery of a transaction already recorded for the actor.
    Duplicate,
}

/// Read-only copy of one actor window; entries are shared, never mutated.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub actor_id: ActorId,
    pub entries: Vec<Arc<ItemTransaction>>,
    pub flagged: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub entries_evicted: usize,
    pub actors_removed: usize,
}

// Delivered ids kept per actor, independent of window eviction.
const DELIVERY_MEMORY: usize = 256;

#[derive(Debug, Default)]
struct ActorWindow {
    entries: VecDeque<Arc<ItemTransaction>>,
    delivered: VecDeque<(u64, String)>,
    last_sequence: Option<u64>,
    newest_ms: Option<i64>,
    last_seen_ms: i64,
    flagged: bool,
    out_of_order: u64,
    // set when an entry was appended with an older timestamp than its predecessor
    disordered: bool,
    // set by sweep under the window lock before the shard drops it
    removed: bool,
}

impl ActorWindow {
    fn was_delivered(&self, tx: &ItemTransaction) -> bool {
        self.delivered
            .iter()
            .rev()
            .any(|(sequence, event_id)| *sequence == tx.sequence && *event_id == tx.event_id)
    }

    fn push(&mut self, tx: Arc<ItemTransaction>, memory: usize) {
        if let Some(back) = self.entries.back() {
            if tx.timestamp_ms < back.timestamp_ms {
                self.disordered = true;
            }
        }
        let newest = self
            .newest_ms
            .map_or(tx.timestamp_ms, |newest| newest.max(tx.timestamp_ms));
        self.newest_ms = Some(newest);
        self.delivered.push_back((tx.sequence, tx.event_id.clone()));
        while self.delivered.len() > memory {
            self.delivered.pop_front();
        }
        self.entries.push_back(tx);
    }

    /// Retention is measured against the newest event time the actor has sent.
    fn evict(&mut self, retention_ms: i64, capacity: usize) -> usize {
        let before = self.entries.len();
        if let Some(newest) = self.newest_ms {
            let cutoff_ms = newest.saturating_sub(retention_ms);
            while let Some(front) = self.entries.front() {
                if front.timestamp_ms >= cutoff_ms {
                    break;
                }
                self.entries.pop_front();
            }
            if self.disordered {
                self.entries.retain(|entry| entry.timestamp_ms >= cutoff_ms);
            }
        }
        if self.disordered {
            self.disordered = self
                .entries
                .iter()
                .zip(self.entries.iter().skip(1))
                .any(|(prev, next)| next.timestamp_ms < prev.timestamp_ms);
        }
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }
}

type Shard = RwLock<HashMap<ActorId, Arc<Mutex<ActorWindow>>>>;

pub struct TransactionLedger {
    retention_ms: i64,
    capacity: usize,
    shards: Vec<Shard>,
}

impl TransactionLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        let shard_count = config.shards.max(1);
        Self {
            retention_ms: config.retention_ms,
            capacity: config.window_capacity.max(1),
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Appends to the actor's window and evicts by retention and capacity.
    ///
    /// `now_ms` only marks the actor as active; retention follows the event
    /// timestamps. A sequence regression is still recorded; the actor is
    /// flagged and the regression is reported as `LedgerError::OutOfOrder`.
    pub fn record(
        &self,
        tx: Arc<ItemTransaction>,
        now_ms: i64,
    ) -> Result<RecordOutcome, LedgerError> {
        loop {
            let window = self.window_for(&tx.actor_id);
            let mut window = window.lock();
            if window.removed {
                // swept between lookup and lock; a fresh window replaces it
                continue;
            }
            return self.append(&mut window, tx, now_ms);
        }
    }

    fn append(
        &self,
        window: &mut ActorWindow,
        tx: Arc<ItemTransaction>,
        now_ms: i64,
    ) -> Result<RecordOutcome, LedgerError> {
        window.last_seen_ms = now_ms;

        let mut regression = None;
        if let Some(last) = window.last_sequence {
            if tx.sequence <= last {
                if window.was_delivered(&tx) {
                    return Ok(RecordOutcome::Duplicate);
                }
                regression = Some(last);
            }
        }

        let actor = tx.actor_id.clone();
        let sequence = tx.sequence;
        window.push(tx, self.capacity.max(DELIVERY_MEMORY));
        window.evict(self.retention_ms, self.capacity);

        if window.entries.len() > self.capacity {
            return Err(LedgerError::Corrupted {
                actor,
                len: window.entries.len(),
                capacity: self.capacity,
            });
        }

        match regression {
            Some(last) => {
                window.flagged = true;
                window.out_of_order += 1;
                Err(LedgerError::OutOfOrder {
                    actor,
                    last,
                    got: sequence,
                })
            }
            None => {
                window.last_sequence = Some(sequence);
                Ok(RecordOutcome::Recorded)
            }
        }
    }

    pub fn snapshot(&self, actor: &ActorId) -> Option<WindowSnapshot> {
        let window = self.existing_window(actor)?;
        let window = window.lock();
        Some(WindowSnapshot {
            actor_id: actor.clone(),
            entries: window.entries.iter().cloned().collect(),
            flagged: window.flagged,
        })
    }

    /// Evicts expired entries and drops actors idle past the horizon.
    /// At most one actor window is locked at any time.
    pub fn sweep(&self, now_ms: i64, idle_horizon_ms: i64) -> SweepReport {
        let mut report = SweepReport::default();
        let idle_before = now_ms - idle_horizon_ms;

        for shard in &self.shards {
            let windows: Vec<(ActorId, Arc<Mutex<ActorWindow>>)> = shard
                .read()
                .iter()
                .map(|(actor, window)| (actor.clone(), Arc::clone(window)))
                .collect();

            let mut idle = Vec::new();
            for (actor, window) in windows {
                let mut window = window.lock();
                report.entries_evicted += window.evict(self.retention_ms, self.capacity);
                if window.last_seen_ms <= idle_before {
                    idle.push(actor);
                }
            }

            if idle.is_empty() {
                continue;
            }
            let mut shard = shard.write();
            for actor in idle {
                let dropped = match shard.get(&actor) {
                    Some(window) => {
                        let mut window = window.lock();
                        if window.last_seen_ms <= idle_before {
                            window.removed = true;
                            Some(window.entries.len())
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                if let Some(entries) = dropped {
                    shard.remove(&actor);
                    report.entries_evicted += entries;
                    report.actors_removed += 1;
                }
            }
        }
        report
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            for (_, window) in shard.write().drain() {
                window.lock().removed = true;
            }
        }
    }

    pub fn actor_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn window_len(&self, actor: &ActorId) -> usize {
        self.existing_window(actor)
            .map(|window| window.lock().entries.len())
            .unwrap_or(0)
    }

    pub fn is_flagged(&self, actor: &ActorId) -> bool {
        self.existing_window(actor)
            .map(|window| window.lock().flagged)
            .unwrap_or(false)
    }

    pub fn out_of_order_count(&self, actor: &ActorId) -> u64 {
        self.existing_window(actor)
            .map(|window| window.lock().out_of_order)
            .unwrap_or(0)
    }

    pub fn actors(&self) -> Vec<ActorId> {
        self.shards
            .iter()
            .flat_map(|shard| shard.read().keys().cloned().collect::<Vec<_>>())
            .collect()
    }

    fn shard(&self, actor: &ActorId) -> &Shard {
        let mut hasher = DefaultHasher::new();
        actor.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    fn existing_window(&self, actor: &ActorId) -> Option<Arc<Mutex<ActorWindow>>> {
        self.shard(actor).read().get(actor).cloned()
    }

    fn window_for(&self, actor: &ActorId) -> Arc<Mutex<ActorWindow>> {
        if let Some(window) = self.existing_window(actor) {
            return window;
        }
        let mut shard = self.shard(actor).write();
        Arc::clone(shard.entry(actor.clone()).or_default())
    }
}
