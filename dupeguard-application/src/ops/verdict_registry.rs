use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use dupeguard_domain::{ActorId, Verdict};

const MAX_VERDICTS_PER_ACTOR: usize = 64;

type Shard = Mutex<HashMap<ActorId, Vec<Verdict>>>;

/// Verdicts detected within the ledger's retention horizon, sharded by actor.
pub struct VerdictRegistry {
    retention_ms: i64,
    shards: Vec<Shard>,
}

impl VerdictRegistry {
    pub fn new(retention_ms: i64, shards: usize) -> Self {
        Self {
            retention_ms,
            shards: (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    pub fn insert(&self, verdict: Verdict) {
        let mut shard = self.shard(&verdict.actor_id).lock();
        let list = shard.entry(verdict.actor_id.clone()).or_default();
        list.push(verdict);
        if list.len() > MAX_VERDICTS_PER_ACTOR {
            let excess = list.len() - MAX_VERDICTS_PER_ACTOR;
            list.drain(..excess);
        }
    }

    /// Oldest first; ties break on actor id.
    pub fn active(&self, actor: Option<&ActorId>) -> Vec<Verdict> {
        let mut out: Vec<Verdict> = match actor {
            Some(actor) => self
                .shard(actor)
                .lock()
                .get(actor)
                .cloned()
                .unwrap_or_default(),
            None => self
                .shards
                .iter()
                .flat_map(|shard| shard.lock().values().flatten().cloned().collect::<Vec<_>>())
                .collect(),
        };
        out.sort_by(|a, b| {
            a.detected_at_ms
                .cmp(&b.detected_at_ms)
                .then_with(|| a.actor_id.cmp(&b.actor_id))
        });
        out
    }

    /// Drops verdicts detected before `now_ms - retention`, one shard at a time.
    pub fn expire(&self, now_ms: i64) -> usize {
        let cutoff = now_ms - self.retention_ms;
        let mut removed = 0;
        for shard in &self.shards {
            shard.lock().retain(|_, list| {
                let before = list.len();
                list.retain(|verdict| verdict.detected_at_ms >= cutoff);
                removed += before - list.len();
                !list.is_empty()
            });
        }
        removed
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().values().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard(&self, actor: &ActorId) -> &Shard {
        let mut hasher = DefaultHasher::new();
        actor.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}
