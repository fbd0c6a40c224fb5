use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use dupeguard_domain::ActorId;

use crate::EngineState;

struct ShardQueue {
    sender: mpsc::UnboundedSender<ActorId>,
    // actors queued but not yet picked up; keeps one queue entry per actor
    pending: Mutex<HashSet<ActorId>>,
}

/// Routes evaluation requests to per-shard workers.
///
/// An actor always maps to the same shard and each shard worker runs one
/// evaluation at a time, so evaluations of one actor never overlap.
pub struct EvaluationScheduler {
    shards: Vec<ShardQueue>,
    accepting: AtomicBool,
}

impl EvaluationScheduler {
    pub fn new(shard_count: usize) -> (Self, Vec<mpsc::UnboundedReceiver<ActorId>>) {
        let mut shards = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..shard_count.max(1) {
            let (sender, receiver) = mpsc::unbounded_channel();
            shards.push(ShardQueue {
                sender,
                pending: Mutex::new(HashSet::new()),
            });
            receivers.push(receiver);
        }
        (
            Self {
                shards,
                accepting: AtomicBool::new(true),
            },
            receivers,
        )
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_of(&self, actor: &ActorId) -> usize {
        let mut hasher = DefaultHasher::new();
        actor.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Requests an evaluation; coalesces with one already queued.
    pub fn signal(&self, actor: &ActorId) -> bool {
        if !self.is_accepting() {
            return false;
        }
        let shard = &self.shards[self.shard_of(actor)];
        if !shard.pending.lock().insert(actor.clone()) {
            return true;
        }
        if shard.sender.send(actor.clone()).is_err() {
            shard.pending.lock().remove(actor);
            return false;
        }
        true
    }

    fn take(&self, shard: usize, actor: &ActorId) {
        self.shards[shard].pending.lock().remove(actor);
    }

    pub fn pending(&self) -> usize {
        self.shards.iter().map(|shard| shard.pending.lock().len()).sum()
    }

    pub fn clear_pending(&self) {
        for shard in &self.shards {
            shard.pending.lock().clear();
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }
}

pub async fn run_shard_worker(
    state: EngineState,
    shard: usize,
    mut receiver: mpsc::UnboundedReceiver<ActorId>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            next = receiver.recv() => match next {
                Some(actor) => process(&state, shard, actor).await,
                None => return,
            },
        }
    }

    let mut drained = 0usize;
    while let Ok(actor) = receiver.try_recv() {
        process(&state, shard, actor).await;
        drained += 1;
    }
    debug!("shard worker {} stopped after draining {} evaluations", shard, drained);
}

async fn process(state: &EngineState, shard: usize, actor: ActorId) {
    state.scheduler.take(shard, &actor);
    let evaluation = AssertUnwindSafe(state.evaluate_actor(&actor)).catch_unwind();
    if evaluation.await.is_err() {
        error!("evaluation for {} panicked on shard {}", actor, shard);
        state.reset_engine("evaluation panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_signals_coalesce() {
        let (scheduler, mut receivers) = EvaluationScheduler::new(2);
        let actor = ActorId::new("p1");
        assert!(scheduler.signal(&actor));
        assert!(scheduler.signal(&actor));
        assert_eq!(scheduler.pending(), 1);

        let shard = scheduler.shard_of(&actor);
        assert_eq!(receivers[shard].try_recv().ok(), Some(actor.clone()));
        assert!(receivers[shard].try_recv().is_err());

        scheduler.take(shard, &actor);
        assert!(scheduler.signal(&actor));
        assert_eq!(receivers[shard].try_recv().ok(), Some(actor));
    }

    #[test]
    fn actors_keep_their_shard() {
        let (scheduler, _receivers) = EvaluationScheduler::new(4);
        let actor = ActorId::new("p1");
        let shard = scheduler.shard_of(&actor);
        for _ in 0..10 {
            assert_eq!(scheduler.shard_of(&actor), shard);
        }
    }

    #[test]
    fn closed_scheduler_rejects_signals() {
        let (scheduler, _receivers) = EvaluationScheduler::new(1);
        scheduler.close();
        assert!(!scheduler.signal(&ActorId::new("p1")));
        assert_eq!(scheduler.pending(), 0);
    }
}
