use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use dupeguard_domain::SweepReport;

use crate::EngineState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub ledger: SweepReport,
    pub verdict_keys_expired: usize,
    pub verdicts_expired: usize,
}

/// One expiry pass over the ledger, dispatcher keys and active verdicts.
pub fn sweep_once(state: &EngineState) -> SweepSummary {
    let now_ms = state.now_ms();
    let ledger = state
        .ledger
        .sweep(now_ms, state.config.ledger.idle_horizon_ms);
    let verdict_keys_expired = state.dispatcher.expire_keys(now_ms);
    let verdicts_expired = state.verdicts.expire(now_ms);
    state
        .metrics
        .record_sweep(ledger.entries_evicted, ledger.actors_removed);

    let summary = SweepSummary {
        ledger,
        verdict_keys_expired,
        verdicts_expired,
    };
    if summary != SweepSummary::default() {
        debug!(
            "sweep evicted {} entries, {} idle actors, {} verdict keys, {} verdicts",
            ledger.entries_evicted, ledger.actors_removed, verdict_keys_expired, verdicts_expired
        );
    }
    summary
}

pub async fn run_sweeper(state: EngineState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(Duration::from_millis(
        state.config.ledger.sweep_interval_ms.max(1),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&state);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
