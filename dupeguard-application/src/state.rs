use std::sync::Arc;

use tracing::{debug, error};

use dupeguard_domain::{
    ActorId, Clock, EngineConfig, ExemptionRepository, SignatureMatcher, TransactionLedger,
};

use crate::ops::alert_queue::AlertQueue;
use crate::ops::dispatcher::{DispatchOutcome, MitigationDispatcher};
use crate::ops::exemptions::ExemptionList;
use crate::ops::scheduler::EvaluationScheduler;
use crate::ops::sink_worker::AlertSink;
use crate::ops::verdict_registry::VerdictRegistry;
use crate::Metrics;

#[derive(Clone)]
pub struct EngineState {
    pub config: Arc<EngineConfig>,
    pub ledger: Arc<TransactionLedger>,
    pub matcher: Arc<SignatureMatcher>,
    pub dispatcher: Arc<MitigationDispatcher>,
    pub alerts: Arc<AlertQueue>,
    pub sink: Arc<AlertSink>,
    pub verdicts: Arc<VerdictRegistry>,
    pub exemptions: Arc<ExemptionList>,
    pub exemption_repo: Arc<dyn ExemptionRepository>,
    pub scheduler: Arc<EvaluationScheduler>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<Metrics>,
}

impl EngineState {
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Matches the actor's current window and dispatches every verdict.
    pub async fn evaluate_actor(&self, actor: &ActorId) -> Vec<DispatchOutcome> {
        let Some(snapshot) = self.ledger.snapshot(actor) else {
            return Vec::new();
        };
        self.metrics.record_evaluation();
        let now_ms = self.now_ms();
        let verdicts = self.matcher.evaluate(&snapshot, now_ms);
        let mut outcomes = Vec::with_capacity(verdicts.len());
        for verdict in verdicts {
            outcomes.push(self.dispatcher.dispatch(verdict, now_ms).await);
        }
        if !outcomes.is_empty() {
            debug!("evaluated {}: {:?}", actor, outcomes);
        }
        outcomes
    }

    /// Drops all detection state; queued alerts are kept.
    pub fn reset_engine(&self, reason: &str) {
        error!("resetting detection state: {}", reason);
        self.scheduler.clear_pending();
        self.ledger.clear();
        self.dispatcher.clear();
        self.verdicts.clear();
        self.metrics.record_engine_reset();
    }
}
