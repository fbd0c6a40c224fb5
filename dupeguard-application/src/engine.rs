use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use dupeguard_domain::{
    ActorId, AlertDeliveryRecord, AlertTransport, Clock, EngineConfig, EventSource,
    ExemptionRepository, HostCollaborator, RawEvent, RuleSet, SignatureMatcher, TransactionKind,
    TransactionLedger, Verdict,
};

use crate::commands::{add_exemption, ingest_event, remove_exemption, IngestOutcome};
use crate::ops::{
    run_shard_worker, run_sweeper, AlertQueue, AlertSink, EvaluationScheduler, ExemptionList,
    MitigationDispatcher, VerdictRegistry,
};
use crate::{AppError, EngineState, Metrics};

/// Host-side collaborators the engine is wired to.
pub struct EngineDeps {
    pub host: Arc<dyn HostCollaborator>,
    pub transport: Arc<dyn AlertTransport>,
    pub exemption_repo: Arc<dyn ExemptionRepository>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub workers_aborted: usize,
    pub evaluations_discarded: usize,
    pub alerts_discarded: usize,
}

struct EngineTasks {
    pump: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    sweeper: JoinHandle<()>,
    sink: JoinHandle<()>,
}

pub struct DetectionEngine;

impl DetectionEngine {
    /// Starts the engine with the rule catalogue built from `config.rules`.
    /// Must be called inside a tokio runtime.
    pub fn start(config: EngineConfig, deps: EngineDeps, exemptions: Vec<String>) -> EngineHandle {
        let rules = RuleSet::from_config(&config.rules);
        Self::start_with_rules(config, rules, deps, exemptions)
    }

    pub fn start_with_rules(
        config: EngineConfig,
        rules: RuleSet,
        deps: EngineDeps,
        exemptions: Vec<String>,
    ) -> EngineHandle {
        let config = Arc::new(config);
        let metrics = Arc::new(Metrics::default());
        let alerts = Arc::new(AlertQueue::new(config.alerts.queue_capacity, metrics.clone()));
        let verdicts = Arc::new(VerdictRegistry::new(config.ledger.retention_ms, config.ledger.shards));
        let dispatcher = Arc::new(MitigationDispatcher::new(
            deps.host,
            alerts.clone(),
            verdicts.clone(),
            metrics.clone(),
            Duration::from_millis(config.dispatch_timeout_ms),
            config.verdict_ttl_ms(),
            config.verdict_key_capacity,
        ));
        let sink = Arc::new(AlertSink::new(
            deps.transport,
            alerts.clone(),
            config.alerts.clone(),
            metrics.clone(),
        ));
        let (scheduler, receivers) = EvaluationScheduler::new(config.worker_shards);
        let rule_names = rules.names();

        let state = EngineState {
            config: config.clone(),
            ledger: Arc::new(TransactionLedger::new(&config.ledger)),
            matcher: Arc::new(SignatureMatcher::new(Arc::new(rules))),
            dispatcher,
            alerts,
            sink: sink.clone(),
            verdicts,
            exemptions: Arc::new(ExemptionList::new(exemptions)),
            exemption_repo: deps.exemption_repo,
            scheduler: Arc::new(scheduler),
            clock: deps.clock,
            metrics,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest_queue_capacity.max(1));
        let workers = receivers
            .into_iter()
            .enumerate()
            .map(|(shard, receiver)| {
                tokio::spawn(run_shard_worker(
                    state.clone(),
                    shard,
                    receiver,
                    shutdown_rx.clone(),
                ))
            })
            .collect();
        let tasks = EngineTasks {
            pump: tokio::spawn(run_ingest_pump(state.clone(), ingest_rx, shutdown_rx.clone())),
            workers,
            sweeper: tokio::spawn(run_sweeper(state.clone(), shutdown_rx.clone())),
            sink: tokio::spawn(sink.run(shutdown_rx)),
        };

        info!(
            "detection engine started: {} shards, rules [{}], {} exemptions",
            state.scheduler.shard_count(),
            rule_names.join(", "),
            state.exemptions.len()
        );

        EngineHandle {
            state,
            ingest_tx,
            shutdown_tx,
            tasks,
            sources: Mutex::new(Vec::new()),
        }
    }
}

async fn run_ingest_pump(
    state: EngineState,
    mut receiver: mpsc::Receiver<RawEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            next = receiver.recv() => match next {
                Some(raw) => {
                    ingest_event(&state, &raw);
                }
                None => break,
            },
        }
    }
    receiver.close();
    let mut discarded = 0usize;
    while receiver.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        warn!("ingest pump stopped, discarded {} queued events", discarded);
    }
}

pub struct EngineHandle {
    state: EngineState,
    ingest_tx: mpsc::Sender<RawEvent>,
    shutdown_tx: watch::Sender<bool>,
    tasks: EngineTasks,
    sources: Mutex<Vec<AbortHandle>>,
}

impl EngineHandle {
    /// Synchronous ingestion on the caller's thread.
    pub fn ingest(&self, raw: &RawEvent) -> IngestOutcome {
        ingest_event(&self.state, raw)
    }

    /// Queues an event for the ingest pump; a full queue drops it.
    pub fn submit(&self, raw: RawEvent) -> bool {
        match self.ingest_tx.try_send(raw) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.state.metrics.record_queue_full();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Pumps a host push stream into the bounded ingest queue.
    pub fn attach_source(&self, source: &dyn EventSource) -> JoinHandle<()> {
        let mut stream = source.subscribe(&TransactionKind::ALL);
        let sender = self.ingest_tx.clone();
        let metrics = self.state.metrics.clone();
        let handle = tokio::spawn(async move {
            while let Some(raw) = stream.next().await {
                match sender.try_send(raw) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => metrics.record_queue_full(),
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });
        self.sources.lock().push(handle.abort_handle());
        handle
    }

    pub fn active_verdicts(&self, actor: Option<&ActorId>) -> Vec<Verdict> {
        self.state.verdicts.active(actor)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.state.metrics
    }

    pub fn recent_deliveries(&self, limit: usize) -> Vec<AlertDeliveryRecord> {
        self.state.sink.recent_deliveries(limit)
    }

    pub async fn exempt(&self, identifier: &str) -> Result<bool, AppError> {
        add_exemption(&self.state, identifier).await
    }

    pub async fn unexempt(&self, identifier: &str) -> Result<bool, AppError> {
        remove_exemption(&self.state, identifier).await
    }

    pub fn exemptions(&self) -> Vec<String> {
        self.state.exemptions.list()
    }

    pub fn is_accepting(&self) -> bool {
        self.state.scheduler.is_accepting()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Stops ingestion, drains in-flight evaluations, then flushes alerts
    /// until `grace` runs out.
    pub async fn shutdown(self, grace: Duration) -> ShutdownReport {
        let deadline = Instant::now() + grace;
        let mut report = ShutdownReport::default();

        for source in self.sources.lock().drain(..) {
            source.abort();
        }
        self.state.scheduler.close();
        let _ = self.shutdown_tx.send(true);

        let pump_abort = self.tasks.pump.abort_handle();
        if timeout_at(deadline, self.tasks.pump).await.is_err() {
            pump_abort.abort();
        }
        for worker in self.tasks.workers {
            let abort = worker.abort_handle();
            if timeout_at(deadline, worker).await.is_err() {
                abort.abort();
                report.workers_aborted += 1;
            }
        }
        report.evaluations_discarded = self.state.scheduler.pending();
        self.tasks.sweeper.abort();

        let sink_abort = self.tasks.sink.abort_handle();
        if timeout_at(deadline, self.tasks.sink).await.is_err() {
            sink_abort.abort();
            warn!("alert sink did not stop within the shutdown grace");
        }
        report.alerts_discarded = self.state.sink.flush(deadline).await;

        info!(
            "detection engine stopped: {} workers aborted, {} evaluations and {} alerts discarded",
            report.workers_aborted, report.evaluations_discarded, report.alerts_discarded
        );
        report
    }
}
