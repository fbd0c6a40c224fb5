use std::sync::Arc;

use tracing::{debug, warn};

use dupeguard_domain::{normalize, LedgerError, RawEvent, RecordOutcome};

use crate::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Recorded,
    /// Redelivered transaction; nothing is re-evaluated.
    Duplicate,
    /// Recorded despite a sequence regression; the actor is now flagged.
    OutOfOrder,
    Exempt,
    Malformed,
    /// The engine has stopped accepting events.
    Closed,
    /// Ledger corruption forced a state reset; the event was lost.
    Reset,
}

/// Normalizes one host event, records it and schedules the actor's evaluation.
pub fn ingest_event(state: &EngineState, raw: &RawEvent) -> IngestOutcome {
    if !state.scheduler.is_accepting() {
        return IngestOutcome::Closed;
    }
    state.metrics.record_received();

    if state.exemptions.is_exempt(raw) {
        state.metrics.record_exempt();
        return IngestOutcome::Exempt;
    }

    let tx = match normalize(raw) {
        Ok(tx) => Arc::new(tx),
        Err(err) => {
            state.metrics.record_malformed();
            debug!("discarding malformed {} event: {}", raw.event_type, err);
            return IngestOutcome::Malformed;
        }
    };
    let actor = tx.actor_id.clone();

    let outcome = match state.ledger.record(tx, state.now_ms()) {
        Ok(RecordOutcome::Recorded) => {
            state.metrics.record_recorded();
            IngestOutcome::Recorded
        }
        Ok(RecordOutcome::Duplicate) => {
            state.metrics.record_duplicate();
            return IngestOutcome::Duplicate;
        }
        Err(err @ LedgerError::OutOfOrder { .. }) => {
            warn!("{}", err);
            state.metrics.record_recorded();
            state.metrics.record_out_of_order();
            IngestOutcome::OutOfOrder
        }
        Err(err) => {
            state.reset_engine(&err.to_string());
            return IngestOutcome::Reset;
        }
    };

    state.scheduler.signal(&actor);
    outcome
}
