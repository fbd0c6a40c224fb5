use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    events_received: AtomicU64,
    events_malformed: AtomicU64,
    ingest_queue_full: AtomicU64,
    events_exempt: AtomicU64,
    transactions_recorded: AtomicU64,
    transactions_duplicate: AtomicU64,
    transactions_out_of_order: AtomicU64,
    evaluations: AtomicU64,
    verdicts: AtomicU64,
    verdicts_duplicate: AtomicU64,
    mitigations_applied: AtomicU64,
    mitigations_failed: AtomicU64,
    dispatch_timeouts: AtomicU64,
    alerts_enqueued: AtomicU64,
    alerts_dropped_low: AtomicU64,
    alerts_dropped_high: AtomicU64,
    envelopes_delivered: AtomicU64,
    envelopes_failed: AtomicU64,
    delivery_attempts: AtomicU64,
    entries_evicted: AtomicU64,
    actors_evicted: AtomicU64,
    engine_resets: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_malformed: u64,
    pub ingest_queue_full: u64,
    pub events_exempt: u64,
    pub transactions_recorded: u64,
    pub transactions_duplicate: u64,
    pub transactions_out_of_order: u64,
    pub evaluations: u64,
    pub verdicts: u64,
    pub verdicts_duplicate: u64,
    pub mitigations_applied: u64,
    pub mitigations_failed: u64,
    pub dispatch_timeouts: u64,
    pub alerts_enqueued: u64,
    pub alerts_dropped_low: u64,
    pub alerts_dropped_high: u64,
    pub envelopes_delivered: u64,
    pub envelopes_failed: u64,
    pub delivery_attempts: u64,
    pub entries_evicted: u64,
    pub actors_evicted: u64,
    pub engine_resets: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
    pub fn record_received(&self) {
        bump(&self.events_received);
    }

    pub fn record_malformed(&self) {
        bump(&self.events_malformed);
    }

    pub fn record_queue_full(&self) {
        bump(&self.ingest_queue_full);
    }

    pub fn record_exempt(&self) {
        bump(&self.events_exempt);
    }

    pub fn record_recorded(&self) {
        bump(&self.transactions_recorded);
    }

    pub fn record_duplicate(&self) {
        bump(&self.transactions_duplicate);
    }

    pub fn record_out_of_order(&self) {
        bump(&self.transactions_out_of_order);
    }

    pub fn record_evaluation(&self) {
        bump(&self.evaluations);
    }

    pub fn record_verdict(&self) {
        bump(&self.verdicts);
    }

    pub fn record_duplicate_verdict(&self) {
        bump(&self.verdicts_duplicate);
    }

    pub fn record_mitigation(&self) {
        bump(&self.mitigations_applied);
    }

    pub fn record_mitigation_failure(&self) {
        bump(&self.mitigations_failed);
    }

    pub fn record_dispatch_timeout(&self) {
        bump(&self.dispatch_timeouts);
    }

    pub fn record_alert_enqueued(&self) {
        bump(&self.alerts_enqueued);
    }

    pub fn record_alert_dropped_low(&self) {
        bump(&self.alerts_dropped_low);
    }

    pub fn record_alert_dropped_high(&self) {
        bump(&self.alerts_dropped_high);
    }

    pub fn record_envelope_delivered(&self) {
        bump(&self.envelopes_delivered);
    }

    pub fn record_envelope_failed(&self) {
        bump(&self.envelopes_failed);
    }

    pub fn record_delivery_attempt(&self) {
        bump(&self.delivery_attempts);
    }

    pub fn record_sweep(&self, entries: usize, actors: usize) {
        self.entries_evicted
            .fetch_add(entries as u64, Ordering::Relaxed);
        self.actors_evicted
            .fetch_add(actors as u64, Ordering::Relaxed);
    }

    pub fn record_engine_reset(&self) {
        bump(&self.engine_resets);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_malformed: self.events_malformed.load(Ordering::Relaxed),
            ingest_queue_full: self.ingest_queue_full.load(Ordering::Relaxed),
            events_exempt: self.events_exempt.load(Ordering::Relaxed),
            transactions_recorded: self.transactions_recorded.load(Ordering::Relaxed),
            transactions_duplicate: self.transactions_duplicate.load(Ordering::Relaxed),
            transactions_out_of_order: self.transactions_out_of_order.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            verdicts: self.verdicts.load(Ordering::Relaxed),
            verdicts_duplicate: self.verdicts_duplicate.load(Ordering::Relaxed),
            mitigations_applied: self.mitigations_applied.load(Ordering::Relaxed),
            mitigations_failed: self.mitigations_failed.load(Ordering::Relaxed),
            dispatch_timeouts: self.dispatch_timeouts.load(Ordering::Relaxed),
            alerts_enqueued: self.alerts_enqueued.load(Ordering::Relaxed),
            alerts_dropped_low: self.alerts_dropped_low.load(Ordering::Relaxed),
            alerts_dropped_high: self.alerts_dropped_high.load(Ordering::Relaxed),
            envelopes_delivered: self.envelopes_delivered.load(Ordering::Relaxed),
            envelopes_failed: self.envelopes_failed.load(Ordering::Relaxed),
            delivery_attempts: self.delivery_attempts.load(Ordering::Relaxed),
            entries_evicted: self.entries_evicted.load(Ordering::Relaxed),
            actors_evicted: self.actors_evicted.load(Ordering::Relaxed),
            engine_resets: self.engine_resets.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters = [
            ("dupeguard_events_received_total", snapshot.events_received),
            ("dupeguard_events_malformed_total", snapshot.events_malformed),
            ("dupeguard_ingest_queue_full_total", snapshot.ingest_queue_full),
            ("dupeguard_events_exempt_total", snapshot.events_exempt),
            ("dupeguard_transactions_recorded_total", snapshot.transactions_recorded),
            ("dupeguard_transactions_duplicate_total", snapshot.transactions_duplicate),
            ("dupeguard_transactions_out_of_order_total", snapshot.transactions_out_of_order),
            ("dupeguard_evaluations_total", snapshot.evaluations),
            ("dupeguard_verdicts_total", snapshot.verdicts),
            ("dupeguard_verdicts_duplicate_total", snapshot.verdicts_duplicate),
            ("dupeguard_mitigations_applied_total", snapshot.mitigations_applied),
            ("dupeguard_mitigations_failed_total", snapshot.mitigations_failed),
            ("dupeguard_dispatch_timeouts_total", snapshot.dispatch_timeouts),
            ("dupeguard_alerts_enqueued_total", snapshot.alerts_enqueued),
            ("dupeguard_alerts_dropped_low_total", snapshot.alerts_dropped_low),
            ("dupeguard_alerts_dropped_high_total", snapshot.alerts_dropped_high),
            ("dupeguard_envelopes_delivered_total", snapshot.envelopes_delivered),
            ("dupeguard_envelopes_failed_total", snapshot.envelopes_failed),
            ("dupeguard_delivery_attempts_total", snapshot.delivery_attempts),
            ("dupeguard_entries_evicted_total", snapshot.entries_evicted),
            ("dupeguard_actors_evicted_total", snapshot.actors_evicted),
            ("dupeguard_engine_resets_total", snapshot.engine_resets),
        ];
        let mut out = String::new();
        for (name, value) in counters {
            out.push_str(&format!("# TYPE {} counter\n{} {}\n", name, name, value));
        }
        out
    }
}
