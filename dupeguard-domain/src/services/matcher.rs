use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::entities::{verdict_key, ItemTransaction, Verdict};
use crate::services::ledger::WindowSnapshot;
use crate::services::rules::{ConfiguredRule, RuleMatch, RuleSet};

pub struct SignatureMatcher {
    rules: Arc<RuleSet>,
}

impl SignatureMatcher {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Runs every rule in priority order over one actor window.
    ///
    /// A match whose evidence is contained in an already emitted verdict is
    /// suppressed, so one exploit attempt yields one verdict.
    pub fn evaluate(&self, snapshot: &WindowSnapshot, now_ms: i64) -> Vec<Verdict> {
        let mut entries = snapshot.entries.clone();
        entries.sort_by_key(|tx| (tx.timestamp_ms, tx.sequence));

        let mut emitted: Vec<HashSet<(u64, String)>> = Vec::new();
        let mut verdicts = Vec::new();
        for configured in self.rules.rules() {
            for found in configured.rule().evaluate(&entries) {
                if let Some(defect) = evidence_defect(configured, snapshot, &found) {
                    warn!(
                        "rule {} produced invalid evidence for {}: {}",
                        configured.name(),
                        snapshot.actor_id,
                        defect
                    );
                    continue;
                }
                let ids: HashSet<(u64, String)> = found
                    .evidence
                    .iter()
                    .map(|tx| (tx.sequence, tx.event_id.clone()))
                    .collect();
                if emitted.iter().any(|prior| ids.is_subset(prior)) {
                    continue;
                }
                emitted.push(ids);
                verdicts.push(Verdict {
                    key: verdict_key(&snapshot.actor_id, configured.name(), &found.evidence),
                    actor_id: snapshot.actor_id.clone(),
                    rule_name: configured.name().to_string(),
                    severity: configured.severity(),
                    action: found.action.unwrap_or_else(|| configured.action()),
                    evidence: found.evidence,
                    summary: found.summary,
                    detected_at_ms: now_ms,
                    under_scrutiny: snapshot.flagged,
                });
            }
        }
        verdicts
    }
}

fn evidence_defect(
    configured: &ConfiguredRule,
    snapshot: &WindowSnapshot,
    found: &RuleMatch,
) -> Option<String> {
    if found.evidence.is_empty() {
        return Some("empty evidence".to_string());
    }
    if let Some(foreign) = found
        .evidence
        .iter()
        .find(|tx| tx.actor_id != snapshot.actor_id)
    {
        return Some(format!("evidence from actor {}", foreign.actor_id));
    }
    let (earliest, latest) = span(&found.evidence);
    let horizon = configured.rule().horizon_ms();
    if latest - earliest > horizon {
        return Some(format!(
            "evidence spans {}ms over horizon {}ms",
            latest - earliest,
            horizon
        ));
    }
    None
}

fn span(evidence: &[Arc<ItemTransaction>]) -> (i64, i64) {
    evidence.iter().fold((i64::MAX, i64::MIN), |(low, high), tx| {
        (low.min(tx.timestamp_ms), high.max(tx.timestamp_ms))
    })
}
