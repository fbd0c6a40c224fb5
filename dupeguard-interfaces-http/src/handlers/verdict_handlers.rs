use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use dupeguard_application::queries::verdict_queries;
use dupeguard_application::EngineState;
use dupeguard_domain::{AlertEntry, Verdict};

#[derive(Deserialize)]
pub struct VerdictQuery {
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictView {
    pub key: String,
    #[serde(flatten)]
    pub alert: AlertEntry,
    pub action: String,
    pub under_scrutiny: bool,
    pub evidence_event_ids: Vec<String>,
}

impl From<&Verdict> for VerdictView {
    fn from(verdict: &Verdict) -> Self {
        Self {
            key: verdict.key.as_str().to_string(),
            alert: verdict.to_alert_entry(),
            action: verdict.action.as_str().to_string(),
            under_scrutiny: verdict.under_scrutiny,
            evidence_event_ids: verdict
                .evidence
                .iter()
                .map(|tx| tx.event_id.clone())
                .collect(),
        }
    }
}

pub async fn list_verdicts(
    State(state): State<EngineState>,
    Query(query): Query<VerdictQuery>,
) -> Json<Vec<VerdictView>> {
    let verdicts = verdict_queries::active_verdicts(&state, query.actor.as_deref());
    Json(verdicts.iter().map(VerdictView::from).collect())
}
