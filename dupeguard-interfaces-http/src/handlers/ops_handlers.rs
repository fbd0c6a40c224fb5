use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use dupeguard_application::queries::delivery_queries;
use dupeguard_application::EngineState;
use dupeguard_domain::AlertDeliveryRecord;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub accepting: bool,
    pub actors: usize,
}

#[derive(Deserialize)]
pub struct AlertDeliveryQuery {
    pub limit: Option<usize>,
}

pub async fn healthz(State(state): State<EngineState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        accepting: state.scheduler.is_accepting(),
        actors: state.ledger.actor_count(),
    })
}

pub async fn metrics_prometheus(State(state): State<EngineState>) -> impl IntoResponse {
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}

pub async fn list_alert_deliveries(
    State(state): State<EngineState>,
    Query(query): Query<AlertDeliveryQuery>,
) -> Json<Vec<AlertDeliveryRecord>> {
    Json(delivery_queries::recent_deliveries(&state, query.limit))
}
