use std::time::Duration;

use axum::routing::{delete, get};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use dupeguard_application::EngineState;

use crate::handlers::{exemption_handlers, ops_handlers, verdict_handlers};

pub fn build_router(state: EngineState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(ops_handlers::healthz))
        .route("/metrics", get(ops_handlers::metrics_prometheus))
        .route("/deliveries", get(ops_handlers::list_alert_deliveries))
        .route("/verdicts", get(verdict_handlers::list_verdicts))
        .route(
            "/exemptions",
            get(exemption_handlers::list_exemptions).post(exemption_handlers::add_exemption),
        )
        .route(
            "/exemptions/:entry",
            delete(exemption_handlers::remove_exemption),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
