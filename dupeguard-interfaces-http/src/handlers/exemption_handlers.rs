use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use dupeguard_application::commands::exemption_commands;
use dupeguard_application::EngineState;

use crate::error::HttpError;

#[derive(Deserialize)]
pub struct ExemptionPayload {
    pub entry: String,
}

pub async fn list_exemptions(State(state): State<EngineState>) -> Json<Vec<String>> {
    Json(exemption_commands::list_exemptions(&state))
}

pub async fn add_exemption(
    State(state): State<EngineState>,
    Json(payload): Json<ExemptionPayload>,
) -> Result<StatusCode, HttpError> {
    let added = exemption_commands::add_exemption(&state, &payload.entry).await?;
    Ok(if added { StatusCode::CREATED } else { StatusCode::OK })
}

pub async fn remove_exemption(
    State(state): State<EngineState>,
    Path(entry): Path<String>,
) -> Result<StatusCode, HttpError> {
    let removed = exemption_commands::remove_exemption(&state, &entry).await?;
    Ok(if removed { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND })
}
