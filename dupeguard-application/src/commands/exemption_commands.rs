use tracing::info;

use crate::{AppError, EngineState};

pub async fn add_exemption(state: &EngineState, entry: &str) -> Result<bool, AppError> {
    if entry.trim().is_empty() {
        return Err(AppError::BadRequest("exemption entry is required".to_string()));
    }
    let added = state.exemptions.add(entry);
    if added {
        persist(state).await?;
        info!("exempted {} from detection", entry.trim());
    }
    Ok(added)
}

pub async fn remove_exemption(state: &EngineState, entry: &str) -> Result<bool, AppError> {
    if entry.trim().is_empty() {
        return Err(AppError::BadRequest("exemption entry is required".to_string()));
    }
    let removed = state.exemptions.remove(entry);
    if removed {
        persist(state).await?;
        info!("removed exemption for {}", entry.trim());
    }
    Ok(removed)
}

pub fn list_exemptions(state: &EngineState) -> Vec<String> {
    state.exemptions.list()
}

async fn persist(state: &EngineState) -> Result<(), AppError> {
    state
        .exemption_repo
        .save_exemptions(&state.exemptions.list())
        .await
        .map_err(AppError::Internal)
}
