use dupeguard_domain::AlertDeliveryRecord;

use crate::EngineState;

const MAX_LIMIT: usize = 200;

pub fn recent_deliveries(state: &EngineState, limit: Option<usize>) -> Vec<AlertDeliveryRecord> {
    let limit = limit.unwrap_or(50).clamp(1, MAX_LIMIT);
    state.sink.recent_deliveries(limit)
}
