// Alert entities

use serde::{Deserialize, Serialize};

use crate::value_objects::Severity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEntry {
    pub timestamp: String,
    pub actor_id: String,
    pub severity: Severity,
    pub rule_name: String,
    pub evidence_count: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEnvelope {
    pub envelope_id: String,
    pub created_at: String,
    pub alerts: Vec<AlertEntry>,
}

impl AlertEnvelope {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.alerts.iter().map(|entry| entry.severity).max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDeliveryRecord {
    pub timestamp_ms: i64,
    pub envelope_id: String,
    pub status: String,
    pub attempts: u32,
    pub alert_count: usize,
    pub rule_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
