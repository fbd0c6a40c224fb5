// Mitigation action value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MitigationAction {
    #[serde(alias = "CANCEL")]
    CancelTransaction,
    #[serde(alias = "REMOVE_EXCESS", alias = "REMOVE")]
    RemoveItems,
    #[serde(alias = "WARN", alias = "LOG")]
    LogOnly,
}

impl MitigationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MitigationAction::CancelTransaction => "CANCEL_TRANSACTION",
            MitigationAction::RemoveItems => "REMOVE_ITEMS",
            MitigationAction::LogOnly => "LOG_ONLY",
        }
    }

    /// Accepts the action names plus the plugin-era aliases (`WARN`, `LOG`, `REMOVE_EXCESS`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().replace('-', "_").as_str() {
            "CANCEL_TRANSACTION" | "CANCEL" => Some(MitigationAction::CancelTransaction),
            "REMOVE_ITEMS" | "REMOVE_EXCESS" | "REMOVE" => Some(MitigationAction::RemoveItems),
            "LOG_ONLY" | "LOG" | "WARN" => Some(MitigationAction::LogOnly),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(MitigationAction::parse("warn"), Some(MitigationAction::LogOnly));
        assert_eq!(
            MitigationAction::parse("remove-excess"),
            Some(MitigationAction::RemoveItems)
        );
        assert_eq!(
            MitigationAction::parse("CANCEL_TRANSACTION"),
            Some(MitigationAction::CancelTransaction)
        );
        assert_eq!(MitigationAction::parse("ban"), None);
    }
}
