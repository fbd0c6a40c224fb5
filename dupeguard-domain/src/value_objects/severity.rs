// Severity value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    LOW,
    MEDIUM,
    HIGH,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::LOW => "LOW",
            Severity::MEDIUM => "MEDIUM",
            Severity::HIGH => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "LOW" => Some(Severity::LOW),
            "MEDIUM" => Some(Severity::MEDIUM),
            "HIGH" => Some(Severity::HIGH),
            _ => None,
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        Severity::parse(s).unwrap_or(Severity::MEDIUM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_high_above_low() {
        assert!(Severity::HIGH > Severity::MEDIUM);
        assert!(Severity::MEDIUM > Severity::LOW);
    }

    #[test]
    fn unknown_severity_falls_back_to_medium() {
        assert_eq!(Severity::from("high"), Severity::HIGH);
        assert_eq!(Severity::from("critical"), Severity::MEDIUM);
        assert_eq!(Severity::parse("critical"), None);
    }
}
