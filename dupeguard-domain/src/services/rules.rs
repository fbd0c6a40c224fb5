// Duplication signature rules
pub mod acquisition_burst;
pub mod boundary_straddle;
pub mod metadata_clone;
pub mod quantity_inflation;
pub mod split_stack;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquisition_burst::*;
pub use boundary_straddle::*;
pub use metadata_clone::*;
pub use quantity_inflation::*;
pub use split_stack::*;

use std::sync::Arc;

use crate::entities::{ItemTransaction, RuleSettings, RulesConfig};
use crate::value_objects::{MitigationAction, Severity};

#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub evidence: Vec<Arc<ItemTransaction>>,
    pub summary: String,
    /// Replaces the rule's configured action for this match only.
    pub action: Option<MitigationAction>,
}

pub trait SignatureRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn default_severity(&self) -> Severity;
    fn default_action(&self) -> MitigationAction;
    /// Longest time span a match's evidence may cover.
    fn horizon_ms(&self) -> i64;
    /// `entries` belong to one actor and are ordered by (timestamp, sequence).
    fn evaluate(&self, entries: &[Arc<ItemTransaction>]) -> Vec<RuleMatch>;
}

pub struct ConfiguredRule {
    rule: Box<dyn SignatureRule>,
    severity: Severity,
    action: MitigationAction,
}

impl ConfiguredRule {
    pub fn new(rule: Box<dyn SignatureRule>, settings: &RuleSettings) -> Self {
        let severity = settings.severity.unwrap_or_else(|| rule.default_severity());
        let action = settings.action.unwrap_or_else(|| rule.default_action());
        Self {
            rule,
            severity,
            action,
        }
    }

    pub fn with_defaults(rule: Box<dyn SignatureRule>) -> Self {
        Self::new(rule, &RuleSettings::enabled())
    }

    pub fn rule(&self) -> &dyn SignatureRule {
        self.rule.as_ref()
    }

    pub fn name(&self) -> &'static str {
        self.rule.name()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn action(&self) -> MitigationAction {
        self.action
    }
}

/// Immutable, priority-ordered rule catalogue.
pub struct RuleSet {
    rules: Vec<ConfiguredRule>,
}

impl RuleSet {
    /// Orders rules by effective severity, keeping the given order among equals.
    pub fn new(mut rules: Vec<ConfiguredRule>) -> Self {
        rules.sort_by(|a, b| b.severity.cmp(&a.severity));
        Self { rules }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rules = Vec::new();
        if config.boundary_straddle.settings.enabled {
            rules.push(ConfiguredRule::new(
                Box::new(BoundaryStraddleRule::new(config.boundary_straddle.horizon_ms)),
                &config.boundary_straddle.settings,
            ));
        }
        if config.split_stack.settings.enabled {
            rules.push(ConfiguredRule::new(
                Box::new(SplitStackRule::new(config.split_stack.window_ms)),
                &config.split_stack.settings,
            ));
        }
        if config.quantity_inflation.settings.enabled {
            rules.push(ConfiguredRule::new(
                Box::new(QuantityInflationRule::from_config(&config.quantity_inflation)),
                &config.quantity_inflation.settings,
            ));
        }
        if config.metadata_clone.settings.enabled {
            rules.push(ConfiguredRule::new(
                Box::new(MetadataCloneRule::from_config(&config.metadata_clone)),
                &config.metadata_clone.settings,
            ));
        }
        if config.acquisition_burst.settings.enabled {
            rules.push(ConfiguredRule::new(
                Box::new(AcquisitionBurstRule::new(
                    config.acquisition_burst.window_ms,
                    config.acquisition_burst.limits.clone(),
                )),
                &config.acquisition_burst.settings,
            ));
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[ConfiguredRule] {
        &self.rules
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(ConfiguredRule::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_ordered_by_severity() {
        let rules = RuleSet::from_config(&RulesConfig::default());
        assert_eq!(
            rules.names(),
            vec![
                "boundary-straddle",
                "split-stack-replay",
                "quantity-inflation",
                "metadata-clone",
                "acquisition-burst",
            ]
        );
    }

    #[test]
    fn overrides_change_priority_and_action() {
        let mut config = RulesConfig::default();
        config.acquisition_burst.settings.severity = Some(Severity::HIGH);
        config.split_stack.settings.action = Some(MitigationAction::LogOnly);
        config.metadata_clone.settings.enabled = false;
        let rules = RuleSet::from_config(&config);
        assert_eq!(
            rules.names(),
            vec![
                "boundary-straddle",
                "split-stack-replay",
                "acquisition-burst",
                "quantity-inflation",
            ]
        );
        assert_eq!(rules.rules()[1].action(), MitigationAction::LogOnly);
        assert_eq!(rules.rules()[2].severity(), Severity::HIGH);
    }
}
