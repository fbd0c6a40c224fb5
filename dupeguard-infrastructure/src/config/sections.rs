use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use dupeguard_domain::{
    normalize_item_type, AcquisitionBurstConfig, BoundaryStraddleConfig, MetadataCloneConfig,
    MitigationAction, MonitoredItem, QuantityInflationConfig, RuleSettings, RulesConfig, Severity,
    SplitStackConfig,
};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSection {
    pub worker_shards: usize,
    pub ingest_queue_capacity: usize,
    pub dispatch_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    pub verdict_key_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            worker_shards: 4,
            ingest_queue_capacity: 65_536,
            dispatch_timeout_ms: 50,
            shutdown_grace_ms: 2_000,
            verdict_key_capacity: 100_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsSection {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub format: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub mention_everyone: bool,
    pub signing_secret: Option<String>,
    pub batch_interval_ms: u64,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub request_timeout_ms: u64,
    pub history_capacity: usize,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            format: "json".to_string(),
            username: "DupeDetection Bot".to_string(),
            avatar_url: None,
            mention_everyone: true,
            signing_secret: None,
            batch_interval_ms: 1_000,
            batch_size: 25,
            queue_capacity: 1_024,
            max_attempts: 5,
            backoff_base_ms: 200,
            backoff_max_ms: 5_000,
            request_timeout_ms: 5_000,
            history_capacity: 200,
        }
    }
}

impl AlertsSection {
    /// The webhook to deliver to, if alerts are enabled and the URL is not a placeholder.
    pub fn webhook_target(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.webhook_url
            .as_deref()
            .filter(|url| !url.contains("YOUR_WEBHOOK"))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSection {
    pub enabled: bool,
    pub bind: String,
    pub request_timeout_ms: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:9464".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryStraddleSection {
    pub enabled: bool,
    pub severity: Option<String>,
    pub action: Option<String>,
    pub horizon_ms: i64,
}

impl Default for BoundaryStraddleSection {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
            horizon_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SplitStackSection {
    pub enabled: bool,
    pub severity: Option<String>,
    pub action: Option<String>,
    pub window_ms: i64,
}

impl Default for SplitStackSection {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
            window_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuantityInflationSection {
    pub enabled: bool,
    pub severity: Option<String>,
    pub action: Option<String>,
    pub default_stack_limit: u32,
    pub stack_limits: BTreeMap<String, u32>,
    pub recipe_yields: BTreeMap<String, u32>,
}

impl Default for QuantityInflationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
            default_stack_limit: 64,
            stack_limits: BTreeMap::new(),
            recipe_yields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetadataCloneSection {
    pub enabled: bool,
    pub severity: Option<String>,
    pub action: Option<String>,
    pub min_copies: usize,
    pub horizon_ms: i64,
    pub monitored: BTreeMap<String, MonitoredItemSection>,
}

impl Default for MetadataCloneSection {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
            min_copies: 3,
            horizon_ms: 30_000,
            monitored: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MonitoredItemSection {
    pub min_copies: Option<usize>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AcquisitionBurstSection {
    pub enabled: bool,
    pub severity: Option<String>,
    pub action: Option<String>,
    pub window_ms: i64,
    pub limits: BTreeMap<String, u64>,
}

impl Default for AcquisitionBurstSection {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
            window_ms: 30_000,
            limits: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RulesSection {
    pub boundary_straddle: BoundaryStraddleSection,
    pub split_stack: SplitStackSection,
    pub quantity_inflation: QuantityInflationSection,
    pub metadata_clone: MetadataCloneSection,
    pub acquisition_burst: AcquisitionBurstSection,
}

impl RulesSection {
    pub fn normalize(&mut self) {
        for (severity, action) in [
            (&mut self.boundary_straddle.severity, &mut self.boundary_straddle.action),
            (&mut self.split_stack.severity, &mut self.split_stack.action),
            (&mut self.quantity_inflation.severity, &mut self.quantity_inflation.action),
            (&mut self.metadata_clone.severity, &mut self.metadata_clone.action),
            (&mut self.acquisition_burst.severity, &mut self.acquisition_burst.action),
        ] {
            blank_to_none(severity);
            blank_to_none(action);
        }
        self.quantity_inflation.stack_limits =
            normalize_item_map(std::mem::take(&mut self.quantity_inflation.stack_limits));
        self.quantity_inflation.recipe_yields =
            normalize_item_map(std::mem::take(&mut self.quantity_inflation.recipe_yields));
        self.acquisition_burst.limits =
            normalize_item_map(std::mem::take(&mut self.acquisition_burst.limits));
        self.metadata_clone.monitored =
            normalize_item_map(std::mem::take(&mut self.metadata_clone.monitored));
        for item in self.metadata_clone.monitored.values_mut() {
            blank_to_none(&mut item.action);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.to_rules_config()?;
        for (name, horizon) in [
            ("boundary_straddle.horizon_ms", self.boundary_straddle.horizon_ms),
            ("split_stack.window_ms", self.split_stack.window_ms),
            ("metadata_clone.horizon_ms", self.metadata_clone.horizon_ms),
            ("acquisition_burst.window_ms", self.acquisition_burst.window_ms),
        ] {
            if horizon <= 0 {
                return Err(anyhow!("rules.{} must be greater than 0", name));
            }
        }
        if self.quantity_inflation.default_stack_limit == 0 {
            return Err(anyhow!(
                "rules.quantity_inflation.default_stack_limit must be greater than 0"
            ));
        }
        if self.metadata_clone.min_copies < 2 {
            return Err(anyhow!("rules.metadata_clone.min_copies must be at least 2"));
        }
        for (item, watched) in &self.metadata_clone.monitored {
            if watched.min_copies.map(|copies| copies < 2).unwrap_or(false) {
                return Err(anyhow!(
                    "rules.metadata_clone.monitored.\"{}\".min_copies must be at least 2",
                    item
                ));
            }
        }
        Ok(())
    }

    pub fn to_rules_config(&self) -> Result<RulesConfig> {
        Ok(RulesConfig {
            boundary_straddle: BoundaryStraddleConfig {
                settings: rule_settings(
                    "boundary_straddle",
                    self.boundary_straddle.enabled,
                    &self.boundary_straddle.severity,
                    &self.boundary_straddle.action,
                )?,
                horizon_ms: self.boundary_straddle.horizon_ms,
            },
            split_stack: SplitStackConfig {
                settings: rule_settings(
                    "split_stack",
                    self.split_stack.enabled,
                    &self.split_stack.severity,
                    &self.split_stack.action,
                )?,
                window_ms: self.split_stack.window_ms,
            },
            quantity_inflation: QuantityInflationConfig {
                settings: rule_settings(
                    "quantity_inflation",
                    self.quantity_inflation.enabled,
                    &self.quantity_inflation.severity,
                    &self.quantity_inflation.action,
                )?,
                default_stack_limit: self.quantity_inflation.default_stack_limit,
                stack_limits: self.quantity_inflation.stack_limits.clone(),
                recipe_yields: self.quantity_inflation.recipe_yields.clone(),
            },
            metadata_clone: MetadataCloneConfig {
                settings: rule_settings(
                    "metadata_clone",
                    self.metadata_clone.enabled,
                    &self.metadata_clone.severity,
                    &self.metadata_clone.action,
                )?,
                min_copies: self.metadata_clone.min_copies,
                horizon_ms: self.metadata_clone.horizon_ms,
                monitored: self.monitored_items()?,
            },
            acquisition_burst: AcquisitionBurstConfig {
                settings: rule_settings(
                    "acquisition_burst",
                    self.acquisition_burst.enabled,
                    &self.acquisition_burst.severity,
                    &self.acquisition_burst.action,
                )?,
                window_ms: self.acquisition_burst.window_ms,
                limits: self.acquisition_burst.limits.clone(),
            },
        })
    }
}

impl RulesSection {
    fn monitored_items(&self) -> Result<BTreeMap<String, MonitoredItem>> {
        let mut out = BTreeMap::new();
        for (item, watched) in &self.metadata_clone.monitored {
            let label = format!("metadata_clone.monitored.\"{}\"", item);
            out.insert(
                item.clone(),
                MonitoredItem {
                    min_copies: watched.min_copies,
                    action: parse_action(&label, &watched.action)?,
                },
            );
        }
        Ok(out)
    }
}

fn rule_settings(
    rule: &str,
    enabled: bool,
    severity: &Option<String>,
    action: &Option<String>,
) -> Result<RuleSettings> {
    let severity = match severity {
        Some(value) => Some(
            Severity::parse(value)
                .ok_or_else(|| anyhow!("invalid severity '{}' for rules.{}", value, rule))?,
        ),
        None => None,
    };
    Ok(RuleSettings {
        enabled,
        severity,
        action: parse_action(rule, action)?,
    })
}

fn parse_action(rule: &str, action: &Option<String>) -> Result<Option<MitigationAction>> {
    match action {
        Some(value) => MitigationAction::parse(value)
            .map(Some)
            .ok_or_else(|| anyhow!("invalid action '{}' for rules.{}", value, rule)),
        None => Ok(None),
    }
}

fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        *value = None;
    }
}

fn normalize_item_map<V>(values: BTreeMap<String, V>) -> BTreeMap<String, V> {
    values
        .into_iter()
        .filter_map(|(item, value)| normalize_item_type(&item).map(|item| (item, value)))
        .collect()
}
