// Engine configuration
// Immutable runtime settings, built once by the configuration layer

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::{MitigationAction, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub retention_ms: i64,
    pub window_capacity: usize,
    pub idle_horizon_ms: i64,
    pub sweep_interval_ms: u64,
    pub shards: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_ms: 30_000,
            window_capacity: 256,
            idle_horizon_ms: 300_000,
            sweep_interval_ms: 5_000,
            shards: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertQueueConfig {
    pub queue_capacity: usize,
    pub batch_interval_ms: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub history_capacity: usize,
}

impl Default for AlertQueueConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            batch_interval_ms: 1_000,
            batch_size: 25,
            max_attempts: 5,
            backoff_base_ms: 200,
            backoff_max_ms: 5_000,
            history_capacity: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSettings {
    pub enabled: bool,
    pub severity: Option<Severity>,
    pub action: Option<MitigationAction>,
}

impl RuleSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            severity: None,
            action: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryStraddleConfig {
    pub settings: RuleSettings,
    pub horizon_ms: i64,
}

impl Default for BoundaryStraddleConfig {
    fn default() -> Self {
        Self {
            settings: RuleSettings::enabled(),
            horizon_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitStackConfig {
    pub settings: RuleSettings,
    pub window_ms: i64,
}

impl Default for SplitStackConfig {
    fn default() -> Self {
        Self {
            settings: RuleSettings::enabled(),
            window_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityInflationConfig {
    pub settings: RuleSettings,
    pub default_stack_limit: u32,
    pub stack_limits: BTreeMap<String, u32>,
    pub recipe_yields: BTreeMap<String, u32>,
}

impl Default for QuantityInflationConfig {
    fn default() -> Self {
        Self {
            settings: RuleSettings::enabled(),
            default_stack_limit: 64,
            stack_limits: BTreeMap::new(),
            recipe_yields: BTreeMap::new(),
        }
    }
}

/// Per-item override; unset fields fall back to the rule-wide values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItem {
    pub min_copies: Option<usize>,
    pub action: Option<MitigationAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCloneConfig {
    pub settings: RuleSettings,
    pub min_copies: usize,
    pub horizon_ms: i64,
    /// When non-empty only these item types are checked.
    pub monitored: BTreeMap<String, MonitoredItem>,
}

impl Default for MetadataCloneConfig {
    fn default() -> Self {
        Self {
            settings: RuleSettings::enabled(),
            min_copies: 3,
            horizon_ms: 30_000,
            monitored: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionBurstConfig {
    pub settings: RuleSettings,
    pub window_ms: i64,
    pub limits: BTreeMap<String, u64>,
}

impl Default for AcquisitionBurstConfig {
    fn default() -> Self {
        Self {
            settings: RuleSettings::enabled(),
            window_ms: 30_000,
            limits: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    pub boundary_straddle: BoundaryStraddleConfig,
    pub split_stack: SplitStackConfig,
    pub quantity_inflation: QuantityInflationConfig,
    pub metadata_clone: MetadataCloneConfig,
    pub acquisition_burst: AcquisitionBurstConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
    pub rules: RulesConfig,
    pub alerts: AlertQueueConfig,
    pub worker_shards: usize,
    pub ingest_queue_capacity: usize,
    pub dispatch_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    pub verdict_key_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            rules: RulesConfig::default(),
            alerts: AlertQueueConfig::default(),
            worker_shards: 4,
            ingest_queue_capacity: 65_536,
            dispatch_timeout_ms: 50,
            shutdown_grace_ms: 2_000,
            verdict_key_capacity: 100_000,
        }
    }
}

impl EngineConfig {
    pub fn max_rule_horizon_ms(&self) -> i64 {
        [
            self.rules.boundary_straddle.horizon_ms,
            self.rules.split_stack.window_ms,
            self.rules.metadata_clone.horizon_ms,
            self.rules.acquisition_burst.window_ms,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// How long a dispatched verdict key or an active verdict stays relevant.
    pub fn verdict_ttl_ms(&self) -> i64 {
        self.ledger.retention_ms + self.max_rule_horizon_ms()
    }
}
