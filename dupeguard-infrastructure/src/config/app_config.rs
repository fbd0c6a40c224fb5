use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use dupeguard_domain::{AlertQueueConfig, EngineConfig, LedgerConfig};

use crate::config::sections::{
    AlertsSection, EngineSection, HttpSection, LoggingSection, RulesSection,
};
use crate::config::validation::{validate_positive, validate_webhook_url};

pub const CONFIG_ENV: &str = "DUPEGUARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./dupeguard.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub exemptions_path: String,
    pub item_limits_path: Option<String>,
    pub ledger: LedgerConfig,
    pub engine: EngineSection,
    pub alerts: AlertsSection,
    pub rules: RulesSection,
    pub http: HttpSection,
    pub logging: LoggingSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exemptions_path: "./exemptions.json".to_string(),
            item_limits_path: None,
            ledger: LedgerConfig::default(),
            engine: EngineSection::default(),
            alerts: AlertsSection::default(),
            rules: RulesSection::default(),
            http: HttpSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl AppConfig {
    /// Loads from `DUPEGUARD_CONFIG`, falling back to `./dupeguard.toml`.
    pub async fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str::<AppConfig>(&content)
                .map_err(|err| anyhow!("invalid config {}: {}", path, err))?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        if self.exemptions_path.trim().is_empty() {
            self.exemptions_path = "./exemptions.json".to_string();
        }
        blank_to_none(&mut self.item_limits_path);
        blank_to_none(&mut self.alerts.webhook_url);
        blank_to_none(&mut self.alerts.avatar_url);
        blank_to_none(&mut self.alerts.signing_secret);
        blank_to_none(&mut self.logging.directory);
        self.alerts.format = self.alerts.format.trim().to_lowercase();
        if self.alerts.username.trim().is_empty() {
            self.alerts.username = AlertsSection::default().username;
        }
        if self.logging.level.trim().is_empty() {
            self.logging.level = "info".to_string();
        }
        self.rules.normalize();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.exemptions_path = resolve_path(base, &self.exemptions_path);
        if let Some(path) = &self.item_limits_path {
            self.item_limits_path = Some(resolve_path(base, path));
        }
        if let Some(directory) = &self.logging.directory {
            self.logging.directory = Some(resolve_path(base, directory));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ledger.retention_ms <= 0 {
            return Err(anyhow!("ledger.retention_ms must be greater than 0"));
        }
        if self.ledger.idle_horizon_ms <= 0 {
            return Err(anyhow!("ledger.idle_horizon_ms must be greater than 0"));
        }
        validate_positive("ledger.window_capacity", self.ledger.window_capacity as u64)?;
        validate_positive("ledger.sweep_interval_ms", self.ledger.sweep_interval_ms)?;
        validate_positive("ledger.shards", self.ledger.shards as u64)?;
        validate_positive("engine.worker_shards", self.engine.worker_shards as u64)?;
        validate_positive(
            "engine.ingest_queue_capacity",
            self.engine.ingest_queue_capacity as u64,
        )?;
        validate_positive("engine.dispatch_timeout_ms", self.engine.dispatch_timeout_ms)?;
        validate_positive(
            "engine.verdict_key_capacity",
            self.engine.verdict_key_capacity as u64,
        )?;
        validate_positive("alerts.batch_interval_ms", self.alerts.batch_interval_ms)?;
        validate_positive("alerts.batch_size", self.alerts.batch_size as u64)?;
        validate_positive("alerts.queue_capacity", self.alerts.queue_capacity as u64)?;
        validate_positive("alerts.max_attempts", u64::from(self.alerts.max_attempts))?;
        validate_positive("alerts.request_timeout_ms", self.alerts.request_timeout_ms)?;
        if self.alerts.backoff_max_ms < self.alerts.backoff_base_ms {
            return Err(anyhow!("alerts.backoff_max_ms must not be below alerts.backoff_base_ms"));
        }
        if self.alerts.format != "json" && self.alerts.format != "discord" {
            return Err(anyhow!(
                "invalid alerts.format '{}', expected json or discord",
                self.alerts.format
            ));
        }
        if let Some(url) = self.alerts.webhook_target() {
            validate_webhook_url(url).map_err(|err| anyhow!("alerts.webhook_url: {}", err))?;
        }
        if self.http.enabled {
            self.http
                .bind
                .parse::<std::net::SocketAddr>()
                .map_err(|err| anyhow!("invalid http.bind: {}", err))?;
        }
        self.rules.validate()
    }

    pub fn to_engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            ledger: self.ledger.clone(),
            rules: self.rules.to_rules_config()?,
            alerts: AlertQueueConfig {
                queue_capacity: self.alerts.queue_capacity,
                batch_interval_ms: self.alerts.batch_interval_ms,
                batch_size: self.alerts.batch_size,
                max_attempts: self.alerts.max_attempts,
                backoff_base_ms: self.alerts.backoff_base_ms,
                backoff_max_ms: self.alerts.backoff_max_ms,
                history_capacity: self.alerts.history_capacity.max(1),
            },
            worker_shards: self.engine.worker_shards,
            ingest_queue_capacity: self.engine.ingest_queue_capacity,
            dispatch_timeout_ms: self.engine.dispatch_timeout_ms,
            shutdown_grace_ms: self.engine.shutdown_grace_ms,
            verdict_key_capacity: self.engine.verdict_key_capacity,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("DUPEGUARD_EXEMPTIONS_PATH") {
            self.exemptions_path = value;
        }
        if let Ok(value) = env::var("DUPEGUARD_ITEM_LIMITS_PATH") {
            self.item_limits_path = Some(value);
        }
        if let Ok(value) = env::var("DUPEGUARD_RETENTION_MS") {
            self.ledger.retention_ms = value.parse().unwrap_or(self.ledger.retention_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_WINDOW_CAPACITY") {
            self.ledger.window_capacity = value.parse().unwrap_or(self.ledger.window_capacity);
        }
        if let Ok(value) = env::var("DUPEGUARD_IDLE_HORIZON_MS") {
            self.ledger.idle_horizon_ms = value.parse().unwrap_or(self.ledger.idle_horizon_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_SWEEP_INTERVAL_MS") {
            self.ledger.sweep_interval_ms =
                value.parse().unwrap_or(self.ledger.sweep_interval_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_WORKER_SHARDS") {
            self.engine.worker_shards = value.parse().unwrap_or(self.engine.worker_shards);
        }
        if let Ok(value) = env::var("DUPEGUARD_INGEST_QUEUE_CAPACITY") {
            self.engine.ingest_queue_capacity =
                value.parse().unwrap_or(self.engine.ingest_queue_capacity);
        }
        if let Ok(value) = env::var("DUPEGUARD_DISPATCH_TIMEOUT_MS") {
            self.engine.dispatch_timeout_ms =
                value.parse().unwrap_or(self.engine.dispatch_timeout_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_SHUTDOWN_GRACE_MS") {
            self.engine.shutdown_grace_ms = value.parse().unwrap_or(self.engine.shutdown_grace_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_ALERTS_ENABLED") {
            self.alerts.enabled = value.parse().unwrap_or(self.alerts.enabled);
        }
        if let Ok(value) = env::var("DUPEGUARD_WEBHOOK_URL") {
            self.alerts.webhook_url = Some(value);
        }
        if let Ok(value) = env::var("DUPEGUARD_ALERT_FORMAT") {
            self.alerts.format = value;
        }
        if let Ok(value) = env::var("DUPEGUARD_ALERT_SIGNING_SECRET") {
            self.alerts.signing_secret = Some(value);
        }
        if let Ok(value) = env::var("DUPEGUARD_ALERT_BATCH_INTERVAL_MS") {
            self.alerts.batch_interval_ms = value.parse().unwrap_or(self.alerts.batch_interval_ms);
        }
        if let Ok(value) = env::var("DUPEGUARD_ALERT_QUEUE_CAPACITY") {
            self.alerts.queue_capacity = value.parse().unwrap_or(self.alerts.queue_capacity);
        }
        if let Ok(value) = env::var("DUPEGUARD_HTTP_ENABLED") {
            self.http.enabled = value.parse().unwrap_or(self.http.enabled);
        }
        if let Ok(value) = env::var("DUPEGUARD_HTTP_BIND") {
            self.http.bind = value;
        }
        if let Ok(value) = env::var("DUPEGUARD_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Ok(value) = env::var("DUPEGUARD_LOG_DIR") {
            self.logging.directory = Some(value);
        }
    }
}

fn blank_to_none(value: &mut Option<String>) {
    if let Some(inner) = value {
        if inner.trim().is_empty() {
            *value = None;
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupeguard_domain::{MitigationAction, MonitoredItem, Severity};

    fn parse(content: &str) -> AppConfig {
        let mut config: AppConfig = toml::from_str(content).expect("parse config");
        config.normalize();
        config
    }

    #[test]
    fn defaults_match_the_engine_defaults() {
        let mut config = AppConfig::default();
        config.normalize();
        config.validate().expect("defaults are valid");
        let engine = config.to_engine_config().expect("engine config");
        let expected = EngineConfig::default();
        assert_eq!(engine.ledger.retention_ms, expected.ledger.retention_ms);
        assert_eq!(engine.ledger.window_capacity, expected.ledger.window_capacity);
        assert_eq!(engine.alerts.queue_capacity, expected.alerts.queue_capacity);
        assert_eq!(engine.dispatch_timeout_ms, expected.dispatch_timeout_ms);
        assert_eq!(engine.rules.split_stack.window_ms, 250);
        assert_eq!(config.exemptions_path, "./exemptions.json");
    }

    #[test]
    fn rule_overrides_accept_aliases() {
        let config = parse(
            r#"
            [rules.split_stack]
            severity = "medium"
            action = "warn"
            window_ms = 400

            [rules.quantity_inflation.stack_limits]
            ENDER_PEARL = 16
            "#,
        );
        config.validate().expect("valid overrides");
        let rules = config.to_engine_config().expect("engine config").rules;
        assert_eq!(rules.split_stack.settings.severity, Some(Severity::MEDIUM));
        assert_eq!(rules.split_stack.settings.action, Some(MitigationAction::LogOnly));
        assert_eq!(rules.split_stack.window_ms, 400);
        assert_eq!(
            rules.quantity_inflation.stack_limits.get("minecraft:ender_pearl"),
            Some(&16)
        );
    }

    #[test]
    fn monitored_clone_items_carry_their_own_settings() {
        let config = parse(
            r#"
            [rules.metadata_clone]
            min_copies = 4

            [rules.metadata_clone.monitored.DIAMOND_SWORD]
            min_copies = 2
            action = "remove-excess"

            [rules.metadata_clone.monitored."minecraft:elytra"]
            "#,
        );
        config.validate().expect("valid watch list");
        let clone = config.to_engine_config().expect("engine config").rules.metadata_clone;
        assert_eq!(clone.min_copies, 4);
        assert_eq!(
            clone.monitored.get("minecraft:diamond_sword"),
            Some(&MonitoredItem {
                min_copies: Some(2),
                action: Some(MitigationAction::RemoveItems),
            })
        );
        assert_eq!(
            clone.monitored.get("minecraft:elytra"),
            Some(&MonitoredItem::default())
        );

        let config = parse(
            r#"
            [rules.metadata_clone.monitored.elytra]
            min_copies = 1
            "#,
        );
        assert!(config.validate().is_err());

        let config = parse(
            r#"
            [rules.metadata_clone.monitored.elytra]
            action = "explode"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let config = parse(
            r#"
            [rules.boundary_straddle]
            action = "explode"
            "#,
        );
        assert!(config.validate().is_err());

        let config = parse(
            r#"
            [ledger]
            window_capacity = 0
            "#,
        );
        assert!(config.validate().is_err());

        let config = parse(
            r#"
            [alerts]
            format = "xml"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn placeholder_webhooks_count_as_unset() {
        let config = parse(
            r#"
            [alerts]
            webhook_url = "https://discord.com/api/webhooks/YOUR_WEBHOOK"
            format = "Discord"
            "#,
        );
        config.validate().expect("placeholder is not validated");
        assert_eq!(config.alerts.format, "discord");
        assert!(config.alerts.webhook_target().is_none());
    }

    #[test]
    fn relative_paths_resolve_against_the_config_dir() {
        let mut config = parse(
            r#"
            exemptions_path = "data/exemptions.json"
            item_limits_path = "/etc/dupeguard/item_limits.yaml"
            "#,
        );
        config.resolve_paths(Some(Path::new("/srv/dupeguard")));
        assert_eq!(config.exemptions_path, "/srv/dupeguard/data/exemptions.json");
        assert_eq!(
            config.item_limits_path.as_deref(),
            Some("/etc/dupeguard/item_limits.yaml")
        );
    }
}
