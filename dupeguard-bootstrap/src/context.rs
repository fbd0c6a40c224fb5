use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use dupeguard_application::{DetectionEngine, EngineDeps, EngineHandle};
use dupeguard_domain::{AlertTransport, ExemptionRepository, ItemLimitRepository, SystemClock};
use dupeguard_infrastructure::{
    AlertsSection, AppConfig, ExemptionFileRepository, ItemLimitFileRepository,
    LogAlertTransport, LogOnlyHost, WebhookSettings, WebhookTransport,
};

pub struct AppContext {
    pub config: AppConfig,
    pub engine: EngineHandle,
}

impl AppContext {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let mut engine_config = config.to_engine_config()?;
        if let Some(path) = &config.item_limits_path {
            let limits = ItemLimitFileRepository::new().load_item_limits(path).await?;
            info!("loaded {} item limits from {}", limits.len(), path);
            engine_config.rules.apply_item_limits(&limits);
        }

        let exemption_repo = Arc::new(ExemptionFileRepository::new(config.exemptions_path.clone()));
        let exemptions = exemption_repo.load_exemptions().await?;
        info!("loaded {} exemptions from {}", exemptions.len(), exemption_repo.path());

        let transport = build_transport(&config.alerts)?;
        let engine = DetectionEngine::start(
            engine_config,
            EngineDeps {
                host: Arc::new(LogOnlyHost),
                transport,
                exemption_repo,
                clock: Arc::new(SystemClock),
            },
            exemptions,
        );

        Ok(Self { config, engine })
    }
}

pub fn build_transport(alerts: &AlertsSection) -> Result<Arc<dyn AlertTransport>> {
    match WebhookSettings::from_alerts(alerts) {
        Some(settings) => {
            info!("alerts go to webhook ({:?} payloads)", settings.format);
            Ok(Arc::new(WebhookTransport::new(settings)?))
        }
        None => {
            if alerts.enabled {
                warn!("alerts.webhook_url is not configured, alerts will only be logged");
            } else {
                info!("alerts disabled, alerts will only be logged");
            }
            Ok(Arc::new(LogAlertTransport))
        }
    }
}
