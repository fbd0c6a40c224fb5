use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;

use dupeguard_domain::{
    to_hex, AlertEntry, AlertEnvelope, AlertTransport, Severity, SinkTransportError,
};

use crate::config::AlertsSection;

pub const SIGNATURE_HEADER: &str = "X-DupeGuard-Signature";
const MAX_DISCORD_EMBEDS: usize = 10;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Discord,
}

impl PayloadFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(PayloadFormat::Json),
            "discord" => Some(PayloadFormat::Discord),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub format: PayloadFormat,
    pub username: String,
    pub avatar_url: Option<String>,
    pub mention_everyone: bool,
    pub signing_secret: Option<String>,
    pub request_timeout: Duration,
}

impl WebhookSettings {
    /// None when alerts are disabled or the webhook is still a placeholder.
    pub fn from_alerts(section: &AlertsSection) -> Option<Self> {
        let url = section.webhook_target()?;
        Some(Self {
            url: url.trim().to_string(),
            format: PayloadFormat::parse(&section.format).unwrap_or(PayloadFormat::Json),
            username: section.username.clone(),
            avatar_url: section.avatar_url.clone(),
            mention_everyone: section.mention_everyone,
            signing_secret: section.signing_secret.clone(),
            request_timeout: Duration::from_millis(section.request_timeout_ms.max(1)),
        })
    }
}

pub struct WebhookTransport {
    client: Client,
    settings: WebhookSettings,
}

impl WebhookTransport {
    pub fn new(settings: WebhookSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &WebhookSettings {
        &self.settings
    }

    pub fn build_payload(&self, envelope: &AlertEnvelope) -> Result<String, SinkTransportError> {
        let payload = match self.settings.format {
            PayloadFormat::Json => serde_json::to_value(envelope)
                .map_err(|err| SinkTransportError::Encoding(err.to_string()))?,
            PayloadFormat::Discord => discord_payload(&self.settings, envelope),
        };
        serde_json::to_string(&payload).map_err(|err| SinkTransportError::Encoding(err.to_string()))
    }
}

#[async_trait]
impl AlertTransport for WebhookTransport {
    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), SinkTransportError> {
        let payload = self.build_payload(envelope)?;
        let mut request = self
            .client
            .post(&self.settings.url)
            .header("Content-Type", "application/json");
        if let Some(secret) = &self.settings.signing_secret {
            request = request.header(SIGNATURE_HEADER, format!("sha256={}", sign(secret, &payload)?));
        }
        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|err| SinkTransportError::Transport(err.to_string()))?;
        let status = response.status();
        // Discord answers 204
        if !status.is_success() {
            return Err(SinkTransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

pub fn sign(secret: &str, payload: &str) -> Result<String, SinkTransportError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| SinkTransportError::Encoding(err.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(to_hex(&mac.finalize().into_bytes()))
}

fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::HIGH => 0xFF0000,
        Severity::MEDIUM => 0xFF4500,
        Severity::LOW => 0xFFBF00,
    }
}

fn discord_embed(alert: &AlertEntry) -> Value {
    json!({
        "title": format!("Dupe detection: {}", alert.rule_name),
        "description": alert.summary,
        "color": severity_color(alert.severity),
        "timestamp": alert.timestamp,
        "fields": [
            { "name": "Player", "value": format!("`{}`", alert.actor_id), "inline": true },
            { "name": "Severity", "value": alert.severity.as_str(), "inline": true },
            { "name": "Evidence", "value": format!("{} transactions", alert.evidence_count), "inline": true },
        ],
        "footer": { "text": format!("DupeGuard v{}", env!("CARGO_PKG_VERSION")) },
    })
}

fn discord_payload(settings: &WebhookSettings, envelope: &AlertEnvelope) -> Value {
    let embeds: Vec<Value> = envelope
        .alerts
        .iter()
        .take(MAX_DISCORD_EMBEDS)
        .map(discord_embed)
        .collect();
    let mut payload = json!({
        "username": settings.username,
        "embeds": embeds,
    });

    let mut content = Vec::new();
    if settings.mention_everyone {
        content.push("@everyone".to_string());
    }
    if envelope.alerts.len() > MAX_DISCORD_EMBEDS {
        content.push(format!(
            "{} more alerts in this batch",
            envelope.alerts.len() - MAX_DISCORD_EMBEDS
        ));
    }
    if !content.is_empty() {
        payload["content"] = json!(content.join(" "));
    }
    if let Some(avatar_url) = &settings.avatar_url {
        payload["avatar_url"] = json!(avatar_url);
    }
    payload
}
