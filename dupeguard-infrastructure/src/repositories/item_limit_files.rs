use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use dupeguard_domain::{ItemLimitRepository, ItemLimitRule};

use crate::config::validate_item_id;

/// Per-item limits from a YAML list, keyed by namespaced item id.
#[derive(Default)]
pub struct ItemLimitFileRepository;

impl ItemLimitFileRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ItemLimitRepository for ItemLimitFileRepository {
    async fn load_item_limits(&self, path: &str) -> anyhow::Result<Vec<ItemLimitRule>> {
        if !Path::new(path).exists() {
            warn!("item limits file {} not found, using inline limits only", path);
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rules: Vec<ItemLimitRule> = serde_yaml::from_str(&content)?;
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            let normalized = rule.normalized();
            if let Err(err) = validate_item_id(&normalized.item_id) {
                warn!("skipping item limit '{}': {}", rule.item_id, err);
                continue;
            }
            if normalized.stack_limit.is_none()
                && normalized.recipe_yield.is_none()
                && normalized.burst_limit.is_none()
                && normalized.clone_min_copies.is_none()
                && normalized.clone_action.is_none()
            {
                warn!("item limit '{}' sets no limits, skipping", normalized.item_id);
                continue;
            }
            out.push(normalized);
        }
        out.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(out)
    }
}
