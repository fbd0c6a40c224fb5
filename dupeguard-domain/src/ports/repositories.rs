use async_trait::async_trait;

use crate::entities::ItemLimitRule;

#[async_trait]
pub trait ExemptionRepository: Send + Sync {
    async fn load_exemptions(&self) -> anyhow::Result<Vec<String>>;
    async fn save_exemptions(&self, exemptions: &[String]) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ItemLimitRepository: Send + Sync {
    async fn load_item_limits(&self, path: &str) -> anyhow::Result<Vec<ItemLimitRule>>;
}
