use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use dupeguard_domain::ExemptionRepository;

/// Exemptions stored as a pretty-printed JSON array of uuids or names.
pub struct ExemptionFileRepository {
    path: String,
}

impl ExemptionFileRepository {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ExemptionRepository for ExemptionFileRepository {
    async fn load_exemptions(&self) -> anyhow::Result<Vec<String>> {
        if !Path::new(&self.path).exists() {
            info!("no exemptions file at {}, starting with none", self.path);
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<String> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    async fn save_exemptions(&self, exemptions: &[String]) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(exemptions)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("dupeguard-{}-{}", uuid::Uuid::new_v4(), name))
            .to_string_lossy()
            .to_string()
    }

    #[tokio::test]
    async fn missing_file_means_no_exemptions() {
        let repo = ExemptionFileRepository::new(temp_path("missing.json"));
        assert!(repo.load_exemptions().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn saved_exemptions_load_back() {
        let path = temp_path("nested/exemptions.json");
        let repo = ExemptionFileRepository::new(path.clone());
        let entries = vec!["notch".to_string(), "069a79f444e94726a5befca90e38aaf5".to_string()];

        repo.save_exemptions(&entries).await.expect("save");
        let content = fs::read_to_string(&path).await.expect("read");
        assert!(content.contains('\n'));
        assert_eq!(repo.load_exemptions().await.expect("load"), entries);

        let _ = fs::remove_file(&path).await;
    }
}
