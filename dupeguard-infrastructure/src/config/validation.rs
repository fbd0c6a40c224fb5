use anyhow::{anyhow, Result};

pub fn validate_item_id(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("item id is empty"));
    }
    if !value.contains(':') {
        return Err(anyhow!("item id must be namespace:path"));
    }
    Ok(())
}

pub fn validate_webhook_url(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(anyhow!("webhook url must start with http:// or https://"));
    }
    if trimmed.contains(char::is_whitespace) {
        return Err(anyhow!("webhook url must not contain whitespace"));
    }
    Ok(())
}

pub fn validate_positive(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{} must be greater than 0", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_urls_need_an_http_scheme() {
        assert!(validate_webhook_url("https://discord.com/api/webhooks/1/abc").is_ok());
        assert!(validate_webhook_url("ftp://example.com").is_err());
        assert!(validate_webhook_url("https://example.com/a b").is_err());
    }

    #[test]
    fn item_ids_need_a_namespace() {
        assert!(validate_item_id("minecraft:diamond").is_ok());
        assert!(validate_item_id("diamond").is_err());
        assert!(validate_item_id("  ").is_err());
    }
}
