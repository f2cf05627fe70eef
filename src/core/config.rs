use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub user_agent: String,
    /// Minimum spacing between request-issuing operations. Zero disables it.
    pub minimum_timeout_ms: u64,
    /// Referrer sent with the very first request. Empty sends none.
    pub initial_referrer: String,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("browser-intent/{}", env!("CARGO_PKG_VERSION")),
            minimum_timeout_ms: 1000,
            initial_referrer: "https://www.google.com".to_string(),
            follow_redirects: true,
            max_redirects: 20,
        }
    }
}

impl BrowserConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn minimum_timeout(&self) -> Duration {
        Duration::from_millis(self.minimum_timeout_ms)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_minimum_timeout(mut self, timeout: Duration) -> Self {
        self.minimum_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: BrowserConfig =
            serde_json::from_str(r#"{ "user_agent": "probe/2", "minimum_timeout_ms": 0 }"#)
                .unwrap();
        assert_eq!(config.user_agent, "probe/2");
        assert_eq!(config.minimum_timeout(), Duration::ZERO);
        assert!(config.follow_redirects);
        assert_eq!(config.max_redirects, 20);
        assert_eq!(config.initial_referrer, "https://www.google.com");
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir()
            .join(format!("browser-intent-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "max_redirects": 3 }"#).unwrap();
        let config = BrowserConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.minimum_timeout_ms, 1000);
    }

    #[test]
    fn oversized_timeout_saturates() {
        let config = BrowserConfig::default().with_minimum_timeout(Duration::MAX);
        assert_eq!(config.minimum_timeout_ms, u64::MAX);
        let config = BrowserConfig::default().with_minimum_timeout(Duration::from_millis(250));
        assert_eq!(config.minimum_timeout_ms, 250);
    }
}
