use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Connection settings for the local debugging endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Remote debugging port the Figma browser/desktop instance listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Discovery attempts before ensure-active gives up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay between discovery attempts, in milliseconds.
    #[serde(default = "default_connect_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,
}

fn default_port() -> u16 {
    9222
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_retry_delay_ms() -> u64 {
    1000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_attempts: default_connect_attempts(),
            connect_retry_delay_ms: default_connect_retry_delay_ms(),
        }
    }
}

/// Figma REST API settings (comment operations only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaConfig {
    /// Personal access token for the REST API. Falls back to FIGMA_API_TOKEN.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.figma.com/v1".to_string()
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub figma: FigmaConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("FIGBRIDGE_PORT") {
            if let Ok(port) = port.parse() {
                self.remote.port = port;
            }
        }
        if let Ok(token) = std::env::var("FIGMA_API_TOKEN") {
            if !token.trim().is_empty() {
                self.figma.api_token = Some(token);
            }
        }
    }

    /// The REST token, if configured anywhere.
    pub fn figma_api_token(&self) -> Option<String> {
        self.figma
            .api_token
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn figma_api_base(&self) -> String {
        self.figma.api_base.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.port, 9222);
        assert_eq!(cfg.remote.connect_attempts, 3);
        assert_eq!(cfg.remote.connect_retry_delay_ms, 1000);
        assert!(cfg.figma_api_token().is_none());
        assert_eq!(cfg.figma_api_base(), "https://api.figma.com/v1");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "remote": { "port": 9333 } }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.remote.port, 9333);
        assert_eq!(cfg.remote.connect_attempts, 3);
    }

    #[test]
    fn test_blank_token_is_none() {
        let raw = r#"{ "figma": { "apiToken": "   " } }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert!(cfg.figma_api_token().is_none());
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let raw = r#"{ "figma": { "apiBase": "https://api.figma.com/v1/" } }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.figma_api_base(), "https://api.figma.com/v1");
    }
}
