use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::badge::{DEFAULT_BADGE_COLOR, DEFAULT_NOTIFY_PORT};
use crate::browser::DEFAULT_CDP_ENDPOINT;
use crate::error::{CartToolsError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub badge: BadgeConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// DevTools endpoint: port, host:port, http:// or ws:// URL
    #[serde(default = "default_cdp_endpoint")]
    pub cdp_endpoint: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_endpoint: default_cdp_endpoint(),
        }
    }
}

fn default_cdp_endpoint() -> String {
    DEFAULT_CDP_ENDPOINT.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Upper bound for a single page operation
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeConfig {
    #[serde(default = "default_badge_color")]
    pub color: String,

    /// How often the watcher polls the active tab
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Loopback port for `updateBadge` notifications
    #[serde(default = "default_notify_port")]
    pub notify_port: u16,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            color: default_badge_color(),
            poll_interval_ms: default_poll_interval_ms(),
            notify_port: default_notify_port(),
        }
    }
}

fn default_badge_color() -> String {
    DEFAULT_BADGE_COLOR.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_notify_port() -> u16 {
    DEFAULT_NOTIFY_PORT
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Form shown by the feedback action
    pub url: Option<String>,
}

pub const KEYS: &[&str] = &[
    "browser.cdp_endpoint",
    "request.timeout_ms",
    "badge.color",
    "badge.poll_interval_ms",
    "badge.notify_port",
    "feedback.url",
];

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // CART_TOOLS_REQUEST__TIMEOUT_MS=5000
            .merge(Env::prefixed("CART_TOOLS_").split("__"))
            .extract()
            .map_err(|e| CartToolsError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cart-tools")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CartToolsError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.request.timeout_ms == 0 {
            return Err(CartToolsError::ConfigError(
                "request.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.badge.poll_interval_ms == 0 {
            return Err(CartToolsError::ConfigError(
                "badge.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.badge.poll_interval_ms)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "browser.cdp_endpoint" => Some(self.browser.cdp_endpoint.clone()),
            "request.timeout_ms" => Some(self.request.timeout_ms.to_string()),
            "badge.color" => Some(self.badge.color.clone()),
            "badge.poll_interval_ms" => Some(self.badge.poll_interval_ms.to_string()),
            "badge.notify_port" => Some(self.badge.notify_port.to_string()),
            "feedback.url" => self.feedback.url.clone(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "browser.cdp_endpoint" => self.browser.cdp_endpoint = value.trim().to_string(),
            "request.timeout_ms" => self.request.timeout_ms = parse_number(key, value)?,
            "badge.color" => self.badge.color = value.to_string(),
            "badge.poll_interval_ms" => self.badge.poll_interval_ms = parse_number(key, value)?,
            "badge.notify_port" => self.badge.notify_port = parse_number(key, value)?,
            "feedback.url" => {
                self.feedback.url = if value.trim().is_empty() {
                    None
                } else {
                    url::Url::parse(value).map_err(|e| {
                        CartToolsError::ConfigError(format!("feedback.url is not a URL: {}", e))
                    })?;
                    Some(value.to_string())
                }
            }
            _ => return Err(unknown_key(key)),
        }
        self.validate()
    }
}

fn unknown_key(key: &str) -> CartToolsError {
    CartToolsError::ConfigError(format!(
        "Unknown config key: {} (known: {})",
        key,
        KEYS.join(", ")
    ))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CartToolsError::ConfigError(format!("{} must be a number", key)))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.browser.cdp_endpoint, "http://127.0.0.1:9222");
        assert_eq!(config.request.timeout_ms, 10_000);
        assert_eq!(config.badge.color, "#4CAF50");
        assert_eq!(config.badge.poll_interval_ms, 1_000);
        assert_eq!(config.badge.notify_port, 19233);
        assert!(config.feedback.url.is_none());
    }

    #[test]
    fn every_key_can_be_read() {
        let config = Config::default();
        for key in KEYS {
            assert!(config.get(key).is_ok(), "{}", key);
        }
        assert!(config.get("api.api_key").is_err());
    }

    #[test]
    fn set_parses_and_validates() {
        let mut config = Config::default();
        config.set("request.timeout_ms", "2500").unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));

        assert!(matches!(
            config.set("request.timeout_ms", "soon"),
            Err(CartToolsError::ConfigError(_))
        ));
        assert!(config.set("request.timeout_ms", "0").is_err());
        assert!(config.set("badge.notify_port", "70000").is_err());
        assert!(config.set("feedback.url", "not a url").is_err());

        config.set("feedback.url", "https://forms.example.com/f").unwrap();
        assert_eq!(
            config.get("feedback.url").unwrap().as_deref(),
            Some("https://forms.example.com/f")
        );
        config.set("feedback.url", "").unwrap();
        assert!(config.feedback.url.is_none());
    }

    #[test]
    #[serial]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[request]\ntimeout_ms = 3000\n\n[feedback]\nurl = \"https://forms.example.com/f\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.request.timeout_ms, 3000);
        assert_eq!(config.badge.color, "#4CAF50");
        assert_eq!(config.feedback.url.as_deref(), Some("https://forms.example.com/f"));
    }

    #[test]
    #[serial]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("badge.color", "#FF0000").unwrap();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[request]\ntimeout_ms = 3000\n").unwrap();

        std::env::set_var("CART_TOOLS_REQUEST__TIMEOUT_MS", "4500");
        let config = Config::load_from(&path);
        std::env::remove_var("CART_TOOLS_REQUEST__TIMEOUT_MS");

        assert_eq!(config.unwrap().request.timeout_ms, 4500);
    }
}
