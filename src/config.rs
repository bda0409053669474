// Runtime configuration, read from the process environment (after `.env` is loaded)
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GROK_BASE_URL: &str = "https://api.x.ai/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub google_api_key: Option<String>,
    pub grok_api_key: Option<String>,
    pub gemini_base_url: String,
    pub grok_base_url: String,
    /// Model behind every LLM agent and the Instagram copywriter
    pub agent_model: String,
    pub grok_model: String,
    pub image_model: String,
    pub video_model: String,
    pub veo_poll_interval: Duration,
    pub veo_max_wait: Duration,
    pub http_timeout: Duration,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8080)?,
            google_api_key: get("GOOGLE_API_KEY"),
            grok_api_key: get("GROK_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            grok_base_url: get("GROK_BASE_URL").unwrap_or_else(|| DEFAULT_GROK_BASE_URL.to_string()),
            agent_model: get("AGENT_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            grok_model: get("GROK_MODEL").unwrap_or_else(|| "grok-3-latest".to_string()),
            image_model: get("IMAGE_MODEL").unwrap_or_else(|| "imagen-3.0-generate-002".to_string()),
            video_model: get("VIDEO_MODEL").unwrap_or_else(|| "veo-2.0-generate-001".to_string()),
            veo_poll_interval: Duration::from_secs(parse_or(
                get("VEO_POLL_INTERVAL_SECS"),
                "VEO_POLL_INTERVAL_SECS",
                20,
            )?),
            veo_max_wait: Duration::from_secs(parse_or(get("VEO_MAX_WAIT_SECS"), "VEO_MAX_WAIT_SECS", 300)?),
            http_timeout: Duration::from_secs(parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 120)?),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "static".to_string())),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.google_api_key.is_none());
        assert_eq!(config.video_model, "veo-2.0-generate-001");
        assert_eq!(config.veo_poll_interval, Duration::from_secs(20));
        assert_eq!(config.veo_max_wait, Duration::from_secs(300));
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = AppConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "  "), ("GROK_API_KEY", "xai-123")])).unwrap();
        assert!(config.google_api_key.is_none());
        assert_eq!(config.grok_api_key.as_deref(), Some("xai-123"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: 'eighty'");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("VEO_MAX_WAIT_SECS", "60"),
            ("AGENT_MODEL", "gemini-2.5-flash"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.veo_max_wait, Duration::from_secs(60));
        assert_eq!(config.agent_model, "gemini-2.5-flash");
    }
}
