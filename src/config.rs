//! Configuration management for pindrift
//!
//! This module provides a configuration system that loads settings from
//! environment variables with sensible defaults. Configuration covers the AI
//! gateway, GitHub endpoints, OSV lookup, storage, the HTTP server, and
//! logging.
//!
//! # Environment Variables
//!
//! ## AI gateway
//! - `PINDRIFT_AI_ENDPOINT`: OpenAI-compatible base URL - default: "http://localhost:11434"
//! - `PINDRIFT_AI_MODEL`: model identifier - default: "qwen2.5-coder:7b"
//! - `PINDRIFT_AI_API_KEY`: bearer token - **required for scans**
//! - `PINDRIFT_AI_TIMEOUT_SECS`: request timeout in seconds - default: "120"
//!
//! ## GitHub
//! - `PINDRIFT_GITHUB_API_URL`: API base - default: "https://api.github.com"
//! - `PINDRIFT_GITHUB_RAW_URL`: raw content base - default: "https://raw.githubusercontent.com"
//!
//! ## Vulnerability lookup
//! - `PINDRIFT_OSV_URL`: OSV base URL - default: "https://api.osv.dev"
//! - `PINDRIFT_OSV_ENABLED`: enable lookup (true|false) - default: "true"
//!
//! ## Storage
//! - `PINDRIFT_DB_URL`: SurrealDB endpoint (mem://, surrealkv://path, ws://host) -
//!   default: surrealkv under the platform data directory
//! - `PINDRIFT_CACHE_TTL_HOURS`: analysis cache TTL - default: "24"
//!
//! ## Server / CLI
//! - `PINDRIFT_BIND_ADDR`: server bind address - default: "127.0.0.1:8787"
//! - `PINDRIFT_PUBLIC_URL`: base for share links when no Origin header is present
//! - `PINDRIFT_API_URL`: backend base the CLI talks to - default: "http://127.0.0.1:8787"
//! - `PINDRIFT_LOG_LEVEL`: trace|debug|info|warn|error - default: "info"

use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_AI_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_AI_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";
const DEFAULT_OSV_URL: &str = "https://api.osv.dev";
const DEFAULT_CACHE_TTL_HOURS: i64 = 24;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// API key required but absent
    #[error("PINDRIFT_AI_API_KEY not configured")]
    MissingApiKey,

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for pindrift
///
/// Constructed with `Config::from_env()` (or `Default::default()`, which is
/// the same thing) reading `PINDRIFT_*` environment variables with fallback
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI-compatible chat-completions base URL
    pub ai_endpoint: String,

    /// Model identifier sent with every completion request
    pub ai_model: String,

    /// Bearer token for the AI gateway; absence is only an error once an
    /// analysis actually needs the gateway
    pub ai_api_key: Option<String>,

    /// AI request timeout in seconds
    pub ai_timeout_secs: u64,

    /// GitHub REST API base URL
    pub github_api_url: String,

    /// GitHub raw content base URL
    pub github_raw_url: String,

    /// OSV.dev base URL
    pub osv_url: String,

    /// Whether vulnerability lookup runs as part of a scan
    pub osv_enabled: bool,

    /// SurrealDB endpoint; None means the local surrealkv default
    pub db_url: Option<String>,

    /// Analysis cache TTL in hours
    pub cache_ttl_hours: i64,

    /// HTTP server bind address
    pub bind_addr: String,

    /// Base URL used for share links when the request carries no Origin
    pub public_url: Option<String>,

    /// Backend base URL the CLI posts to
    pub api_url: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Config {
    /// Loads configuration from `PINDRIFT_*` environment variables with
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let ai_endpoint = env::var("PINDRIFT_AI_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_AI_ENDPOINT.to_string());
        let ai_model =
            env::var("PINDRIFT_AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string());
        let ai_api_key = env::var("PINDRIFT_AI_API_KEY").ok().filter(|k| !k.is_empty());
        let ai_timeout_secs = env::var("PINDRIFT_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_AI_TIMEOUT_SECS);

        let github_api_url = env::var("PINDRIFT_GITHUB_API_URL")
            .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string());
        let github_raw_url = env::var("PINDRIFT_GITHUB_RAW_URL")
            .unwrap_or_else(|_| DEFAULT_GITHUB_RAW_URL.to_string());

        let osv_url = env::var("PINDRIFT_OSV_URL").unwrap_or_else(|_| DEFAULT_OSV_URL.to_string());
        let osv_enabled = env::var("PINDRIFT_OSV_ENABLED")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let db_url = env::var("PINDRIFT_DB_URL").ok().filter(|u| !u.is_empty());
        let cache_ttl_hours = env::var("PINDRIFT_CACHE_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_HOURS);

        let bind_addr =
            env::var("PINDRIFT_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let public_url = env::var("PINDRIFT_PUBLIC_URL").ok().filter(|u| !u.is_empty());
        let api_url = env::var("PINDRIFT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let log_level = env::var("PINDRIFT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            ai_endpoint,
            ai_model,
            ai_api_key,
            ai_timeout_secs,
            github_api_url,
            github_raw_url,
            osv_url,
            osv_enabled,
            db_url,
            cache_ttl_hours,
            bind_addr,
            public_url,
            api_url,
            log_level,
        }
    }

    /// Validates the configuration
    ///
    /// Checks that numeric values are in valid ranges and the log level is
    /// one of the accepted names. API-key presence is checked separately by
    /// [`Config::require_api_key`] so that commands which never touch the
    /// gateway (e.g. `--help`) do not demand one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "AI timeout must be at least 1 second".to_string(),
            ));
        }
        if self.ai_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "AI timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.cache_ttl_hours < 1 {
            return Err(ConfigError::ValidationFailed(
                "Cache TTL must be at least 1 hour".to_string(),
            ));
        }
        if self.cache_ttl_hours > 24 * 30 {
            return Err(ConfigError::ValidationFailed(
                "Cache TTL cannot exceed 30 days".to_string(),
            ));
        }

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid bind address: {}",
                self.bind_addr
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Returns the API key or the configuration error the taxonomy demands
    /// when an analysis is attempted without one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.ai_api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Whether the configured AI endpoint demands a bearer token.
    ///
    /// Hosted gateways (https) reject anonymous calls, so the absence of a
    /// key is caught before any pipeline work. Local endpoints (Ollama,
    /// LM Studio) run keyless.
    pub fn needs_api_key(&self) -> bool {
        self.ai_endpoint.starts_with("https://")
    }

    /// SurrealDB endpoint to connect to: the configured URL, or a surrealkv
    /// store under the platform-local data directory.
    pub fn db_endpoint(&self) -> String {
        match &self.db_url {
            Some(url) => url.clone(),
            None => {
                let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
                format!("surrealkv://{}", base.join("pindrift").join("db").display())
            }
        }
    }

    /// Base URL for share links when a request carries no Origin header.
    pub fn share_base(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_addr),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pindrift Configuration:")?;
        writeln!(f, "  AI Endpoint: {}", self.ai_endpoint)?;
        writeln!(f, "  AI Model: {}", self.ai_model)?;
        writeln!(
            f,
            "  AI API Key: {}",
            if self.ai_api_key.is_some() { "set" } else { "unset" }
        )?;
        writeln!(f, "  AI Timeout: {}s", self.ai_timeout_secs)?;
        writeln!(f, "  GitHub API: {}", self.github_api_url)?;
        writeln!(f, "  GitHub Raw: {}", self.github_raw_url)?;
        writeln!(f, "  OSV: {} (enabled: {})", self.osv_url, self.osv_enabled)?;
        writeln!(f, "  Database: {}", self.db_endpoint())?;
        writeln!(f, "  Cache TTL: {}h", self.cache_ttl_hours)?;
        writeln!(f, "  Bind Address: {}", self.bind_addr)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn plain_config() -> Config {
        Config {
            ai_endpoint: DEFAULT_AI_ENDPOINT.to_string(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            ai_api_key: Some("test-key".to_string()),
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_raw_url: DEFAULT_GITHUB_RAW_URL.to_string(),
            osv_url: DEFAULT_OSV_URL.to_string(),
            osv_enabled: true,
            db_url: Some("mem://".to_string()),
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            public_url: None,
            api_url: DEFAULT_API_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("PINDRIFT_AI_ENDPOINT"),
            EnvGuard::unset("PINDRIFT_AI_MODEL"),
            EnvGuard::unset("PINDRIFT_AI_TIMEOUT_SECS"),
            EnvGuard::unset("PINDRIFT_CACHE_TTL_HOURS"),
            EnvGuard::unset("PINDRIFT_LOG_LEVEL"),
        ];

        let config = Config::from_env();

        assert_eq!(config.ai_endpoint, DEFAULT_AI_ENDPOINT);
        assert_eq!(config.ai_model, DEFAULT_AI_MODEL);
        assert_eq!(config.ai_timeout_secs, DEFAULT_AI_TIMEOUT_SECS);
        assert_eq!(config.cache_ttl_hours, DEFAULT_CACHE_TTL_HOURS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.osv_enabled);
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("PINDRIFT_AI_ENDPOINT", "http://gateway:9000"),
            EnvGuard::set("PINDRIFT_AI_MODEL", "custom-model"),
            EnvGuard::set("PINDRIFT_AI_API_KEY", "sk-test"),
            EnvGuard::set("PINDRIFT_AI_TIMEOUT_SECS", "60"),
            EnvGuard::set("PINDRIFT_OSV_ENABLED", "false"),
            EnvGuard::set("PINDRIFT_CACHE_TTL_HOURS", "48"),
            EnvGuard::set("PINDRIFT_LOG_LEVEL", "DEBUG"),
        ];

        let config = Config::from_env();

        assert_eq!(config.ai_endpoint, "http://gateway:9000");
        assert_eq!(config.ai_model, "custom-model");
        assert_eq!(config.ai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai_timeout_secs, 60);
        assert!(!config.osv_enabled);
        assert_eq!(config.cache_ttl_hours, 48);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_configuration_validation_valid() {
        assert!(plain_config().validate().is_ok());
    }

    #[test]
    fn test_configuration_validation_invalid_timeout() {
        let mut config = plain_config();
        config.ai_timeout_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_ttl() {
        let mut config = plain_config();
        config.cache_ttl_hours = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_bind_addr() {
        let mut config = plain_config();
        config.bind_addr = "not-an-addr".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = plain_config();
        config.log_level = "invalid".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = plain_config();
        assert!(config.require_api_key().is_ok());

        config.ai_api_key = None;
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_needs_api_key_only_for_hosted_endpoints() {
        let mut config = plain_config();
        assert!(!config.needs_api_key());

        config.ai_endpoint = "https://ai.gateway.example.com".to_string();
        assert!(config.needs_api_key());
    }

    #[test]
    fn test_db_endpoint_prefers_configured_url() {
        let mut config = plain_config();
        config.db_url = Some("ws://db.internal:8000".to_string());
        assert_eq!(config.db_endpoint(), "ws://db.internal:8000");

        config.db_url = None;
        assert!(config.db_endpoint().starts_with("surrealkv://"));
    }

    #[test]
    fn test_share_base() {
        let mut config = plain_config();
        assert_eq!(config.share_base(), "http://127.0.0.1:8787");

        config.public_url = Some("https://pindrift.dev/".to_string());
        assert_eq!(config.share_base(), "https://pindrift.dev");
    }

    #[test]
    fn test_config_display_masks_key() {
        let display = format!("{}", plain_config());
        assert!(display.contains("Pindrift Configuration:"));
        assert!(display.contains("AI API Key: set"));
        assert!(!display.contains("test-key"));
    }
}
