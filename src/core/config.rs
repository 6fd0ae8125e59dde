//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, a `.env` file, or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Default upstream Web API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Default upstream request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Upstream Web API configuration.
    pub api: ApiConfig,

    /// OAuth client credentials and the header-less access token.
    pub credentials: CredentialsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,

    /// Debug mode. Forces `debug` log level.
    pub debug: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Upstream Web API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL every catalog path is resolved against.
    pub base_url: String,

    /// Per-request timeout, applied to validation and dispatch alike.
    pub timeout_secs: u64,
}

/// OAuth client credentials.
///
/// The client id, secret and redirect URI are only reported (never used to
/// exchange codes). `access_token` is the bearer credential used by
/// transports that carry no `Authorization` header (STDIO, TCP).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub access_token: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ApiConfig {
    /// The upstream timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The identity ("whoami") endpoint used to validate bearer tokens.
    pub fn identity_endpoint(&self) -> String {
        format!("{}/me", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "spotify-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                debug: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            api: ApiConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(debug) = std::env::var("MCP_DEBUG") {
            config.server.debug = parse_flag(&debug);
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if config.server.debug {
            config.logging.level = "debug".to_string();
        }

        if let Ok(timestamps) = std::env::var("MCP_LOG_TIMESTAMPS") {
            config.logging.with_timestamps = parse_flag(&timestamps);
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        if let Ok(base_url) = std::env::var("MCP_SPOTIFY_API_BASE_URL") {
            config.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("MCP_SPOTIFY_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.api.timeout_secs = secs,
                _ => warn!(
                    "Ignoring invalid MCP_SPOTIFY_TIMEOUT_SECS={:?}, using {}s",
                    timeout, DEFAULT_TIMEOUT_SECS
                ),
            }
        }

        config.credentials.client_id = std::env::var("MCP_SPOTIFY_CLIENT_ID").ok();
        config.credentials.client_secret = std::env::var("MCP_SPOTIFY_CLIENT_SECRET").ok();
        config.credentials.redirect_uri = std::env::var("MCP_SPOTIFY_REDIRECT_URI").ok();

        if let Ok(token) = std::env::var("MCP_SPOTIFY_ACCESS_TOKEN") {
            config.credentials.access_token = Some(token);
            info!("Access token loaded from environment (header-less transports)");
        } else if !config.transport.carries_auth_header() {
            warn!(
                "MCP_SPOTIFY_ACCESS_TOKEN not set - tool calls over this transport \
                 will be rejected as unauthorized"
            );
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_access_token_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_SPOTIFY_ACCESS_TOKEN", "test_token_12345");
        }
        let config = Config::from_env();
        assert_eq!(
            config.credentials.access_token.as_deref(),
            Some("test_token_12345")
        );
        unsafe {
            std::env::remove_var("MCP_SPOTIFY_ACCESS_TOKEN");
        }
    }

    #[test]
    fn test_debug_flag_forces_debug_level() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_DEBUG", "true");
            std::env::set_var("MCP_LOG_LEVEL", "warn");
        }
        let config = Config::from_env();
        assert!(config.server.debug);
        assert_eq!(config.logging.level, "debug");
        unsafe {
            std::env::remove_var("MCP_DEBUG");
            std::env::remove_var("MCP_LOG_LEVEL");
        }
    }

    #[test]
    fn test_invalid_timeout_keeps_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_SPOTIFY_TIMEOUT_SECS", "soon");
        }
        let config = Config::from_env();
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        unsafe {
            std::env::remove_var("MCP_SPOTIFY_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_zero_timeout_keeps_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_SPOTIFY_TIMEOUT_SECS", "0");
        }
        let config = Config::from_env();
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        unsafe {
            std::env::set_var("MCP_SPOTIFY_TIMEOUT_SECS", "3");
        }
        let config = Config::from_env();
        assert_eq!(config.api.timeout_secs, 3);
        unsafe {
            std::env::remove_var("MCP_SPOTIFY_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let creds = CredentialsConfig {
            client_id: Some("public_client".to_string()),
            client_secret: Some("super_secret".to_string()),
            redirect_uri: None,
            access_token: Some("BQD_secret_token".to_string()),
        };
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("REDACTED"));
        assert!(debug_str.contains("public_client"));
        assert!(!debug_str.contains("super_secret"));
        assert!(!debug_str.contains("BQD_secret_token"));
    }

    #[test]
    fn test_identity_endpoint_trims_trailing_slash() {
        let api = ApiConfig {
            base_url: "http://127.0.0.1:9000/v1/".to_string(),
            timeout_secs: 1,
        };
        assert_eq!(api.identity_endpoint(), "http://127.0.0.1:9000/v1/me");
    }
}
