//! Configuration management for the to-do client.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Owner of every item this client reads and writes
pub const USER_ID: u64 = 1;

/// Default root of the todos resource
pub const DEFAULT_BASE_URL: &str = "https://mate.academy/students-api";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote resource configuration
    pub api: ApiConfig,
    /// Client behaviour configuration
    pub app: AppConfig,
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,
    /// Use the in-memory resource instead of the network (demo only)
    pub offline: bool,
}

/// Remote resource configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL of the todos resource
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Client behaviour configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// How long an error stays visible, in milliseconds
    pub error_display_ms: u64,
    /// How long callers wait for an operation outcome, in seconds
    pub operation_timeout_secs: u64,
}

impl AppConfig {
    /// How long an error stays visible
    #[must_use]
    pub const fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    /// How long callers wait for an operation outcome
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_source(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: lookup("TODOS_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                request_timeout_secs: parse_or(&lookup, "TODOS_REQUEST_TIMEOUT_SECS", 10),
            },
            app: AppConfig {
                error_display_ms: parse_or(&lookup, "TODOS_ERROR_DISPLAY_MS", 3000),
                operation_timeout_secs: parse_or(&lookup, "TODOS_OPERATION_TIMEOUT_SECS", 30),
            },
            log_level: lookup("TODOS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            offline: parse_or(&lookup, "TODOS_OFFLINE", false),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
