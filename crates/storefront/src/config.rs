//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEBIUS_API_BASE_URL` - Base URL of the Mebius REST API
//!   (e.g., `https://api.mebius.shop/api/`)
//!
//! ## Optional
//! - `MEBIUS_API_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 30)
//! - `MEBIUS_DATA_DIR` - Directory for the local key-value slot
//!   (default: `.mebius`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Mebius REST API configuration.
    pub api: ApiConfig,
    /// Directory holding the local key-value slot.
    pub data_dir: PathBuf,
}

/// Mebius REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL for all API requests; always ends with a trailing slash so
    /// relative endpoint paths join correctly.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("MEBIUS_DATA_DIR", ".mebius"));

        Ok(Self { api, data_dir })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("MEBIUS_API_BASE_URL")?;
        let base_url = parse_base_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("MEBIUS_API_BASE_URL".to_string(), e))?;

        let timeout_secs = get_env_or_default("MEBIUS_API_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MEBIUS_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Parse a base URL and normalize it to end with a trailing slash.
///
/// `Url::join` drops the last path segment when the base lacks a trailing
/// slash, so `https://host/api` would silently lose `/api`.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
