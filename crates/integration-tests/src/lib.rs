//! Integration tests for the Mebius storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Point the tests at a running Mebius API
//! export MEBIUS_API_BASE_URL=http://localhost:3000/api
//!
//! # Include the ignored live tests
//! cargo test -p mebius-integration-tests -- --ignored
//! ```
//!
//! Wishlist and order tests additionally need `MEBIUS_API_TOKEN` set to a
//! valid bearer token for a test account.

use std::sync::Arc;
use std::time::Duration;

use mebius_storefront::api::{Anonymous, ApiClient, StaticToken, TokenProvider};
use mebius_storefront::config::ApiConfig;

/// Initialize tracing for test runs; honors `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base URL for the Mebius API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("MEBIUS_API_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000/api".to_string())
}

/// Token provider for the test account, anonymous when `MEBIUS_API_TOKEN`
/// is unset.
#[must_use]
pub fn token_provider() -> Arc<dyn TokenProvider> {
    match std::env::var("MEBIUS_API_TOKEN") {
        Ok(token) => Arc::new(StaticToken::new(token)),
        Err(_) => Arc::new(Anonymous),
    }
}

/// Build an API client against the configured live server.
#[must_use]
pub fn live_client() -> ApiClient {
    init_tracing();
    let config = ApiConfig {
        base_url: format!("{}/", api_base_url().trim_end_matches('/'))
            .parse()
            .expect("MEBIUS_API_BASE_URL must be a valid URL"),
        timeout: Duration::from_secs(30),
    };
    ApiClient::new(&config, token_provider()).expect("Failed to build API client")
}
