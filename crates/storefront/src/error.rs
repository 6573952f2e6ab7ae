//! Unified error handling for the storefront.
//!
//! Module-level errors (`ApiError`, `StorageError`, ...) stay close to their
//! sources; `AppError` is the roll-up type for callers that drive the whole
//! storefront.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Mebius API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local key-value storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Checkout attempt failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

impl AppError {
    /// A message suitable for showing to the user.
    ///
    /// API errors defer to the server's message when one was returned;
    /// everything else uses the `Display` form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::Checkout(CheckoutError::Api(e)) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias for fallible storefront operations.
pub type Result<T> = std::result::Result<T, AppError>;
