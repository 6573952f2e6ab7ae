//! Application state shared across the storefront.

use std::sync::Arc;

use crate::api::{ApiClient, TokenProvider};
use crate::cart::CartStore;
use crate::checkout::CheckoutOrchestrator;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::storage::{JsonFileStore, KvStore};
use crate::wishlist::WishlistStore;

/// Application state shared across the whole storefront session.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// API client and the cart and wishlist stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: Arc<dyn KvStore>,
    api: ApiClient,
    cart: Arc<CartStore>,
    wishlist: WishlistStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Opens the local key-value slot under `config.data_dir` and restores
    /// the persisted cart from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file cannot be opened or the API
    /// client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, AppError> {
        let storage: Arc<dyn KvStore> =
            Arc::new(JsonFileStore::open(config.data_dir.join("storefront.json"))?);
        let api = ApiClient::new(&config.api, tokens)?;
        let cart = Arc::new(CartStore::load(Arc::clone(&storage)));
        let wishlist = WishlistStore::new(api.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                api,
                cart,
                wishlist,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Mebius API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the local cart store.
    #[must_use]
    pub fn cart(&self) -> &Arc<CartStore> {
        &self.inner.cart
    }

    /// Get a reference to the wishlist store.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// Start a fresh checkout attempt over the current cart.
    #[must_use]
    pub fn checkout(&self) -> CheckoutOrchestrator {
        CheckoutOrchestrator::new(
            self.inner.api.clone(),
            Arc::clone(&self.inner.cart),
            Arc::clone(&self.inner.storage),
        )
    }
}
