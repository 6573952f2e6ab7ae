//! Server-backed wishlist with a local mirror.
//!
//! The wishlist lives on the server; this module keeps a local copy that
//! mutations update as their requests complete. Because add and remove for
//! the same product can be issued in quick succession, each mutation carries
//! an operation token and the mirror only accepts the completion carrying
//! the latest token issued for that product. A slow `add` response landing
//! after a newer `remove` is discarded instead of resurrecting the entry.
//!
//! Events are applied through the pure [`WishlistState::apply`] reducer;
//! [`WishlistStore`] drives the API calls and holds the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument, warn};

use mebius_core::ProductId;

use crate::api::types::{Product, WishlistEntry};
use crate::api::{ApiClient, ApiError};

/// A token identifying one in-flight mutation.
///
/// Tokens are issued in strictly increasing order; a completion whose token
/// is older than the latest issued for its product is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpToken(u64);

/// Mirror of the server-side wishlist plus request bookkeeping.
#[derive(Debug, Default)]
pub struct WishlistState {
    entries: Vec<WishlistEntry>,
    loading: bool,
    error: Option<String>,
    /// Latest token issued per product; completions with older tokens are
    /// discarded.
    latest_op: HashMap<ProductId, OpToken>,
    next_token: u64,
}

/// A completed step of a wishlist operation.
#[derive(Debug)]
pub enum WishlistEvent {
    FetchStarted,
    FetchSucceeded(Vec<WishlistEntry>),
    FetchFailed(String),
    AddSucceeded {
        token: OpToken,
        entry: WishlistEntry,
    },
    AddFailed {
        token: OpToken,
        product_id: ProductId,
        message: String,
    },
    RemoveSucceeded {
        token: OpToken,
        product_id: ProductId,
    },
    RemoveFailed {
        token: OpToken,
        product_id: ProductId,
        message: String,
    },
}

impl WishlistState {
    /// Issue a token for a new mutation targeting `product_id`.
    ///
    /// Issuing supersedes any earlier in-flight mutation for the same
    /// product and clears a previous error.
    pub fn begin_mutation(&mut self, product_id: &ProductId) -> OpToken {
        let token = OpToken(self.next_token);
        self.next_token += 1;
        self.latest_op.insert(product_id.clone(), token);
        self.error = None;
        token
    }

    fn is_current(&self, product_id: &ProductId, token: OpToken) -> bool {
        self.latest_op.get(product_id) == Some(&token)
    }

    /// Apply a completion event. Stale mutation completions are dropped.
    pub fn apply(&mut self, event: WishlistEvent) {
        match event {
            WishlistEvent::FetchStarted => {
                self.loading = true;
                self.error = None;
            }
            WishlistEvent::FetchSucceeded(entries) => {
                self.loading = false;
                self.entries = entries;
            }
            WishlistEvent::FetchFailed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            WishlistEvent::AddSucceeded { token, entry } => {
                let product_id = entry.product.id.clone();
                if !self.is_current(&product_id, token) {
                    debug!(product_id = %product_id, "Discarding stale wishlist add");
                    return;
                }
                self.latest_op.remove(&product_id);
                self.entries
                    .retain(|existing| existing.product.id != product_id);
                // Newest entries surface first.
                self.entries.insert(0, entry);
            }
            WishlistEvent::AddFailed {
                token,
                product_id,
                message,
            } => {
                if !self.is_current(&product_id, token) {
                    return;
                }
                self.latest_op.remove(&product_id);
                self.error = Some(message);
            }
            WishlistEvent::RemoveSucceeded { token, product_id } => {
                if !self.is_current(&product_id, token) {
                    debug!(product_id = %product_id, "Discarding stale wishlist remove");
                    return;
                }
                self.latest_op.remove(&product_id);
                self.entries
                    .retain(|existing| existing.product.id != product_id);
            }
            WishlistEvent::RemoveFailed {
                token,
                product_id,
                message,
            } => {
                if !self.is_current(&product_id, token) {
                    return;
                }
                self.latest_op.remove(&product_id);
                self.error = Some(message);
            }
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.product.id == *product_id)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Drop the mirror entirely, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest_op.clear();
        self.error = None;
        self.loading = false;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

// =============================================================================
// WishlistStore
// =============================================================================

/// Drives wishlist API calls and applies their completions to the mirror.
///
/// Requests run outside the state lock; only token issue and event
/// application hold it.
pub struct WishlistStore {
    api: ApiClient,
    state: Arc<Mutex<WishlistState>>,
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(WishlistState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WishlistState> {
        self.state.lock().expect("wishlist lock poisoned")
    }

    /// Replace the mirror with the server's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; the failure is also
    /// recorded in the state for display.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<(), ApiError> {
        self.lock().apply(WishlistEvent::FetchStarted);

        match self.api.get_wishlist().await {
            Ok(entries) => {
                self.lock().apply(WishlistEvent::FetchSucceeded(entries));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch wishlist");
                self.lock()
                    .apply(WishlistEvent::FetchFailed(e.user_message()));
                Err(e)
            }
        }
    }

    /// Add `product` to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. The mirror is only updated
    /// if no newer mutation for the same product was issued meanwhile.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product) -> Result<(), ApiError> {
        let product_id = product.id.clone();
        let token = self.lock().begin_mutation(&product_id);

        match self.api.add_wishlist_item(&product_id).await {
            Ok(entry) => {
                self.lock()
                    .apply(WishlistEvent::AddSucceeded { token, entry });
                Ok(())
            }
            Err(e) => {
                self.lock().apply(WishlistEvent::AddFailed {
                    token,
                    product_id,
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Remove the entry for `product_id` from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. The mirror is only updated
    /// if no newer mutation for the same product was issued meanwhile.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let token = self.lock().begin_mutation(product_id);

        match self.api.remove_wishlist_item(product_id).await {
            Ok(()) => {
                self.lock().apply(WishlistEvent::RemoveSucceeded {
                    token,
                    product_id: product_id.clone(),
                });
                Ok(())
            }
            Err(e) => {
                self.lock().apply(WishlistEvent::RemoveFailed {
                    token,
                    product_id: product_id.clone(),
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Toggle membership: remove if present, add otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying API request fails.
    pub async fn toggle(&self, product: &Product) -> Result<(), ApiError> {
        if self.is_in_wishlist(&product.id) {
            self.remove(&product.id).await
        } else {
            self.add(product).await
        }
    }

    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.lock().entries().to_vec()
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.lock().is_in_wishlist(product_id)
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error().map(str::to_owned)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn clear_error(&self) {
        self.lock().clear_error();
    }
}
