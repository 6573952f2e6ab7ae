//! Mebius REST API client.
//!
//! # Architecture
//!
//! - Thin declarative wrapper over `reqwest`; the remote API is the source
//!   of truth for every server-side entity
//! - Read responses cached in-memory via `moka` (5-minute TTL) under typed
//!   keys; mutations invalidate by [`CacheTag`]
//! - The bearer token comes from a third-party session provider through the
//!   [`TokenProvider`] seam and is attached to every request
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mebius_storefront::api::{Anonymous, ApiClient};
//!
//! let client = ApiClient::new(&config.api, Arc::new(Anonymous))?;
//! let products = client.get_products().await?;
//! let in_stock = client.check_stock(&products[0].id, 2).await?;
//! ```

mod cache;
pub mod types;

pub use cache::{CacheKey, CacheTag};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use mebius_core::{OrderId, OrderStatus, ProductId, ReviewId};

use crate::config::ApiConfig;
use cache::CacheValue;
use types::{
    Category, CategoryInput, CheckStockResponse, CreateReviewRequest, Order, OrderCreated,
    OrderRequest, OrderStats, Product, ProductInput, Review, ReviewStats, UpdateOrderStatusRequest,
    UpdateReviewRequest, WishlistEntry, WishlistItemCreated, WishlistItemRequest,
};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);
const ERROR_BODY_PREVIEW: usize = 500;

/// Errors that can occur when talking to the Mebius API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, protocol).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path did not join onto the base URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-success status from the server.
    #[error("API returned {status}: {}", message.as_deref().unwrap_or("(no message)"))]
    Status {
        status: u16,
        /// Server-supplied human-readable message, if the body carried one.
        message: Option<String>,
    },
}

impl ApiError {
    /// Human-readable message for transient user-visible notifications.
    ///
    /// Prefers a server-supplied message and falls back to a generic one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Unauthorized => "Please sign in and try again.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

// =============================================================================
// TokenProvider
// =============================================================================

/// Source of the bearer token attached to every request.
///
/// Authentication itself is handled by a third-party session provider; the
/// client only needs the current token at request time.
pub trait TokenProvider: Send + Sync {
    /// Current bearer token for the signed-in user, if any.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Fixed token, for tools and tests.
pub struct StaticToken(SecretString);

impl StaticToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// No session: requests go out unauthenticated.
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn bearer_token(&self) -> Option<SecretString> {
        None
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Mebius REST API.
///
/// Cheaply cloneable; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .support_invalidation_closures()
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                tokens,
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.inner.tokens.bearer_token() {
            Some(token) => request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    /// Map non-success statuses to errors, extracting a server message where
    /// the body carries one.
    async fn ensure_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }

        let path = response.url().path().to_owned();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path));
        }

        tracing::error!(
            status = %status,
            path = %path,
            body = %body.chars().take(ERROR_BODY_PREVIEW).collect::<String>(),
            "Mebius API returned non-success status"
        );

        Err(ApiError::Status {
            status: status.as_u16(),
            message: extract_server_message(&body),
        })
    }

    async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(ERROR_BODY_PREVIEW).collect::<String>(),
                "Failed to parse Mebius API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self.authorize(self.inner.client.get(url)).send().await?;
        let response = Self::ensure_success(response).await?;
        Self::parse_body(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .authorize(self.inner.client.request(method, url))
            .json(body)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Self::parse_body(response).await
    }

    async fn send_no_response<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        let mut request = self.authorize(self.inner.client.request(method, url));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    // =========================================================================
    // Products & Categories
    // =========================================================================

    /// Get the full product collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.get_json("products").await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(product_id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.get_json(&format!("products/{product_id}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get the category collection as the server reports it.
    ///
    /// Callers building a listing page should pass the result through
    /// `catalog::with_all_category` to obtain the synthetic "All" entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.get_json("categories").await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Ask the server whether `quantity` units of a product are available.
    ///
    /// Never cached: this is the one place where the cart consults live
    /// stock instead of the denormalized snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn check_stock(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, ApiError> {
        let response: CheckStockResponse = self
            .get_json(&format!(
                "products/check-stock?productId={product_id}&quantity={quantity}"
            ))
            .await?;
        Ok(response.is_in_stock)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create an order from the assembled request DTO.
    ///
    /// Invalidates order and product caches (stock levels change server-side
    /// when an order is accepted).
    ///
    /// The API occasionally answers `201 Created` with an empty body; in
    /// that case the order id is recovered from the `Location` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no order id can be derived
    /// from the response.
    #[instrument(skip(self, order))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<OrderCreated, ApiError> {
        let url = self.endpoint("orders")?;
        let response = self
            .authorize(self.inner.client.post(url))
            .json(order)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let text = response.text().await?;
        let created = if text.trim().is_empty() {
            let id = location
                .as_deref()
                .and_then(|loc| loc.rsplit('/').find(|segment| !segment.is_empty()))
                .ok_or_else(|| ApiError::Status {
                    status: 201,
                    message: Some("Order created but no order id was returned".to_string()),
                })?;
            OrderCreated {
                id: OrderId::new(id),
                order_status: OrderStatus::default(),
                payment_status: mebius_core::PaymentStatus::default(),
                client_secret: None,
            }
        } else {
            serde_json::from_str(&text)?
        };

        self.invalidate_tag(CacheTag::Order);
        self.invalidate_tag(CacheTag::Product);

        Ok(created)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ApiError> {
        let key = CacheKey::Order(order_id.clone());
        if let Some(CacheValue::Order(order)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for order");
            return Ok(*order);
        }

        let order: Order = self.get_json(&format!("orders/{order_id}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Order(Box::new(order.clone())))
            .await;

        Ok(order)
    }

    /// Get the current user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_my_orders(&self) -> Result<Vec<Order>, ApiError> {
        if let Some(CacheValue::Orders(orders)) = self.inner.cache.get(&CacheKey::MyOrders).await {
            debug!("Cache hit for order history");
            return Ok(orders);
        }

        let orders: Vec<Order> = self.get_json("orders").await?;

        self.inner
            .cache
            .insert(CacheKey::MyOrders, CacheValue::Orders(orders.clone()))
            .await;

        Ok(orders)
    }

    /// Admin: list every order in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<Order>, ApiError> {
        if let Some(CacheValue::Orders(orders)) = self.inner.cache.get(&CacheKey::AllOrders).await {
            debug!("Cache hit for admin order list");
            return Ok(orders);
        }

        let orders: Vec<Order> = self.get_json("orders/admin/all").await?;

        self.inner
            .cache
            .insert(CacheKey::AllOrders, CacheValue::Orders(orders.clone()))
            .await;

        Ok(orders)
    }

    /// Admin: aggregate order statistics for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_order_stats(&self) -> Result<OrderStats, ApiError> {
        if let Some(CacheValue::OrderStats(stats)) =
            self.inner.cache.get(&CacheKey::OrderStats).await
        {
            debug!("Cache hit for order stats");
            return Ok(stats);
        }

        let stats: OrderStats = self.get_json("orders/admin/stats").await?;

        self.inner
            .cache
            .insert(CacheKey::OrderStats, CacheValue::OrderStats(stats.clone()))
            .await;

        Ok(stats)
    }

    /// Admin: move an order to a new fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let order: Order = self
            .send_json(
                Method::PATCH,
                &format!("orders/admin/{order_id}/status"),
                &UpdateOrderStatusRequest {
                    order_status: status,
                },
            )
            .await?;

        self.invalidate_tag(CacheTag::Order);

        Ok(order)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Get the reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, ApiError> {
        let key = CacheKey::Reviews(product_id.clone());
        if let Some(CacheValue::Reviews(reviews)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for reviews");
            return Ok(reviews);
        }

        let reviews: Vec<Review> = self
            .get_json(&format!("reviews?productId={product_id}"))
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Reviews(reviews.clone()))
            .await;

        Ok(reviews)
    }

    /// Submit a new review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, review))]
    pub async fn create_review(&self, review: &CreateReviewRequest) -> Result<Review, ApiError> {
        let created: Review = self.send_json(Method::POST, "reviews", review).await?;
        self.invalidate_tag(CacheTag::Review);
        Ok(created)
    }

    /// Update an existing review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, review), fields(review_id = %review_id))]
    pub async fn update_review(
        &self,
        review_id: &ReviewId,
        review: &UpdateReviewRequest,
    ) -> Result<Review, ApiError> {
        let updated: Review = self
            .send_json(Method::PATCH, &format!("reviews/{review_id}"), review)
            .await?;
        self.invalidate_tag(CacheTag::Review);
        Ok(updated)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(review_id = %review_id))]
    pub async fn delete_review(&self, review_id: &ReviewId) -> Result<(), ApiError> {
        self.send_no_response::<()>(Method::DELETE, &format!("reviews/{review_id}"), None)
            .await?;
        self.invalidate_tag(CacheTag::Review);
        Ok(())
    }

    /// Get aggregate rating statistics for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_review_stats(&self, product_id: &ProductId) -> Result<ReviewStats, ApiError> {
        let key = CacheKey::ReviewStats(product_id.clone());
        if let Some(CacheValue::ReviewStats(stats)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for review stats");
            return Ok(stats);
        }

        let stats: ReviewStats = self
            .get_json(&format!("reviews/stats/{product_id}"))
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::ReviewStats(stats.clone()))
            .await;

        Ok(stats)
    }

    // =========================================================================
    // Wishlist (not cached - the wishlist store holds the local copy)
    // =========================================================================

    /// Fetch the signed-in user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        self.get_json("wishlist").await
    }

    /// Add a product to the wishlist; returns the created entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_wishlist_item(
        &self,
        product_id: &ProductId,
    ) -> Result<WishlistEntry, ApiError> {
        let created: WishlistItemCreated = self
            .send_json(
                Method::POST,
                "wishlist",
                &WishlistItemRequest {
                    product_id: product_id.clone(),
                },
            )
            .await?;
        Ok(created.wishlist_item)
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_wishlist_item(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.send_no_response(
            Method::DELETE,
            "wishlist",
            Some(&WishlistItemRequest {
                product_id: product_id.clone(),
            }),
        )
        .await
    }

    // =========================================================================
    // Admin catalog CRUD
    // =========================================================================

    /// Admin: create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, product))]
    pub async fn create_product(&self, product: &ProductInput) -> Result<Product, ApiError> {
        let created: Product = self.send_json(Method::POST, "products", product).await?;
        self.invalidate_tag(CacheTag::Product);
        Ok(created)
    }

    /// Admin: update a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, product), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: &ProductId,
        product: &ProductInput,
    ) -> Result<Product, ApiError> {
        let updated: Product = self
            .send_json(Method::PATCH, &format!("products/{product_id}"), product)
            .await?;
        self.invalidate_tag(CacheTag::Product);
        Ok(updated)
    }

    /// Admin: delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.send_no_response::<()>(Method::DELETE, &format!("products/{product_id}"), None)
            .await?;
        self.invalidate_tag(CacheTag::Product);
        Ok(())
    }

    /// Admin: create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, category))]
    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category, ApiError> {
        let created: Category = self.send_json(Method::POST, "categories", category).await?;
        self.invalidate_tag(CacheTag::Category);
        Ok(created)
    }

    /// Admin: update a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, category), fields(category_id = %category_id))]
    pub async fn update_category(
        &self,
        category_id: &mebius_core::CategoryId,
        category: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let updated: Category = self
            .send_json(
                Method::PATCH,
                &format!("categories/{category_id}"),
                category,
            )
            .await?;
        self.invalidate_tag(CacheTag::Category);
        Ok(updated)
    }

    /// Admin: delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn delete_category(
        &self,
        category_id: &mebius_core::CategoryId,
    ) -> Result<(), ApiError> {
        self.send_no_response::<()>(Method::DELETE, &format!("categories/{category_id}"), None)
            .await?;
        self.invalidate_tag(CacheTag::Category);
        Ok(())
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached entry carrying `tag`.
    pub fn invalidate_tag(&self, tag: CacheTag) {
        if let Err(e) = self
            .inner
            .cache
            .invalidate_entries_if(move |key, _| key.tag() == tag)
        {
            tracing::warn!(error = %e, "Cache invalidation predicate rejected");
        }
    }

    /// Invalidate all cached data (e.g., on sign-out).
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API wraps errors as `{"message": "..."}`; some middleware layers use
/// `{"error": "..."}` instead. Falls back to the raw text when it is short
/// and non-empty.
fn extract_server_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = value.get(field).and_then(|m| m.as_str())
                && !message.is_empty()
            {
                return Some(message.to_owned());
            }
        }
        return None;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.len() > 200 {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
