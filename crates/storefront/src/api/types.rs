//! Wire types for the Mebius REST API.
//!
//! The API is a Mongo-backed JSON service: entities carry an opaque `_id`
//! and camelCase field names. These types are consumed as immutable within a
//! single page view; the authoritative copy lives server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mebius_core::{
    CategoryId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, ReviewId,
    UserId, WishlistEntryId,
};

/// Fallback used when a product carries no description in any field.
pub const NO_DESCRIPTION: &str = "No description available";

// =============================================================================
// Catalog
// =============================================================================

/// A product as returned by `GET products`.
///
/// Older catalog entries use a single `image` field and `description`;
/// newer ones use `images` and the split short/detailed descriptions. Both
/// shapes occur in production data, so every variant is optional here and
/// resolved through [`Product::primary_image`] and
/// [`Product::resolved_description`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_description: Option<String>,
    /// Server-reported available inventory at last fetch.
    pub stock: u32,
    pub category_id: CategoryId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<serde_json::Value>,
}

impl Product {
    /// First image of the product, falling back from the `images` collection
    /// to the legacy single `image` field.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.image.as_deref())
    }

    /// Prioritized description resolution: `description`, then
    /// `short_description`, then `detailed_description`, then
    /// [`NO_DESCRIPTION`]. Single resolution point for every surface that
    /// renders a description.
    #[must_use]
    pub fn resolved_description(&self) -> &str {
        self.description
            .as_deref()
            .or(self.short_description.as_deref())
            .or(self.detailed_description.as_deref())
            .unwrap_or(NO_DESCRIPTION)
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
}

/// Response of `GET products/check-stock`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStockResponse {
    pub is_in_stock: bool,
}

/// Payload for admin product create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stock: u32,
    pub category_id: CategoryId,
}

/// Payload for admin category create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Shipping address entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub line_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_2: Option<String>,
    pub city: String,
    pub zip: String,
    pub phone: String,
}

/// One line of an order request: the denormalized product snapshot captured
/// at add-to-cart time, plus the ordered quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: OrderProduct,
    pub quantity: u32,
}

/// The product snapshot embedded in an order.
///
/// Sub-fields are re-derived defensively when the request is built: see
/// `checkout::build_order_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub description: String,
    pub stock: u32,
}

/// Request DTO for `POST orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Response of `POST orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Payment-intent secret, present only for CARD orders.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// A full order as returned by `GET orders/:id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Order total, summed freshly from the line snapshots.
    #[must_use]
    pub fn total(&self) -> Price {
        Price::sum(
            self.items
                .iter()
                .map(|item| item.product.price.line_total(item.quantity)),
        )
    }
}

/// Aggregates for the admin dashboard (`GET orders/admin/stats`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_revenue: Price,
    #[serde(default)]
    pub pending_orders: u64,
    #[serde(default)]
    pub delivered_orders: u64,
}

/// Payload for `PATCH orders/admin/:id/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_status: OrderStatus,
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for `POST reviews`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: ProductId,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub comment: String,
}

/// Payload for `PATCH reviews/:id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub comment: String,
}

/// Response of `GET reviews/stats/:productId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: u64,
}

// =============================================================================
// Wishlist
// =============================================================================

/// One wishlist entry.
///
/// The server populates `productId` with the full product document, so the
/// field deserializes into a [`Product`] rather than a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    #[serde(rename = "_id")]
    pub id: WishlistEntryId,
    #[serde(rename = "productId")]
    pub product: Product,
}

/// Payload for wishlist `POST`/`DELETE`, both keyed by product id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemRequest {
    pub product_id: ProductId,
}

/// Response of `POST wishlist`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemCreated {
    pub wishlist_item: WishlistEntry,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_product_json() -> serde_json::Value {
        json!({
            "_id": "p1",
            "name": "Mebius Buds",
            "price": 49.99,
            "images": ["https://cdn.mebius.shop/buds-front.jpg"],
            "shortDescription": "Wireless earbuds",
            "stock": 12,
            "categoryId": "c1",
            "tags": ["audio"]
        })
    }

    #[test]
    fn test_product_deserializes_camel_case() {
        let product: Product = serde_json::from_value(sample_product_json()).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.stock, 12);
        assert_eq!(product.category_id.as_str(), "c1");
        assert_eq!(product.short_description.as_deref(), Some("Wireless earbuds"));
    }

    #[test]
    fn test_primary_image_prefers_images_collection() {
        let mut product: Product = serde_json::from_value(sample_product_json()).unwrap();
        assert_eq!(
            product.primary_image(),
            Some("https://cdn.mebius.shop/buds-front.jpg")
        );

        product.images.clear();
        product.image = Some("legacy.jpg".to_string());
        assert_eq!(product.primary_image(), Some("legacy.jpg"));

        product.image = None;
        assert_eq!(product.primary_image(), None);
    }

    #[test]
    fn test_resolved_description_fallback_chain() {
        let mut product: Product = serde_json::from_value(sample_product_json()).unwrap();
        assert_eq!(product.resolved_description(), "Wireless earbuds");

        product.description = Some("Primary".to_string());
        assert_eq!(product.resolved_description(), "Primary");

        product.description = None;
        product.short_description = None;
        product.detailed_description = Some("Detailed".to_string());
        assert_eq!(product.resolved_description(), "Detailed");

        product.detailed_description = None;
        assert_eq!(product.resolved_description(), NO_DESCRIPTION);
    }

    #[test]
    fn test_wishlist_entry_populated_product() {
        let entry: WishlistEntry = serde_json::from_value(json!({
            "_id": "w1",
            "productId": sample_product_json(),
        }))
        .unwrap();
        assert_eq!(entry.id.as_str(), "w1");
        assert_eq!(entry.product.id.as_str(), "p1");
    }

    #[test]
    fn test_order_total() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "items": [
                {
                    "product": {
                        "_id": "a", "name": "A", "price": 10,
                        "description": "d", "stock": 5
                    },
                    "quantity": 2
                },
                {
                    "product": {
                        "_id": "b", "name": "B", "price": 5,
                        "description": "d", "stock": 5
                    },
                    "quantity": 1
                }
            ],
            "paymentMethod": "COD"
        }))
        .unwrap();

        assert_eq!(order.total(), Price::from(25));
    }
}
