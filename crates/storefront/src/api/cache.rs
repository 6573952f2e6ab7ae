//! Cache types for Mebius API responses.
//!
//! Read responses are cached under a [`CacheKey`]; every key maps to one
//! [`CacheTag`]. Mutations declare the tags they invalidate, and the client
//! drops every cached entry carrying those tags before the next read.

use mebius_core::{OrderId, ProductId};

use super::types::{Category, Order, OrderStats, Product, Review, ReviewStats};

/// Invalidation tag, one per cached entity family.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheTag {
    Product,
    Category,
    Order,
    Review,
}

/// Cache key for read endpoints.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
    Categories,
    Order(OrderId),
    MyOrders,
    AllOrders,
    OrderStats,
    Reviews(ProductId),
    ReviewStats(ProductId),
}

impl CacheKey {
    /// The tag under which this key is invalidated.
    #[must_use]
    pub const fn tag(&self) -> CacheTag {
        match self {
            Self::Products | Self::Product(_) => CacheTag::Product,
            Self::Categories => CacheTag::Category,
            Self::Order(_) | Self::MyOrders | Self::AllOrders | Self::OrderStats => CacheTag::Order,
            Self::Reviews(_) | Self::ReviewStats(_) => CacheTag::Review,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Categories(Vec<Category>),
    Order(Box<Order>),
    Orders(Vec<Order>),
    OrderStats(OrderStats),
    Reviews(Vec<Review>),
    ReviewStats(ReviewStats),
}
