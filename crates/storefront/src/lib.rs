//! Mebius Storefront library.
//!
//! Client-side core of the Mebius storefront: local cart state, server-synced
//! wishlist, the product listing pipeline, checkout orchestration, and a
//! tag-cached client for the Mebius REST API.
//!
//! # Architecture
//!
//! - The Mebius REST API is the source of truth for products, categories,
//!   orders, reviews, and wishlist contents - NO local sync, direct calls
//! - In-memory caching via `moka` for read responses, invalidated by tag
//!   when a mutation declares it touches that tag
//! - Cart state lives locally and is mirrored to a key-value slot; the
//!   in-memory copy is authoritative for the session
//! - Rendering and routing are the embedding application's concern

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod wishlist;
