//! Harbor Core - Shared domain types.
//!
//! This crate provides the types used across Harbor components:
//! - `storefront` - Public-facing web storefront
//! - `cli` - Command-line tools for migrations and catalog management
//!
//! # Architecture
//!
//! The core crate contains only types and pure display rules - no I/O, no
//! database access, no HTTP clients. The catalog API is the source of truth
//! for every entity here; these types only mirror its responses.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, products, filters, carts, users, and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
