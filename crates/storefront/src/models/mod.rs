//! Types the storefront keeps in its own session.
//!
//! Catalog entities (products, carts, orders) come from `harbor-core`.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
