//! Core types for Harbor.
//!
//! This module provides type-safe wrappers and display records for the
//! storefront domain.

pub mod cart;
pub mod email;
pub mod filter;
pub mod id;
pub mod order;
pub mod page;
pub mod price;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartSummary, ShippingPolicy};
pub use email::{Email, EmailError};
pub use filter::{ProductFilter, SortOrder};
pub use id::*;
pub use order::{AddressField, Order, OrderLine, OrderStatus, ShippingAddress};
pub use page::{Page, PageSlot};
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductInput, StockLevel};
pub use user::User;
