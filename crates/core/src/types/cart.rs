//! Cart records and the summary shown beside them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, ProductId};
use super::product::Product;

/// A product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Effective unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.effective_price() * Decimal::from(self.quantity)
    }

    /// Clamp a requested quantity to what can actually be ordered.
    ///
    /// The result is in `0..=stock`; zero means the line should be removed.
    #[must_use]
    pub fn clamp_quantity(&self, requested: u32) -> u32 {
        requested.min(self.product.stock)
    }
}

/// A cart as returned by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|item| item.quantity == 0)
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product.id == product_id)
    }

    /// Totals for display, given the store's shipping policy.
    #[must_use]
    pub fn summary(&self, shipping: &ShippingPolicy) -> CartSummary {
        let subtotal = self.subtotal();
        let shipping = if self.is_empty() {
            Decimal::ZERO
        } else {
            shipping.cost_for(subtotal)
        };
        CartSummary {
            subtotal,
            shipping,
            total: subtotal + shipping,
            item_count: self.item_count(),
        }
    }
}

/// Flat-rate shipping with an optional free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_rate: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_over: Option<Decimal>,
}

impl ShippingPolicy {
    /// Shipping charged for a non-empty cart with the given subtotal.
    #[must_use]
    pub fn cost_for(&self, subtotal: Decimal) -> Decimal {
        match self.free_over {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_rate,
        }
    }

    /// How much more the customer must spend for free shipping, if anything.
    #[must_use]
    pub fn remaining_for_free(&self, subtotal: Decimal) -> Option<Decimal> {
        self.free_over
            .filter(|threshold| subtotal < *threshold)
            .map(|threshold| threshold - subtotal)
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_rate: Decimal::new(500, 2),
            free_over: Some(Decimal::new(5000, 2)),
        }
    }
}

/// Totals shown next to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}
