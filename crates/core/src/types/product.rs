//! Product display records.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Units at or below which a product is shown as "low stock".
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// A product as returned by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Regular unit price.
    pub price: Decimal,
    /// Promotional unit price, when the product is discounted.
    #[serde(default)]
    pub promo_price: Option<Decimal>,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Units available.
    #[serde(default)]
    pub stock: u32,
    pub category: String,
}

/// Stock availability bucket used for badges and stepper limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Low(u32),
    InStock,
}

impl Product {
    /// The price a customer pays for one unit.
    ///
    /// The promotional price applies only when it is positive and strictly
    /// lower than the regular price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.active_promo().unwrap_or(self.price)
    }

    /// Whether the promotional price is in effect.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.active_promo().is_some()
    }

    /// Whole-percent discount off the regular price, when on sale.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let promo = self.active_promo()?;
        let pct = ((self.price - promo) / self.price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        pct.to_u32()
    }

    /// Stock availability bucket.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        match self.stock {
            0 => StockLevel::OutOfStock,
            n if n <= LOW_STOCK_THRESHOLD => StockLevel::Low(n),
            _ => StockLevel::InStock,
        }
    }

    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }

    fn active_promo(&self) -> Option<Decimal> {
        self.promo_price
            .filter(|promo| promo.is_sign_positive() && !promo.is_zero() && *promo < self.price)
    }
}

/// Payload for creating or replacing a product through the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub stock: u32,
    pub category: String,
}

impl ProductInput {
    /// Check the input before it is sent anywhere.
    ///
    /// Returns one message per problem; an empty list means the input is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.category.trim().is_empty() {
            problems.push("category is required".to_string());
        }
        if self.price.is_sign_negative() || self.price.is_zero() {
            problems.push("price must be greater than zero".to_string());
        }
        if let Some(promo) = self.promo_price
            && (promo.is_sign_negative() || promo >= self.price)
        {
            problems.push("promo price must be lower than price".to_string());
        }
        problems
    }
}
