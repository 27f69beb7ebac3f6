//! Product listing filters and their query-string encoding.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default number of products per listing page.
pub const DEFAULT_PER_PAGE: u32 = 12;

/// Largest page size the storefront will ask for.
pub const MAX_PER_PAGE: u32 = 48;

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
}

impl SortOrder {
    /// All sort orders in the order they are offered in the filter form.
    pub const ALL: [Self; 4] = [Self::Newest, Self::PriceAsc, Self::PriceDesc, Self::NameAsc];

    /// Value sent to the catalog API and used in storefront URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::NameAsc => "Name: A to Z",
        }
    }

    /// Parse a sort value, falling back to [`SortOrder::Newest`] for anything unknown.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| format!("unknown sort order: {s}"))
    }
}

/// Criteria for a product listing request.
///
/// Filtering, searching, and ranking happen in the catalog API; this type only
/// carries the user's choices and encodes them as query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub sort: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            in_stock_only: false,
            sort: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ProductFilter {
    /// Return a cleaned-up copy of the filter.
    ///
    /// - Blank search/category strings become `None` (others are trimmed)
    /// - Negative prices are dropped
    /// - `min_price > max_price` is swapped
    /// - `page` is at least 1; `per_page` is clamped to `1..=MAX_PER_PAGE`
    #[must_use]
    pub fn normalized(&self) -> Self {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let non_negative = |value: Option<Decimal>| value.filter(|d| !d.is_sign_negative());

        let mut min_price = non_negative(self.min_price);
        let mut max_price = non_negative(self.max_price);
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            min_price = Some(max);
            max_price = Some(min);
        }

        Self {
            search: non_blank(&self.search),
            category: non_blank(&self.category),
            min_price,
            max_price,
            in_stock_only: self.in_stock_only,
            sort: self.sort,
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Encode the normalized filter as catalog API query parameters.
    ///
    /// `page` and `limit` are always present; other keys only when set.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let f = self.normalized();
        let mut query = vec![("page", f.page.to_string()), ("limit", f.per_page.to_string())];
        if let Some(search) = f.search {
            query.push(("search", search));
        }
        if let Some(category) = f.category {
            query.push(("category", category));
        }
        if let Some(min) = f.min_price {
            query.push(("minPrice", min.normalize().to_string()));
        }
        if let Some(max) = f.max_price {
            query.push(("maxPrice", max.normalize().to_string()));
        }
        if f.in_stock_only {
            query.push(("inStock", "true".to_string()));
        }
        if f.sort != SortOrder::Newest {
            query.push(("sort", f.sort.as_str().to_string()));
        }
        query
    }

    /// Stable cache key for the normalized filter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Copy of this filter pointing at another page.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Whether any narrowing criterion (beyond paging and sort) is set.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        let f = self.normalized();
        f.search.is_some()
            || f.category.is_some()
            || f.min_price.is_some()
            || f.max_price.is_some()
            || f.in_stock_only
    }
}
