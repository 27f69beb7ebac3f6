//! Product route handlers.
//!
//! Listing filters live in the query string so every filtered page has a
//! shareable URL; the normalized filter is what reaches the catalog API.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use harbor_core::{CurrencyCode, Page, PageSlot, Product, ProductFilter, ProductId, SortOrder, StockLevel};

use super::layout::{Layout, Notice, money};
use crate::api::ApiError;
use crate::filters;
use crate::state::AppState;

/// Page numbers shown either side of the current page.
const PAGINATION_RADIUS: u32 = 2;

/// How many related products the detail page shows.
const RELATED_PRODUCTS: usize = 4;

/// Fetch one extra so the current product can be dropped.
const RELATED_FETCH: u32 = 5;

// =============================================================================
// Views
// =============================================================================

/// Product display data for templates.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub category_url: String,
    /// Price the customer pays.
    pub price: String,
    /// Regular price, shown struck through when on sale.
    pub regular_price: Option<String>,
    /// e.g. "-25%"
    pub discount_label: Option<String>,
    pub image: Option<String>,
    pub stock: u32,
    pub in_stock: bool,
    pub stock_label: String,
    pub low_stock: bool,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        let (stock_label, low_stock) = match product.stock_level() {
            StockLevel::OutOfStock => ("Out of stock".to_string(), false),
            StockLevel::Low(n) => (format!("Only {n} left"), true),
            StockLevel::InStock => ("In stock".to_string(), false),
        };

        Self {
            id: product.id.to_string(),
            url: product_url(&product.id),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            category_url: listing_url(&ProductFilter {
                category: Some(product.category.clone()),
                ..ProductFilter::default()
            }),
            price: money(product.effective_price(), currency),
            regular_price: product
                .is_on_sale()
                .then(|| money(product.price, currency)),
            discount_label: product.discount_percent().map(|p| format!("-{p}%")),
            image: product.image.clone().filter(|url| !url.trim().is_empty()),
            stock: product.stock,
            in_stock: product.is_available(),
            stock_label,
            low_stock,
        }
    }
}

/// Detail page URL for a product.
#[must_use]
pub fn product_url(id: &ProductId) -> String {
    format!("/products/{}", urlencoding::encode(id.as_str()))
}

/// A `<select>` option.
#[derive(Clone, Debug)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Current filter values for the filter form.
#[derive(Clone, Debug)]
pub struct FilterView {
    pub search: String,
    pub min_price: String,
    pub max_price: String,
    pub in_stock_only: bool,
    /// Non-default page size, kept across filter changes.
    pub per_page: Option<u32>,
    pub categories: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
    pub is_filtered: bool,
}

impl FilterView {
    #[must_use]
    pub fn new(filter: &ProductFilter, categories: &[String]) -> Self {
        let selected_category = filter.category.as_deref().unwrap_or_default();
        Self {
            search: filter.search.clone().unwrap_or_default(),
            min_price: filter.min_price.map(|d| d.normalize().to_string()).unwrap_or_default(),
            max_price: filter.max_price.map(|d| d.normalize().to_string()).unwrap_or_default(),
            in_stock_only: filter.in_stock_only,
            per_page: (filter.per_page != ProductFilter::default().per_page)
                .then_some(filter.per_page),
            categories: categories
                .iter()
                .map(|name| OptionView {
                    value: name.clone(),
                    label: name.clone(),
                    selected: name == selected_category,
                })
                .collect(),
            sorts: SortOrder::ALL
                .iter()
                .map(|sort| OptionView {
                    value: sort.as_str().to_string(),
                    label: sort.label().to_string(),
                    selected: *sort == filter.sort,
                })
                .collect(),
            is_filtered: filter.is_filtered(),
        }
    }
}

/// One entry in the pagination bar.
#[derive(Clone, Debug)]
pub struct PageLink {
    pub number: u32,
    pub url: String,
    pub is_current: bool,
    pub is_gap: bool,
}

/// Pagination bar.
#[derive(Clone, Debug)]
pub struct PaginationView {
    pub links: Vec<PageLink>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl PaginationView {
    #[must_use]
    pub fn new<T>(page: &Page<T>, filter: &ProductFilter) -> Self {
        let links = page
            .window(PAGINATION_RADIUS)
            .into_iter()
            .map(|slot| match slot {
                PageSlot::Number(number) => PageLink {
                    number,
                    url: listing_url(&filter.with_page(number)),
                    is_current: number == page.page,
                    is_gap: false,
                },
                PageSlot::Gap => PageLink {
                    number: 0,
                    url: String::new(),
                    is_current: false,
                    is_gap: true,
                },
            })
            .collect();

        Self {
            links,
            prev_url: page
                .has_prev()
                .then(|| listing_url(&filter.with_page(page.page - 1))),
            next_url: page
                .has_next()
                .then(|| listing_url(&filter.with_page(page.page + 1))),
            page: page.page,
            total_pages: page.total_pages,
            total: page.total,
        }
    }

    /// Whether there is more than one page to navigate.
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.total_pages > 1
    }
}

/// Listing URL that reproduces `filter`.
///
/// Uses the storefront's own query names (not the API's) and omits defaults.
#[must_use]
pub fn listing_url(filter: &ProductFilter) -> String {
    let f = filter.normalized();
    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(search) = &f.search {
        params.push(("search", search.clone()));
    }
    if let Some(category) = &f.category {
        params.push(("category", category.clone()));
    }
    if let Some(min) = f.min_price {
        params.push(("min_price", min.normalize().to_string()));
    }
    if let Some(max) = f.max_price {
        params.push(("max_price", max.normalize().to_string()));
    }
    if f.in_stock_only {
        params.push(("in_stock", "1".to_string()));
    }
    if f.sort != SortOrder::default() {
        params.push(("sort", f.sort.as_str().to_string()));
    }
    if f.per_page != ProductFilter::default().per_page {
        params.push(("per_page", f.per_page.to_string()));
    }
    if f.page > 1 {
        params.push(("page", f.page.to_string()));
    }

    if params.is_empty() {
        return "/products".to_string();
    }
    let query = params
        .into_iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("/products?{query}")
}

// =============================================================================
// Query Types
// =============================================================================

/// Listing query parameters.
///
/// Everything arrives as text and is parsed leniently: a malformed price or
/// page number is ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListingQuery {
    /// Build the (normalized) product filter.
    #[must_use]
    pub fn to_filter(&self) -> ProductFilter {
        let defaults = ProductFilter::default();
        ProductFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            min_price: parse_price(self.min_price.as_deref()),
            max_price: parse_price(self.max_price.as_deref()),
            in_stock_only: self
                .in_stock
                .as_deref()
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "on")),
            sort: self
                .sort
                .as_deref()
                .map_or_else(SortOrder::default, SortOrder::parse_lenient),
            page: parse_number(self.page.as_deref()).unwrap_or(defaults.page),
            per_page: parse_number(self.per_page.as_deref()).unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}

fn parse_price(raw: Option<&str>) -> Option<Decimal> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Decimal::from_str(s.trim_start_matches('$')).ok())
}

fn parse_number(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
    pub filter: FilterView,
    pub pagination: PaginationView,
    pub notice: Option<Notice>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: Option<ProductView>,
    pub related_products: Vec<ProductView>,
    pub notice: Option<Notice>,
}

/// Quick view fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/quick_view.html")]
pub struct QuickViewTemplate {
    pub product: ProductView,
}

/// Inline error fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/error.html")]
pub struct ErrorFragmentTemplate {
    pub notice: Notice,
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
    pub message: String,
}

/// Render the 404 page.
#[must_use]
pub fn not_found(layout: Layout, message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            layout,
            message: message.into(),
        },
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display product listing page.
#[instrument(skip(state, layout))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let filter = query.to_filter();

    let (products, categories) = tokio::join!(
        state.api().list_products(&filter),
        state.api().list_categories()
    );

    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch categories: {e}");
        Vec::new()
    });

    let (page, notice) = match products {
        Ok(page) => (page, None),
        Err(e) => (
            Page::empty(),
            Some(Notice::from_api(&e, listing_url(&filter))),
        ),
    };

    ProductsIndexTemplate {
        layout,
        pagination: PaginationView::new(&page, &filter),
        products: page
            .items
            .iter()
            .map(|p| ProductView::new(p, state.shop().currency))
            .collect(),
        filter: FilterView::new(&filter, &categories),
        notice,
    }
}

/// Display product detail page.
#[instrument(skip(state, layout), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(id): Path<String>,
) -> Response {
    let id = ProductId::new(id);

    let product = match state.api().get_product(&id).await {
        Ok(product) => product,
        Err(ApiError::NotFound(_)) => {
            return not_found(layout, "We couldn't find that product.");
        }
        Err(e) => {
            return ProductShowTemplate {
                layout,
                product: None,
                related_products: Vec::new(),
                notice: Some(Notice::from_api(&e, product_url(&id))),
            }
            .into_response();
        }
    };

    let related_products = related(&state, &product).await;

    ProductShowTemplate {
        layout,
        product: Some(ProductView::new(&product, state.shop().currency)),
        related_products,
        notice: None,
    }
    .into_response()
}

/// Other products in the same category, best effort.
async fn related(state: &AppState, product: &Product) -> Vec<ProductView> {
    let filter = ProductFilter {
        category: Some(product.category.clone()),
        in_stock_only: true,
        per_page: RELATED_FETCH,
        ..ProductFilter::default()
    };

    match state.api().list_products(&filter).await {
        Ok(page) => page
            .items
            .iter()
            .filter(|p| p.id != product.id)
            .take(RELATED_PRODUCTS)
            .map(|p| ProductView::new(p, state.shop().currency))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to fetch related products: {e}");
            Vec::new()
        }
    }
}

/// Display quick view fragment (for HTMX).
#[instrument(skip(state), fields(product_id = %id))]
pub async fn quick_view(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = ProductId::new(id);

    match state.api().get_product(&id).await {
        Ok(product) => QuickViewTemplate {
            product: ProductView::new(&product, state.shop().currency),
        }
        .into_response(),
        Err(e) => {
            let status = if matches!(e, ApiError::NotFound(_)) {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::OK
            };
            (
                status,
                ErrorFragmentTemplate {
                    notice: Notice::from_api(&e, product_url(&id)),
                },
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListingQuery {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        parse_query(&encoded)
    }

    fn parse_query(raw: &str) -> ListingQuery {
        let uri: axum::http::Uri = format!("/products?{raw}").parse().unwrap();
        Query::<ListingQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_listing_query_is_lenient() {
        let filter = query(&[
            ("search", " mug "),
            ("min_price", "abc"),
            ("max_price", "$30"),
            ("page", "-4"),
            ("sort", "bogus"),
            ("in_stock", "on"),
        ])
        .to_filter();

        assert_eq!(filter.search.as_deref(), Some("mug"));
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(Decimal::from(30)));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.sort, SortOrder::Newest);
        assert!(filter.in_stock_only);
    }

    #[test]
    fn test_listing_query_swaps_inverted_range() {
        let filter = query(&[("min_price", "50"), ("max_price", "10")]).to_filter();
        assert_eq!(filter.min_price, Some(Decimal::from(10)));
        assert_eq!(filter.max_price, Some(Decimal::from(50)));
    }

    #[test]
    fn test_listing_url_round_trips() {
        let filter = query(&[
            ("search", "tea pot"),
            ("category", "kitchen & dining"),
            ("sort", "price_desc"),
            ("per_page", "24"),
            ("page", "3"),
        ])
        .to_filter();

        let url = listing_url(&filter);
        assert_eq!(
            url,
            "/products?search=tea%20pot&category=kitchen%20%26%20dining&sort=price_desc&per_page=24&page=3"
        );

        let reparsed = parse_query(url.trim_start_matches("/products?")).to_filter();
        assert_eq!(reparsed, filter);
    }

    #[test]
    fn test_listing_url_without_filters() {
        assert_eq!(listing_url(&ProductFilter::default()), "/products");
    }

    #[test]
    fn test_pagination_view() {
        let page = Page {
            items: Vec::<()>::new(),
            page: 5,
            total_pages: 10,
            total: 120,
        };
        let filter = ProductFilter::default().with_page(5);
        let view = PaginationView::new(&page, &filter);

        assert!(view.is_paged());
        assert_eq!(view.prev_url.as_deref(), Some("/products?page=4"));
        assert_eq!(view.next_url.as_deref(), Some("/products?page=6"));

        let current: Vec<u32> = view
            .links
            .iter()
            .filter(|l| l.is_current)
            .map(|l| l.number)
            .collect();
        assert_eq!(current, vec![5]);
        assert_eq!(view.links.first().map(|l| l.number), Some(1));
        assert_eq!(view.links.last().map(|l| l.number), Some(10));
        assert!(view.links.iter().any(|l| l.is_gap));
    }

    #[test]
    fn test_pagination_keeps_page_size() {
        let filter = query(&[("per_page", "24"), ("page", "2")]).to_filter();
        let page = Page {
            items: Vec::<()>::new(),
            page: 2,
            total_pages: 4,
            total: 90,
        };
        let view = PaginationView::new(&page, &filter);

        let next = view.next_url.unwrap();
        assert_eq!(next, "/products?per_page=24&page=3");
        let reparsed = parse_query(next.trim_start_matches("/products?")).to_filter();
        assert_eq!(reparsed.per_page, 24);
        assert_eq!(reparsed.page, 3);
        assert_eq!(view.prev_url.as_deref(), Some("/products?per_page=24"));
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let page = Page {
            items: Vec::<()>::new(),
            page: 1,
            total_pages: 1,
            total: 3,
        };
        let view = PaginationView::new(&page, &ProductFilter::default());
        assert!(view.prev_url.is_none());
        assert!(view.next_url.is_none());
        assert!(!view.is_paged());
    }

    #[test]
    fn test_filter_view_marks_selection() {
        let filter = ProductFilter {
            category: Some("prints".to_string()),
            sort: SortOrder::NameAsc,
            ..ProductFilter::default()
        };
        let view = FilterView::new(&filter, &["mugs".to_string(), "prints".to_string()]);

        let selected: Vec<&str> = view
            .categories
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(selected, vec!["prints"]);
        assert!(view.sorts.iter().any(|s| s.selected && s.value == "name_asc"));
        assert!(view.is_filtered);
    }

    fn product(stock: u32, promo: Option<Decimal>) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Enamel Mug".to_string(),
            description: "Holds coffee.".to_string(),
            price: Decimal::from(40),
            promo_price: promo,
            image: Some("  ".to_string()),
            stock,
            category: "mugs".to_string(),
        }
    }

    #[test]
    fn test_product_view_on_sale_and_low_stock() {
        let view = ProductView::new(&product(3, Some(Decimal::from(30))), CurrencyCode::USD);

        assert_eq!(view.price, "$30.00");
        assert_eq!(view.regular_price.as_deref(), Some("$40.00"));
        assert_eq!(view.discount_label.as_deref(), Some("-25%"));
        assert_eq!(view.stock_label, "Only 3 left");
        assert!(view.low_stock);
        assert!(view.in_stock);
        assert!(view.image.is_none());
    }

    #[test]
    fn test_product_view_out_of_stock() {
        let view = ProductView::new(&product(0, None), CurrencyCode::GBP);

        assert_eq!(view.price, "£40.00");
        assert!(view.regular_price.is_none());
        assert!(!view.in_stock);
        assert_eq!(view.stock_label, "Out of stock");
    }

    #[test]
    fn test_product_url_encodes_id() {
        assert_eq!(product_url(&ProductId::new("a b")), "/products/a%20b");
    }
}
