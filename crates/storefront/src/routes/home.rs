//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use harbor_core::ProductFilter;

use super::layout::{Layout, Notice};
use super::products::{ProductView, listing_url};
use crate::filters;
use crate::state::AppState;

/// Products shown in the featured grid.
const FEATURED_PRODUCTS: u32 = 8;

/// A category link on the home page.
#[derive(Clone, Debug)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured_products: Vec<ProductView>,
    pub categories: Vec<CategoryLink>,
    pub notice: Option<Notice>,
}

/// Display the home page: the newest products plus category shortcuts.
#[instrument(skip(state, layout))]
pub async fn home(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let filter = ProductFilter {
        per_page: FEATURED_PRODUCTS,
        ..ProductFilter::default()
    };

    let (products, categories) = tokio::join!(
        state.api().list_products(&filter),
        state.api().list_categories()
    );

    let currency = state.shop().currency;
    let (featured_products, notice) = match products {
        Ok(page) => (
            page.items
                .iter()
                .map(|p| ProductView::new(p, currency))
                .collect(),
            None,
        ),
        Err(e) => (Vec::new(), Some(Notice::from_api(&e, "/"))),
    };

    let categories = categories
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch categories: {e}");
            Vec::new()
        })
        .into_iter()
        .map(|name| CategoryLink {
            url: listing_url(&ProductFilter {
                category: Some(name.clone()),
                ..ProductFilter::default()
            }),
            name,
        })
        .collect();

    HomeTemplate {
        layout,
        featured_products,
        categories,
        notice,
    }
}
