mod error;
mod middleware;
mod products;
mod revalidate;

pub use error::ApiError;
pub use products::CatalogState;
pub use revalidate::RevalidateState;

use axum::extract::FromRef;
use axum::routing::{get, patch, post};
use axum::{Router, middleware as axum_middleware};

use crate::cache::{PageCacheState, page_cache_layer};

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogState,
    pub revalidate: RevalidateState,
    pub page_cache: Option<PageCacheState>,
}

impl FromRef<AppState> for CatalogState {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for RevalidateState {
    fn from_ref(state: &AppState) -> Self {
        state.revalidate.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    // Public read routes participate in the page cache; everything else is
    // served fresh on every request.
    let cached_routes = Router::new()
        .route("/", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/products/slug/{slug}", get(products::get_product_by_slug));

    let cached_routes = if let Some(page_cache) = state.page_cache.clone() {
        cached_routes.layer(axum_middleware::from_fn_with_state(
            page_cache,
            page_cache_layer,
        ))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new()
        .route("/search", get(products::search_products))
        .route("/healthz", get(products::healthz))
        .route("/api/products", post(products::create_product))
        .route(
            "/api/products/{id}",
            patch(products::update_product).delete(products::delete_product),
        )
        .route("/api/revalidate", post(revalidate::revalidate));

    cached_routes
        .merge(uncached_routes)
        .fallback(not_found_fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
}

async fn not_found_fallback() -> ApiError {
    ApiError::not_found("Route not found")
}
