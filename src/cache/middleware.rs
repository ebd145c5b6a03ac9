//! Page cache middleware.
//!
//! Caches successful GET responses on public routes and serves them until a
//! revalidation drops the path or the process restarts.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::page::should_store_response;
use super::{CacheConfig, PageKey, PageStore};

/// Shared state for the page cache middleware.
#[derive(Clone)]
pub struct PageCacheState {
    pub config: CacheConfig,
    pub pages: Arc<PageStore>,
}

/// Middleware for rendered-page caching.
///
/// Only GET requests participate; only plain 200 responses are stored.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.page_cache_enabled {
        return next.run(request).await;
    }

    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::new(
        request.uri().path().to_string(),
        request.uri().query().unwrap_or("").to_string(),
    );

    if let Some(cached) = cache.pages.get(&key).await {
        counter!("vetrina_cache_page_hit_total").increment(1);
        debug!(cache = "page", outcome = "hit", "serving cached response");
        return cached;
    }

    counter!("vetrina_cache_page_miss_total").increment(1);
    debug!(
        cache = "page",
        outcome = "miss",
        "cache miss, executing handler"
    );

    let response = next.run(request).await;

    if !should_store_response(&response) {
        return response;
    }

    match cache.pages.store_response(key, response).await {
        Ok(rebuilt) => rebuilt,
        Err((rebuilt, error)) => {
            // The response still goes out; only the cache write is lost.
            warn!(error = %error, "failed to buffer response for page cache");
            rebuilt
        }
    }
}
