//! Rendered-page cache.
//!
//! Buffers successful responses keyed by request path and query, and drops
//! them again per path when a revalidation arrives. Longer-lived than the
//! object store and invalidated through an independent trigger chain.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::sync::RwLock;

use super::keys::PageKey;

#[derive(Clone, Default)]
pub struct PageStore {
    entries: Arc<RwLock<HashMap<PageKey, CachedResponse>>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &PageKey) -> Option<Response<Body>> {
        let guard = self.entries.read().await;
        guard.get(key).cloned().map(CachedResponse::into_response)
    }

    pub async fn put(&self, key: PageKey, response: CachedResponse) {
        let mut guard = self.entries.write().await;
        guard.insert(key, response);
    }

    /// Buffer `response`, store it under `key`, and hand back an equivalent
    /// response for the caller to return.
    pub async fn store_response(
        &self,
        key: PageKey,
        response: Response,
    ) -> Result<Response, (Response, PageStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, cached)) => {
                self.put(key, cached).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Drop every entry for `path`, across all query variants. Returns the
    /// number of entries removed; removing nothing is not an error.
    pub async fn invalidate_path(&self, path: &str) -> usize {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|key, _| key.path != path);
        before - guard.len()
    }

    /// Empty the store outright. Startup-equivalent state for deploys that
    /// want a clean slate without restarting.
    pub async fn invalidate_all(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True when an entry is stored for exactly this path+query pair.
    pub async fn contains(&self, key: &PageKey) -> bool {
        self.entries.read().await.contains_key(key)
    }
}

/// Invalidation seam for the revalidation endpoint.
///
/// The in-process store cannot fail here, but the endpoint contract reserves
/// a failure branch, and the seam lets tests observe whether invalidation
/// was reached at all.
#[async_trait]
pub trait PageInvalidator: Send + Sync {
    async fn invalidate_path(&self, path: &str) -> Result<usize, PageStoreError>;
}

#[async_trait]
impl PageInvalidator for PageStore {
    async fn invalidate_path(&self, path: &str) -> Result<usize, PageStoreError> {
        Ok(PageStore::invalidate_path(self, path).await)
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &axum::http::HeaderMap, body: Bytes) -> Self {
        let mut stored_headers = Vec::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            stored_headers.push((name.clone(), value.clone()));
        }

        Self {
            status,
            headers: stored_headers,
            body,
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum PageStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

pub fn should_store_response(response: &Response) -> bool {
    use axum::http::header;

    if response.status() != StatusCode::OK {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    true
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, PageStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, PageStoreError::Buffer(error.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use super::*;

    fn cached_body(text: &str) -> CachedResponse {
        CachedResponse::new(StatusCode::OK, &HeaderMap::new(), Bytes::from(text.to_string()))
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = PageStore::new();
        let key = PageKey::new("/products/5", "");

        assert!(store.get(&key).await.is_none());

        store.put(key.clone(), cached_body("detail page")).await;

        let response = store.get(&key).await.expect("cached response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalidate_path_drops_every_query_variant() {
        let store = PageStore::new();
        store.put(PageKey::new("/", ""), cached_body("page 1")).await;
        store
            .put(PageKey::new("/", "page=2"), cached_body("page 2"))
            .await;
        store
            .put(PageKey::new("/products/5", ""), cached_body("detail"))
            .await;

        let removed = store.invalidate_path("/").await;
        assert_eq!(removed, 2);
        assert!(store.get(&PageKey::new("/", "")).await.is_none());
        assert!(store.get(&PageKey::new("/", "page=2")).await.is_none());
        assert!(store.get(&PageKey::new("/products/5", "")).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_path_is_idempotent() {
        let store = PageStore::new();
        store.put(PageKey::new("/", ""), cached_body("home")).await;

        assert_eq!(store.invalidate_path("/").await, 1);
        assert_eq!(store.invalidate_path("/").await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn invalidate_all_empties_the_store() {
        let store = PageStore::new();
        store.put(PageKey::new("/", ""), cached_body("home")).await;
        store
            .put(PageKey::new("/products/5", ""), cached_body("detail"))
            .await;

        store.invalidate_all().await;
        store.invalidate_all().await;
        assert!(store.is_empty().await);
    }

    #[test]
    fn only_plain_ok_responses_are_stored() {
        let ok = Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap();
        assert!(should_store_response(&ok));

        let created = Response::builder()
            .status(StatusCode::CREATED)
            .body(Body::empty())
            .unwrap();
        assert!(!should_store_response(&created));

        let not_found = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
        assert!(!should_store_response(&not_found));

        let with_cookie = Response::builder()
            .status(StatusCode::OK)
            .header("set-cookie", "session=1")
            .body(Body::empty())
            .unwrap();
        assert!(!should_store_response(&with_cookie));
    }

    #[tokio::test]
    async fn buffered_response_preserves_status_and_body() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"id":5}"#))
            .unwrap();

        let (rebuilt, cached) = buffer_response(response).await.expect("buffered");
        assert_eq!(rebuilt.status(), StatusCode::OK);

        let served = cached.into_response();
        assert_eq!(served.status(), StatusCode::OK);
        let bytes = BodyExt::collect(served.into_body()).await.unwrap().to_bytes();
        assert_eq!(bytes, Bytes::from(r#"{"id":5}"#));
    }
}
