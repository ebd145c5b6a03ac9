//! Upstream catalog client.
//!
//! Speaks the backend's WordPress-style REST dialect: `products` routes,
//! pagination totals in `x-wp-total` / `x-wp-totalpages` headers, title
//! fields that arrive either plain or wrapped in `{ rendered }`. Reads stay
//! tolerant of partial records; writes send the strict typed records.

use std::time::{Duration, Instant};

use metrics::histogram;
use reqwest::{Client, Method, Response, StatusCode, Url, header::HeaderMap};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use thiserror::Error;
use tracing::debug;
use vetrina_api_types::{Product, ProductDraft, ProductPage, ProductPatch};

use crate::domain::products::ListQuery;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Machine-readable error codes for upstream failures. Stable across
/// releases; clients should branch on these rather than on messages.
pub mod codes {
    pub const UPSTREAM_UNREACHABLE: &str = "upstream_unreachable";
    pub const UPSTREAM_INVALID_RESPONSE: &str = "upstream_invalid_response";
    pub const UPSTREAM_STATUS: &str = "upstream_status";
    pub const PRODUCT_NOT_FOUND: &str = "product_not_found";
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("upstream returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },
    #[error("product not found")]
    NotFound,
}

impl UpstreamError {
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable(_) => codes::UPSTREAM_UNREACHABLE,
            UpstreamError::InvalidResponse(_) => codes::UPSTREAM_INVALID_RESPONSE,
            UpstreamError::Status { .. } => codes::UPSTREAM_STATUS,
            UpstreamError::NotFound => codes::PRODUCT_NOT_FOUND,
        }
    }
}

/// HTTP client for the catalog backend. One instance per process, cloned
/// cheaply wherever needed.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base: Url,
}

impl CatalogClient {
    /// `base` points at the backend's REST root, e.g.
    /// `http://backend.local/wp-json/wp/v2`.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vetrina/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    /// One page of products matching `query`.
    pub async fn list(&self, query: &ListQuery) -> Result<ProductPage, UpstreamError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
            ("_embed", "true".to_string()),
        ];
        push_filter_params(&mut params, query);

        let response = self
            .execute(Method::GET, self.endpoint("products"), Some(&params), None::<&()>)
            .await?;
        let response = ensure_success(response).await?;
        let (total, total_pages) = read_totals(response.headers());
        let raw: Vec<RawProduct> = decode(response).await?;

        Ok(ProductPage {
            data: raw.into_iter().map(Product::from).collect(),
            total,
            total_pages,
        })
    }

    pub async fn get(&self, id: u64) -> Result<Product, UpstreamError> {
        let response = self
            .execute(
                Method::GET,
                self.endpoint(&format!("products/{id}")),
                None::<&()>,
                None::<&()>,
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        let raw: RawProduct = decode(ensure_success(response).await?).await?;
        Ok(raw.into())
    }

    /// Slug lookups go through the list endpoint; an empty result set means
    /// the product does not exist.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, UpstreamError> {
        let params = [
            ("slug", slug.to_string()),
            ("_embed", "true".to_string()),
        ];
        let response = self
            .execute(Method::GET, self.endpoint("products"), Some(&params), None::<&()>)
            .await?;
        let raw: Vec<RawProduct> = decode(ensure_success(response).await?).await?;
        raw.into_iter()
            .next()
            .map(Product::from)
            .ok_or(UpstreamError::NotFound)
    }

    /// Free-text search, capped at ten results like the backend's own
    /// search box.
    pub async fn search(&self, term: &str) -> Result<Vec<Product>, UpstreamError> {
        let params = [
            ("search", term.to_string()),
            ("per_page", "10".to_string()),
            ("_embed", "true".to_string()),
        ];
        let response = self
            .execute(Method::GET, self.endpoint("products"), Some(&params), None::<&()>)
            .await?;
        let raw: Vec<RawProduct> = decode(ensure_success(response).await?).await?;
        Ok(raw.into_iter().map(Product::from).collect())
    }

    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, UpstreamError> {
        let response = self
            .execute(
                Method::POST,
                self.endpoint("products"),
                None::<&()>,
                Some(draft),
            )
            .await?;
        let raw: RawProduct = decode(ensure_success(response).await?).await?;
        Ok(raw.into())
    }

    /// Partial update. The backend treats POST on an existing id as an
    /// update.
    pub async fn update(&self, id: u64, patch: &ProductPatch) -> Result<Product, UpstreamError> {
        let response = self
            .execute(
                Method::POST,
                self.endpoint(&format!("products/{id}")),
                None::<&()>,
                Some(patch),
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        let raw: RawProduct = decode(ensure_success(response).await?).await?;
        Ok(raw.into())
    }

    /// Hard delete, skipping the backend's trash state.
    pub async fn delete(&self, id: u64) -> Result<(), UpstreamError> {
        let params = [("force", "true".to_string())];
        let response = self
            .execute(
                Method::DELETE,
                self.endpoint(&format!("products/{id}")),
                Some(&params),
                None::<&()>,
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        ensure_success(response).await?;
        Ok(())
    }

    fn endpoint(&self, tail: &str) -> String {
        format!("{}/{tail}", self.base.as_str().trim_end_matches('/'))
    }

    async fn execute<Q, B>(
        &self,
        method: Method,
        url: String,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Response, UpstreamError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut request = self.client.request(method.clone(), &url);
        if let Some(params) = query {
            request = request.query(params);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let started = Instant::now();
        let result = request.send().await;
        histogram!("vetrina_upstream_request_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(response) => {
                debug!(method = %method, url, status = response.status().as_u16(), "upstream request");
                Ok(response)
            }
            Err(error) => {
                debug!(method = %method, url, error = %error, "upstream request failed");
                Err(UpstreamError::Unreachable(error))
            }
        }
    }
}

fn push_filter_params(params: &mut Vec<(&'static str, String)>, query: &ListQuery) {
    let filter = &query.filter;
    if let Some(search) = &filter.search {
        params.push(("search", search.clone()));
    }
    if let Some(category) = &filter.category {
        params.push(("category", category.clone()));
    }
    if let Some(tag) = &filter.tag {
        params.push(("tag", tag.clone()));
    }
    if let Some(orderby) = &filter.orderby {
        params.push(("orderby", orderby.clone()));
    }
    if let Some(order) = &filter.order {
        params.push(("order", order.clone()));
    }
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    // A backend behind a misconfigured host serves HTML (login or install
    // pages) with a 200; the content type is the tell.
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.is_empty() && !content_type.contains("json") {
        return Err(UpstreamError::InvalidResponse(format!(
            "unexpected content type {content_type}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|error| UpstreamError::InvalidResponse(format!("failed to read body: {error}")))?;
    serde_json::from_slice(&bytes).map_err(|error| {
        UpstreamError::InvalidResponse(format!("failed to decode body: {error}"))
    })
}

fn read_totals(headers: &HeaderMap) -> (u64, u64) {
    (
        header_count(headers, "x-wp-total"),
        header_count(headers, "x-wp-totalpages"),
    )
}

fn header_count(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Wire shape of one upstream product. Tolerant on read: the title arrives
/// plain or `{ rendered }`, commerce fields may be absent or null.
#[derive(Debug, Deserialize)]
struct RawProduct {
    id: u64,
    #[serde(default)]
    title: RawTitle,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTitle {
    Plain(String),
    Rendered { rendered: String },
}

impl Default for RawTitle {
    fn default() -> Self {
        RawTitle::Plain(String::new())
    }
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        Product {
            id: raw.id,
            title: match raw.title {
                RawTitle::Plain(title) => title,
                RawTitle::Rendered { rendered } => rendered,
            },
            price: raw.price.unwrap_or(0.0),
            sku: raw.sku.unwrap_or_default(),
            stock: raw.stock.unwrap_or(0),
        }
    }
}
