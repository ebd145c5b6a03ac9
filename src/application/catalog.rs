//! Catalog service: cached reads and invalidating writes.
//!
//! Reads go through the object store; writes go straight to the upstream
//! backend, then invalidate and notify. The post-write re-fetch of the
//! canonical record deliberately bypasses the store, so a write leaves
//! behind exactly what invalidation decided and nothing else.

use std::sync::Arc;

use tracing::debug;
use vetrina_api_types::{Product, ProductDraft, ProductPage, ProductPatch};

use crate::application::error::CatalogError;
use crate::cache::{ObjectKey, ObjectStore, WebhookNotifier, WriteInvalidator};
use crate::domain::products::{ListQuery, SaveKind};
use crate::infra::upstream::CatalogClient;

pub struct CatalogService {
    upstream: CatalogClient,
    store: Arc<ObjectStore>,
    invalidator: WriteInvalidator,
    notifier: Arc<WebhookNotifier>,
}

impl CatalogService {
    pub fn new(
        upstream: CatalogClient,
        store: Arc<ObjectStore>,
        invalidator: WriteInvalidator,
        notifier: Arc<WebhookNotifier>,
    ) -> Self {
        Self {
            upstream,
            store,
            invalidator,
            notifier,
        }
    }

    /// One listing page, served from the object store while its TTL holds.
    pub async fn list_products(&self, query: ListQuery) -> Result<ProductPage, CatalogError> {
        let key = ObjectKey::list(query.page, query.per_page, query.filter.clone());
        let page = self
            .store
            .fetch_list(key, || self.upstream.list(&query))
            .await?;
        Ok(page)
    }

    /// One product by id, served from the object store while its TTL holds.
    pub async fn get_product(&self, id: u64) -> Result<Product, CatalogError> {
        let product = self
            .store
            .fetch_product(ObjectKey::Product(id), || self.upstream.get(id))
            .await?;
        Ok(product)
    }

    /// One product by slug. Cached under its own key; a later update to the
    /// product invalidates the id entry only, so this entry rides out its
    /// TTL.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        let key = ObjectKey::ProductSlug(slug.to_string());
        let product = self
            .store
            .fetch_product(key, || self.upstream.get_by_slug(slug))
            .await?;
        Ok(product)
    }

    /// Free-text search. Never cached; a blank term returns an empty result
    /// without an upstream round trip.
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.upstream.search(term).await?)
    }

    pub async fn create_product(
        &self,
        draft: ProductDraft,
        save: SaveKind,
    ) -> Result<Product, CatalogError> {
        let created = self.upstream.create(&draft).await?;
        self.invalidator.product_created(created.id);
        self.notifier.product_saved(created.id, save, false);
        debug!(product_id = created.id, "Product created");
        self.canonical(created.id).await
    }

    pub async fn update_product(
        &self,
        id: u64,
        patch: ProductPatch,
        save: SaveKind,
    ) -> Result<Product, CatalogError> {
        if patch.is_empty() {
            return Err(CatalogError::validation("update patch has no fields"));
        }
        self.upstream.update(id, &patch).await?;
        self.invalidator.product_updated(id);
        self.notifier.product_saved(id, save, true);
        debug!(product_id = id, "Product updated");
        self.canonical(id).await
    }

    pub async fn delete_product(&self, id: u64) -> Result<(), CatalogError> {
        self.upstream.delete(id).await?;
        self.invalidator.product_deleted(id);
        self.notifier.product_deleted(id);
        debug!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Post-write read of the canonical record, bypassing the store.
    async fn canonical(&self, id: u64) -> Result<Product, CatalogError> {
        Ok(self.upstream.get(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use reqwest::Url;
    use vetrina_api_types::ListFilter;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::infra::upstream::{DEFAULT_UPSTREAM_TIMEOUT, UpstreamError};

    fn service(base: &str) -> (CatalogService, Arc<ObjectStore>) {
        let store = Arc::new(ObjectStore::new(CacheConfig::default()));
        let upstream = CatalogClient::new(
            Url::parse(base).expect("base url"),
            DEFAULT_UPSTREAM_TIMEOUT,
        )
        .expect("client");
        let invalidator = WriteInvalidator::new(CacheConfig::default(), store.clone());
        let notifier =
            Arc::new(WebhookNotifier::new(None, "abc".to_string()).expect("notifier"));
        (
            CatalogService::new(upstream, store.clone(), invalidator, notifier),
            store,
        )
    }

    const PRODUCT_BODY: &str =
        r#"{"id":5,"title":{"rendered":"Blue Mug"},"price":9.5,"sku":"MUG-1","stock":4}"#;

    #[tokio::test]
    async fn repeated_list_reads_hit_upstream_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200)
                    .header("content-type", "application/json")
                    .header("x-wp-total", "1")
                    .header("x-wp-totalpages", "1")
                    .body(format!("[{PRODUCT_BODY}]"));
            })
            .await;

        let (service, _) = service(&server.base_url());
        for _ in 0..3 {
            let page = service.list_products(ListQuery::default()).await.unwrap();
            assert_eq!(page.total, 1);
        }

        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn distinct_queries_cache_independently() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("[]");
            })
            .await;

        let (service, store) = service(&server.base_url());
        service.list_products(ListQuery::default()).await.unwrap();
        service
            .list_products(ListQuery::new(Some(2), None, ListFilter::default()))
            .await
            .unwrap();

        assert_eq!(mock.hits_async().await, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn failed_reads_cache_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/5");
                then.status(500)
                    .header("content-type", "application/json")
                    .body(r#"{"code":"internal"}"#);
            })
            .await;

        let (service, store) = service(&server.base_url());
        let error = service.get_product(5).await.unwrap_err();

        assert!(matches!(
            error,
            CatalogError::Upstream(UpstreamError::Status { status: 500, .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_leaves_the_store_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(format!("[{PRODUCT_BODY}]"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/products");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(PRODUCT_BODY);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/5");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(PRODUCT_BODY);
            })
            .await;

        let (service, store) = service(&server.base_url());
        service.list_products(ListQuery::default()).await.unwrap();
        assert_eq!(store.len(), 1);

        let draft = ProductDraft {
            title: "Blue Mug".to_string(),
            price: 9.5,
            sku: "MUG-1".to_string(),
            stock: 4,
            status: Default::default(),
            content: None,
            excerpt: None,
        };
        let created = service
            .create_product(draft, SaveKind::Manual)
            .await
            .unwrap();

        assert_eq!(created.id, 5);
        // The canonical re-fetch bypasses the store; nothing repopulates it.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_invalidates_the_id_entry() {
        let server = MockServer::start_async().await;
        let get_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/products/5");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(PRODUCT_BODY);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/products/5");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(PRODUCT_BODY);
            })
            .await;

        let (service, _) = service(&server.base_url());

        // Warm the entry, then write. The canonical re-fetch plus the
        // post-update read each go upstream, so a served-from-cache stale
        // read would show as two hits instead of three.
        service.get_product(5).await.unwrap();
        service.get_product(5).await.unwrap();
        assert_eq!(get_mock.hits_async().await, 1);

        let patch = ProductPatch {
            price: Some(11.0),
            ..Default::default()
        };
        service
            .update_product(5, patch, SaveKind::Manual)
            .await
            .unwrap();
        service.get_product(5).await.unwrap();

        assert_eq!(get_mock.hits_async().await, 3);
    }

    #[tokio::test]
    async fn empty_patch_is_rejected_before_any_upstream_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/products/5");
                then.status(200);
            })
            .await;

        let (service, _) = service(&server.base_url());
        let error = service
            .update_product(5, ProductPatch::default(), SaveKind::Manual)
            .await
            .unwrap_err();

        assert!(matches!(error, CatalogError::Validation(_)));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn delete_invalidates_and_reports_missing_products() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/products/5");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(PRODUCT_BODY);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/products/5")
                    .query_param("force", "true");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"deleted":true}"#);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/products/6");
                then.status(404)
                    .header("content-type", "application/json")
                    .body(r#"{"code":"rest_post_invalid_id"}"#);
            })
            .await;

        let (service, store) = service(&server.base_url());
        service.get_product(5).await.unwrap();
        assert_eq!(store.len(), 1);

        service.delete_product(5).await.unwrap();
        assert!(store.is_empty());

        let error = service.delete_product(6).await.unwrap_err();
        assert!(matches!(
            error,
            CatalogError::Upstream(UpstreamError::NotFound)
        ));
    }

    #[tokio::test]
    async fn blank_search_terms_short_circuit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/products");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("[]");
            })
            .await;

        let (service, _) = service(&server.base_url());
        assert!(service.search_products("  ").await.unwrap().is_empty());
        assert_eq!(mock.hits_async().await, 0);

        service.search_products("mug").await.unwrap();
        assert_eq!(mock.hits_async().await, 1);
    }
}
