//! Write invalidation.
//!
//! Invoked synchronously right after each successful write against the
//! upstream catalog. Create clears the whole object store; update and
//! delete drop only the single-entity entry and leave list entries (and the
//! slug-keyed entry) to their TTL. That asymmetry matches the backend's
//! observed behavior: a list view may stay stale for up to the list TTL
//! after an update or delete.
//!
//! # Usage
//!
//! ```ignore
//! // After a successful product update:
//! invalidator.product_updated(product.id);
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use super::config::CacheConfig;
use super::keys::ObjectKey;
use super::store::ObjectStore;

pub struct WriteInvalidator {
    config: CacheConfig,
    store: Arc<ObjectStore>,
}

impl WriteInvalidator {
    pub fn new(config: CacheConfig, store: Arc<ObjectStore>) -> Self {
        Self { config, store }
    }

    /// A product was created upstream: clear everything, since any list
    /// page may now be missing the new item.
    pub fn product_created(&self, id: u64) {
        if self.skipped("create", id) {
            return;
        }
        self.store.clear();
        info!(op = "create", product_id = id, scope = "store", "Invalidated object cache");
    }

    /// A product was updated upstream: drop its id entry only.
    pub fn product_updated(&self, id: u64) {
        if self.skipped("update", id) {
            return;
        }
        self.store.remove(&ObjectKey::Product(id));
        info!(op = "update", product_id = id, scope = "entity", "Invalidated object cache");
    }

    /// A product was deleted upstream: drop its id entry only.
    pub fn product_deleted(&self, id: u64) {
        if self.skipped("delete", id) {
            return;
        }
        self.store.remove(&ObjectKey::Product(id));
        info!(op = "delete", product_id = id, scope = "entity", "Invalidated object cache");
    }

    fn skipped(&self, op: &'static str, id: u64) -> bool {
        if self.config.enabled {
            return false;
        }
        debug!(op, product_id = id, "Write invalidation skipped: object cache disabled");
        true
    }
}
