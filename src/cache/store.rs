//! Cache storage implementations.
//!
//! `TtlCache` is the unbounded map primitive with per-entry write
//! timestamps; `ObjectStore` composes two typed maps (single products,
//! list pages) and applies the configured per-resource TTLs.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::debug;
use vetrina_api_types::{Product, ProductPage};

use super::config::CacheConfig;
use super::keys::ObjectKey;
use super::lock::{read_guard, write_guard};

const SOURCE: &str = "cache::store";

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Unbounded key/value map with TTL-at-read validity.
///
/// An entry is served only while `now - stored_at < ttl`; past that it is a
/// logical miss but stays physically present until overwritten or removed.
/// There is no single-flight guard: callers racing on the same cold key each
/// invoke their producer and the last result wins.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a live entry. Expired entries are misses and are left in
    /// place.
    pub fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = read_guard(&self.entries, SOURCE, "get");
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Store a value under `key` with the current timestamp, replacing any
    /// previous entry.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = write_guard(&self.entries, SOURCE, "insert");
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) {
        write_guard(&self.entries, SOURCE, "remove").remove(key);
    }

    pub fn clear(&self) {
        write_guard(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of physically present entries, live or expired.
    pub fn len(&self) -> usize {
        read_guard(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-through fetch: serve a live entry, otherwise invoke `producer`,
    /// store its result under `key`, and return it.
    ///
    /// Producer failures propagate unchanged and cache nothing. The guard is
    /// never held across the producer await, so concurrent same-key misses
    /// run their producers redundantly rather than queueing.
    pub async fn fetch_with_cache<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        producer: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key, ttl) {
            return Ok(value);
        }
        let value = producer().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Object store: catalog data
// ============================================================================

/// Object cache for catalog data.
///
/// Two keyspaces share the `ObjectKey` type: single products (by id or
/// slug) and list pages. Constructed once at startup and injected wherever
/// reads or invalidation happen.
pub struct ObjectStore {
    config: CacheConfig,
    products: TtlCache<ObjectKey, Product>,
    lists: TtlCache<ObjectKey, ProductPage>,
}

impl ObjectStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            products: TtlCache::new(),
            lists: TtlCache::new(),
        }
    }

    /// Read-through fetch of a single product under the product TTL.
    pub async fn fetch_product<F, Fut, E>(&self, key: ObjectKey, producer: F) -> Result<Product, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Product, E>>,
    {
        if !self.config.enabled {
            return producer().await;
        }
        let produced = AtomicBool::new(false);
        let result = self
            .products
            .fetch_with_cache(key.clone(), self.config.product_ttl(), || {
                produced.store(true, Ordering::Relaxed);
                producer()
            })
            .await;
        self.note_outcome("product", &key, !produced.load(Ordering::Relaxed));
        result
    }

    /// Read-through fetch of a list page under the list TTL.
    pub async fn fetch_list<F, Fut, E>(&self, key: ObjectKey, producer: F) -> Result<ProductPage, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProductPage, E>>,
    {
        if !self.config.enabled {
            return producer().await;
        }
        let produced = AtomicBool::new(false);
        let result = self
            .lists
            .fetch_with_cache(key.clone(), self.config.list_ttl(), || {
                produced.store(true, Ordering::Relaxed);
                producer()
            })
            .await;
        self.note_outcome("list", &key, !produced.load(Ordering::Relaxed));
        result
    }

    /// Drop the entry for one key, in whichever keyspace it lives.
    pub fn remove(&self, key: &ObjectKey) {
        match key {
            ObjectKey::Product(_) | ObjectKey::ProductSlug(_) => self.products.remove(key),
            ObjectKey::ProductList { .. } => self.lists.remove(key),
        }
    }

    /// Clear all cached data.
    pub fn clear(&self) {
        self.products.clear();
        self.lists.clear();
    }

    /// Total physically present entries across both keyspaces.
    pub fn len(&self) -> usize {
        self.products.len() + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn note_outcome(&self, keyspace: &'static str, key: &ObjectKey, hit: bool) {
        if hit {
            counter!("vetrina_cache_object_hit_total").increment(1);
            debug!(cache = "object", keyspace, key = %key, outcome = "hit", "object cache hit");
        } else {
            counter!("vetrina_cache_object_miss_total").increment(1);
            debug!(cache = "object", keyspace, key = %key, outcome = "miss", "object cache miss");
        }
    }
}
