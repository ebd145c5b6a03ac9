//! Cache configuration.
//!
//! Controls the object store and the rendered-page cache via `vetrina.toml`.

use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_LIST_TTL_SECONDS: u64 = 300;
const DEFAULT_PRODUCT_TTL_SECONDS: u64 = 1800;

/// Cache configuration from `vetrina.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the object (data) cache.
    pub enabled: bool,
    /// Enable the rendered-page (response) cache.
    pub page_cache_enabled: bool,
    /// Validity window for cached list queries, in seconds.
    pub list_ttl_seconds: u64,
    /// Validity window for cached single products, in seconds.
    pub product_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_cache_enabled: true,
            list_ttl_seconds: DEFAULT_LIST_TTL_SECONDS,
            product_ttl_seconds: DEFAULT_PRODUCT_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_cache_enabled: settings.page_cache_enabled,
            list_ttl_seconds: settings.list_ttl_seconds,
            product_ttl_seconds: settings.product_ttl_seconds,
        }
    }
}

impl CacheConfig {
    /// Validity window applied to list-query entries.
    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_seconds)
    }

    /// Validity window applied to single-product entries.
    pub fn product_ttl(&self) -> Duration {
        Duration::from_secs(self.product_ttl_seconds)
    }
}
