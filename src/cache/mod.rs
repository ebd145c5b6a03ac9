//! Vetrina Cache System
//!
//! Provides two-layer caching for the catalog gateway:
//!
//! - **Object store**: caches catalog data (single products and list pages)
//!   with per-entry write timestamps and TTL-at-read validity
//! - **Page store**: caches rendered HTTP responses per path
//!
//! The layers are not synchronized with each other. A committed write
//! reaches the object store synchronously through [`WriteInvalidator`] and
//! the page store asynchronously through the revalidation webhook
//! ([`WebhookNotifier`] on the sending side, `POST /api/revalidate` on the
//! receiving side).
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `vetrina.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_cache_enabled = true
//! list_ttl_seconds = 300
//! product_ttl_seconds = 1800
//! ```

mod config;
mod invalidator;
mod keys;
mod lock;
mod middleware;
mod notifier;
mod page;
mod store;

pub use config::CacheConfig;
pub use invalidator::WriteInvalidator;
pub use keys::{ObjectKey, PageKey};
pub use middleware::{PageCacheState, page_cache_layer};
pub use notifier::{Dispatch, SkipReason, WebhookNotifier};
pub use page::{CachedResponse, PageInvalidator, PageStore, PageStoreError};
pub use store::{ObjectStore, TtlCache};
