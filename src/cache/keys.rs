//! Cache key definitions.
//!
//! Defines `ObjectKey` for catalog data entries and `PageKey` for rendered
//! responses.

use std::fmt;

use vetrina_api_types::ListFilter;

/// Object-store keys: one per logical catalog query.
///
/// `Display` renders the canonical string form used in logs:
/// `product_{id}`, `product_slug_{slug}`, and
/// `products_{page}_{per_page}_{filter}` where the filter segment is the
/// JSON rendering of the typed filter. Struct fields serialize in
/// declaration order, so two logically identical queries always produce
/// identical keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    /// A product identified by its backend id.
    Product(u64),
    /// A product identified by its URL slug.
    ProductSlug(String),
    /// One page of a filtered product listing.
    ProductList {
        page: u32,
        per_page: u32,
        filter: ListFilter,
    },
}

impl ObjectKey {
    pub fn list(page: u32, per_page: u32, filter: ListFilter) -> Self {
        ObjectKey::ProductList {
            page,
            per_page,
            filter,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Product(id) => write!(f, "product_{id}"),
            ObjectKey::ProductSlug(slug) => write!(f, "product_slug_{slug}"),
            ObjectKey::ProductList {
                page,
                per_page,
                filter,
            } => {
                let filter = serde_json::to_string(filter).map_err(|_| fmt::Error)?;
                write!(f, "products_{page}_{per_page}_{filter}")
            }
        }
    }
}

/// Page-store keys: request path plus raw query string.
///
/// Invalidation is path-scoped, so every query variant of a path drops
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query: String,
}

impl PageKey {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}
