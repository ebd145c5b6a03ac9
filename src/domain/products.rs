use serde::{Deserialize, Serialize};
use vetrina_api_types::ListFilter;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 12;
/// The backend rejects page sizes above this, so the gateway clamps first.
pub const MAX_PER_PAGE: u32 = 100;

/// Distinguishes user-initiated saves from automated intermediate saves.
/// Autosaves change stored data but must not trigger page revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    Manual,
    Autosave,
}

impl SaveKind {
    pub fn from_autosave_flag(autosave: bool) -> Self {
        if autosave {
            SaveKind::Autosave
        } else {
            SaveKind::Manual
        }
    }
}

/// A normalized product list query: pagination plus filters, after clamping.
///
/// Both the cache key and the upstream request derive from the same
/// normalized values, so they can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub filter: ListFilter,
}

impl ListQuery {
    pub fn new(page: Option<u32>, per_page: Option<u32>, filter: ListFilter) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
            filter,
        }
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(None, None, ListFilter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unspecified() {
        let query = ListQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 12);
        assert!(query.filter.is_empty());
    }

    #[test]
    fn pagination_is_clamped() {
        let query = ListQuery::new(Some(0), Some(0), ListFilter::default());
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 1);

        let query = ListQuery::new(Some(3), Some(500), ListFilter::default());
        assert_eq!(query.page, 3);
        assert_eq!(query.per_page, 100);
    }

    #[test]
    fn save_kind_maps_from_flag() {
        assert_eq!(SaveKind::from_autosave_flag(true), SaveKind::Autosave);
        assert_eq!(SaveKind::from_autosave_flag(false), SaveKind::Manual);
    }
}
