//! Shared request and response types for the Vetrina catalog gateway API.
//!
//! These types define the wire contract between the gateway, its clients,
//! and the revalidation webhook exchanged with the catalog backend. They
//! carry no framework dependencies so external consumers can embed them.

use serde::{Deserialize, Serialize};

/// A catalog product as served by the gateway.
///
/// Field defaults mirror the backend's behavior for products created before
/// the commerce fields existed: absent price/stock read as zero, absent sku
/// as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub stock: i64,
}

/// One page of a product listing, with totals taken from the backend's
/// pagination headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Publish,
    Draft,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Publish => "publish",
            ProductStatus::Draft => "draft",
        }
    }
}

/// Create record for a product write.
///
/// A single structured record with explicit optional fields; unknown fields
/// are rejected rather than silently accepted as metadata aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDraft {
    pub title: String,
    pub price: f64,
    pub sku: String,
    pub stock: i64,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Partial update record for a product write. Every field optional; absent
/// fields leave the stored value untouched. Unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl ProductPatch {
    /// True when no field is set; such a patch is a no-op write.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.sku.is_none()
            && self.stock.is_none()
            && self.status.is_none()
            && self.content.is_none()
            && self.excerpt.is_none()
    }
}

/// Filter parameters of a product list query. Serialized in declaration
/// order, so logically identical filters always render identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl ListFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.category.is_none()
            && self.tag.is_none()
            && self.orderby.is_none()
            && self.order.is_none()
    }
}

/// The kind of content change a webhook notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// Outbound webhook body sent to `{endpoint}/api/revalidate` when a content
/// write commits. Transmitted once, best-effort; never persisted or retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub secret: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

/// Inbound body of `POST /api/revalidate`. The `type` field is informational
/// and ignored by the endpoint; senders other than the backend may omit it.
/// An absent secret deserializes to an empty string and fails the secret
/// comparison rather than the parse.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RevalidateRequest {
    #[serde(default)]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChangeKind>,
}
