use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use vetrina_api_types::{ListFilter, ProductDraft, ProductPatch};

use crate::application::catalog::CatalogService;
use crate::domain::products::{ListQuery, SaveKind};

use super::error::ApiError;

#[derive(Clone)]
pub struct CatalogState {
    pub catalog: Arc<CatalogService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub orderby: Option<String>,
    pub order: Option<String>,
}

impl From<ProductListParams> for ListQuery {
    fn from(params: ProductListParams) -> Self {
        ListQuery::new(
            params.page,
            params.per_page,
            ListFilter {
                search: params.search,
                category: params.category,
                tag: params.tag,
                orderby: params.orderby,
                order: params.order,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Autosaves invalidate like any other write but never notify the frontend.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WriteParams {
    pub autosave: bool,
}

impl WriteParams {
    fn save_kind(&self) -> SaveKind {
        SaveKind::from_autosave_flag(self.autosave)
    }
}

pub async fn list_products(
    State(state): State<CatalogState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.catalog.list_products(params.into()).await?;
    Ok(Json(page))
}

pub async fn get_product(
    State(state): State<CatalogState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.get_product(id).await?;
    Ok(Json(product))
}

pub async fn get_product_by_slug(
    State(state): State<CatalogState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.get_product_by_slug(&slug).await?;
    Ok(Json(product))
}

pub async fn search_products(
    State(state): State<CatalogState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let results = state
        .catalog
        .search_products(params.q.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(results))
}

pub async fn create_product(
    State(state): State<CatalogState>,
    Query(params): Query<WriteParams>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .create_product(draft, params.save_kind())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<CatalogState>,
    Path(id): Path<u64>,
    Query(params): Query<WriteParams>,
    Json(patch): Json<ProductPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .update_product(id, patch, params.save_kind())
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<CatalogState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}
