//! Inbound revalidation endpoint.
//!
//! Counterpart of the outbound webhook: the backend (or any holder of the
//! shared secret) POSTs here to drop rendered pages. Response bodies are
//! fixed by the webhook contract and bypass the API error envelope.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use serde::Serialize;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use vetrina_api_types::RevalidateRequest;

use crate::cache::{PageInvalidator, PageStoreError};

#[derive(Clone)]
pub struct RevalidateState {
    pub secret: String,
    pub pages: Arc<dyn PageInvalidator>,
}

#[derive(Serialize)]
struct Revalidated {
    revalidated: bool,
    now: i64,
}

#[derive(Serialize)]
struct RevalidateFailure {
    error: &'static str,
}

pub async fn revalidate(
    State(state): State<RevalidateState>,
    Json(request): Json<RevalidateRequest>,
) -> Response {
    counter!("vetrina_revalidate_requests_total").increment(1);

    if !secret_matches(&state.secret, &request.secret) {
        warn!("Revalidation request rejected: secret mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(RevalidateFailure {
                error: "Invalid secret",
            }),
        )
            .into_response();
    }

    match invalidate(&state, request.path.as_deref()).await {
        Ok(dropped) => {
            info!(
                path = request.path.as_deref().unwrap_or(""),
                kind = request.kind.map(|kind| kind.as_str()).unwrap_or(""),
                dropped,
                "Pages revalidated"
            );
            (
                StatusCode::OK,
                Json(Revalidated {
                    revalidated: true,
                    now: epoch_millis(),
                }),
            )
                .into_response()
        }
        Err(source) => {
            error!(
                path = request.path.as_deref().unwrap_or(""),
                error = %source,
                "Revalidation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RevalidateFailure {
                    error: "Error revalidating",
                }),
            )
                .into_response()
        }
    }
}

/// Drop the named path (when given), then the listing root. The root is
/// always refreshed because every write can change what the storefront
/// shows.
async fn invalidate(
    state: &RevalidateState,
    path: Option<&str>,
) -> Result<usize, PageStoreError> {
    let mut dropped = 0;
    if let Some(path) = path {
        dropped += state.pages.invalidate_path(path).await?;
    }
    dropped += state.pages.invalidate_path("/").await?;
    Ok(dropped)
}

fn secret_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

fn epoch_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison_accepts_exact_match_only() {
        assert!(secret_matches("hunter2", "hunter2"));
        assert!(!secret_matches("hunter2", "hunter"));
        assert!(!secret_matches("hunter2", "hunter3"));
        assert!(!secret_matches("hunter2", ""));
    }

    #[test]
    fn epoch_millis_is_in_a_sane_range() {
        // 2020-01-01 in milliseconds.
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
