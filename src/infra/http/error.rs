use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{CatalogError, ErrorReport};
use crate::infra::upstream::{UpstreamError, codes as upstream_codes};

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_FOUND: &str = "not_found";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// JSON API error with the `{ "error": { code, message, hint } }` envelope.
///
/// Errors built from a real error value carry the full source chain as an
/// `ErrorReport` for the logging middleware; hand-built errors fall back to
/// a single-line report. The revalidation endpoint does not use this type;
/// its response bodies are fixed by the webhook contract.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = match self.report {
            Some(report) => report,
            None => ErrorReport::from_message(
                "infra::http::api",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            ),
        };
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        let (status, code, message, hint) = match &error {
            CatalogError::Upstream(UpstreamError::NotFound) => (
                StatusCode::NOT_FOUND,
                upstream_codes::PRODUCT_NOT_FOUND,
                "Product not found",
                None,
            ),
            CatalogError::Upstream(UpstreamError::Unreachable(source)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                upstream_codes::UPSTREAM_UNREACHABLE,
                "Catalog backend unreachable",
                Some(source.to_string()),
            ),
            CatalogError::Upstream(UpstreamError::InvalidResponse(detail)) => (
                StatusCode::BAD_GATEWAY,
                upstream_codes::UPSTREAM_INVALID_RESPONSE,
                "Catalog backend returned an invalid response",
                Some(detail.clone()),
            ),
            CatalogError::Upstream(UpstreamError::Status { status, .. }) => (
                StatusCode::BAD_GATEWAY,
                upstream_codes::UPSTREAM_STATUS,
                "Catalog backend request failed",
                Some(format!("upstream status {status}")),
            ),
            CatalogError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message.clone()),
            ),
        };
        let report = ErrorReport::from_error("infra::http::api", status, &error);
        Self {
            status,
            code,
            message,
            hint,
            report: Some(report),
        }
    }
}
