use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use teamgate_auth::tokens::{IssuanceError, StoreError};

use crate::app::dto::ExplainQueryError;

/// Map an issuance failure to a response. Never a 403: failing to issue is
/// not a privilege decision.
pub fn issuance_error_to_response(err: IssuanceError) -> axum::response::Response {
    match err {
        IssuanceError::Token(e) => {
            tracing::error!(error = %e, "access token signing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_signing_failed", e.to_string())
        }
        IssuanceError::Store(StoreError::Conflict) => json_error(
            StatusCode::CONFLICT,
            "refresh_conflict",
            "refresh token was rotated by a concurrent request",
        ),
        IssuanceError::Store(StoreError::NotFound) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_refresh_token", "refresh token not recognised")
        }
        IssuanceError::Store(e) => {
            tracing::error!(error = %e, "refresh token store failed");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "token_store_unavailable", e.to_string())
        }
        IssuanceError::RefreshTokenExpired => {
            json_error(StatusCode::UNAUTHORIZED, "refresh_token_expired", "refresh token has expired")
        }
        IssuanceError::TokenOwnerMismatch => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_refresh_token", "refresh token not recognised")
        }
        IssuanceError::Cancelled => json_error(StatusCode::REQUEST_TIMEOUT, "cancelled", "request cancelled"),
    }
}

pub fn explain_query_error_to_response(err: ExplainQueryError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_requirement", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
