use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use teamgate_auth::tokens::RefreshTokenStore;

use crate::app::dto::{LoginRequest, RefreshRequest};
use crate::app::errors;
use crate::app::services::AppServices;

/// POST /auth/login - issue a package for an account already authenticated upstream
///
/// Only mounted in development; credentials are not checked here.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let (user, team) = match services.directory.find_member(body.user_id).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "unknown_account", "account not recognised");
        }
        Err(e) => {
            return errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "directory_unavailable", e.to_string());
        }
    };

    match services
        .issuer
        .issue(&user, &team, body.two_factor_verified, body.device_id.as_deref(), &cancel)
        .await
    {
        Ok(package) => (StatusCode::OK, Json(package)).into_response(),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "login failed");
            errors::issuance_error_to_response(e)
        }
    }
}

/// POST /auth/refresh - exchange a refresh token for a new package
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> axum::response::Response {
    // Cancelled when the client goes away and axum drops this future.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    if !services.issuer_options().refresh_tokens_enabled {
        return errors::json_error(StatusCode::FORBIDDEN, "refresh_tokens_disabled", "refresh tokens are disabled");
    }

    let record = match services.issuer.store().find_by_payload(&body.refresh_token).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_refresh_token", "refresh token not recognised");
        }
        Err(e) => return errors::issuance_error_to_response(e.into()),
    };

    let (user, team) = match services.directory.find_member(record.user_id).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            tracing::warn!(user_id = %record.user_id, "refresh token for unknown account");
            return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_refresh_token", "refresh token not recognised");
        }
        Err(e) => {
            return errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "directory_unavailable", e.to_string());
        }
    };

    match services
        .issuer
        .refresh(&record, &user, &team, body.device_id.as_deref(), Utc::now(), &cancel)
        .await
    {
        Ok(package) => (StatusCode::OK, Json(package)).into_response(),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "refresh failed");
            errors::issuance_error_to_response(e)
        }
    }
}
