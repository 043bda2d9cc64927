use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use teamgate_auth::RequirementError;

use crate::app::services::AppServices;

pub mod explain;
pub mod system;
pub mod teams;
pub mod tokens;

/// Public routes (no guard): health, token refresh, and in development a
/// login that trusts the caller.
pub fn public_router(is_dev_environment: bool) -> Router {
    let router = Router::new()
        .route("/health", get(system::health))
        .route("/auth/refresh", post(tokens::refresh));

    if is_dev_environment {
        router.route("/auth/login", post(tokens::login))
    } else {
        router
    }
}

/// Routes behind requirement guards.
pub fn guarded_router(services: &AppServices) -> Result<Router, RequirementError> {
    let authorizer = Arc::clone(&services.authorizer);
    Ok(Router::new()
        .merge(system::router(authorizer.clone()))
        .merge(teams::router(authorizer.clone())?)
        .merge(explain::router(authorizer)))
}
