//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: issuer, refresh store, account directory, authorizer
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use teamgate_auth::RequirementError;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from already-wired services.
pub fn build_app(services: Arc<services::AppServices>) -> Result<Router, RequirementError> {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
        is_dev_environment: services.is_dev_environment,
    };

    let app = Router::new()
        .merge(routes::public_router(services.is_dev_environment))
        .merge(routes::guarded_router(&services)?)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(axum::middleware::from_fn_with_state(
                    auth_state,
                    middleware::auth_middleware,
                )),
        );

    Ok(app)
}
