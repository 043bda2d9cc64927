use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use teamgate_auth::{AuthContext, JwtValidator};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub is_dev_environment: bool,
}

/// Attach an [`AuthContext`] to every request.
///
/// Never rejects: a missing or invalid token yields an anonymous context and
/// the route guards decide between 401 and 403.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ctx = match extract_bearer(req.headers()) {
        Some(token) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => {
                let ctx = AuthContext::from_claims(&claims, state.is_dev_environment);
                if ctx.is_authenticated {
                    req.extensions_mut().insert(claims);
                } else {
                    tracing::debug!(user_id = %claims.sub, "bearer token awaits second factor");
                }
                ctx
            }
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                AuthContext::anonymous(state.is_dev_environment)
            }
        },
        None => AuthContext::anonymous(state.is_dev_environment),
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
