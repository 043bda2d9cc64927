//! Route guards: evaluate a requirement and map the decision to HTTP.
//!
//! `Unauthenticated → 401`, `Forbidden → 403`, `Allowed → continue`.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use teamgate_auth::{AuthContext, AuthorizationDecision, AuthorizationRequirement, Authorizer};

use crate::app::errors::json_error;

/// A requirement bound to the authorizer that evaluates it.
#[derive(Clone)]
pub struct Guard {
    authorizer: Arc<dyn Authorizer>,
    requirement: Arc<AuthorizationRequirement>,
}

impl Guard {
    pub fn new(authorizer: Arc<dyn Authorizer>, requirement: AuthorizationRequirement) -> Self {
        Self {
            authorizer,
            requirement: Arc::new(requirement),
        }
    }

    pub fn evaluate(&self, ctx: &AuthContext) -> AuthorizationDecision {
        self.authorizer.evaluate(ctx, &self.requirement)
    }
}

/// HTTP status for a denial; `None` means the request may continue.
pub fn decision_status(decision: AuthorizationDecision) -> Option<StatusCode> {
    match decision {
        AuthorizationDecision::Allowed => None,
        AuthorizationDecision::Unauthenticated => Some(StatusCode::UNAUTHORIZED),
        AuthorizationDecision::Forbidden => Some(StatusCode::FORBIDDEN),
    }
}

pub async fn require(
    State(guard): State<Guard>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Without the auth middleware in front there is no identity at all.
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_else(|| AuthContext::anonymous(false));

    let decision = guard.evaluate(&ctx);
    let Some(status) = decision_status(decision) else {
        return next.run(req).await;
    };

    if status == StatusCode::UNAUTHORIZED {
        return json_error(status, "unauthenticated", "authentication required");
    }

    tracing::info!(
        path = %req.uri().path(),
        required_tier = %guard.requirement.required_tier(),
        "request forbidden"
    );
    json_error(status, "forbidden", "insufficient privileges")
}

/// Protect every route of `router` with `requirement`.
pub fn guarded<S>(router: Router<S>, authorizer: Arc<dyn Authorizer>, requirement: AuthorizationRequirement) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(axum::middleware::from_fn_with_state(
        Guard::new(authorizer, requirement),
        require,
    ))
}
