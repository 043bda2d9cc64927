//! Authorization audit endpoint for "why was this request denied?" questions.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use teamgate_auth::{AuthContext, AuthorizationRequirement, Authorizer, Tier, explain_authorization};

use crate::app::dto::ExplainQuery;
use crate::app::errors;
use crate::authz::{decision_status, guarded};

pub fn router(authorizer: Arc<dyn Authorizer>) -> Router {
    // Explaining is itself authenticated: callers only ever explain themselves.
    guarded(
        Router::new().route("/authz/explain", get(explain)),
        authorizer,
        AuthorizationRequirement::tier_member(Tier::Customer),
    )
}

/// GET /authz/explain?tier=..&position=..&mode=.. - explain a requirement for the caller
pub async fn explain(
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ExplainQuery>,
) -> axum::response::Response {
    let requirement = match query.to_requirement() {
        Ok(req) => req,
        Err(e) => return errors::explain_query_error_to_response(e),
    };

    let explanation = explain_authorization(&ctx, &requirement);
    let status = decision_status(explanation.decision).map(|s| s.as_u16());

    Json(json!({
        "explanation": explanation,
        "http_status": status.unwrap_or(200),
    }))
    .into_response()
}
