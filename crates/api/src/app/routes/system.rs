use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use teamgate_auth::{AccessClaims, AuthorizationRequirement, Authorizer, Tier};

use crate::app::dto::WhoAmIResponse;
use crate::app::errors;
use crate::authz::guarded;

pub fn router(authorizer: Arc<dyn Authorizer>) -> Router {
    // Any team member; Customer is the lowest tier so every tier qualifies.
    guarded(
        Router::new().route("/whoami", get(whoami)),
        authorizer,
        AuthorizationRequirement::tier_member(Tier::Customer),
    )
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(claims: Option<Extension<AccessClaims>>) -> axum::response::Response {
    // Dev bypass is off for this route, so claims are present whenever we get here.
    let Some(Extension(claims)) = claims else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required");
    };

    Json(WhoAmIResponse {
        user_id: claims.sub.to_string(),
        team_id: claims.team_id.to_string(),
        tier: claims.tier,
        role: claims.role,
        position: claims.position,
        leader: claims.leader,
        mfa_verified: claims.mfa_verified,
    })
    .into_response()
}
