//! Tier-scoped endpoints, one requirement per route.

use std::sync::Arc;

use axum::{Json, Router, extract::Extension, routing::get};
use serde_json::json;

use teamgate_auth::{AuthContext, AuthorizationRequirement, Authorizer, RequirementError, Role, Tier};

use crate::authz::guarded;

/// Seniority needed for the maintenance dashboard.
const DASHBOARD_MIN_POSITION: i32 = 5;

pub fn router(authorizer: Arc<dyn Authorizer>) -> Result<Router, RequirementError> {
    let customer = guarded(
        Router::new().route("/customer/overview", get(customer_overview)),
        authorizer.clone(),
        AuthorizationRequirement::tier_member(Tier::Customer).with_dev_bypass(),
    );

    let customer_leads = guarded(
        Router::new().route("/customer/leads", get(customer_leads)),
        authorizer.clone(),
        AuthorizationRequirement::exact_position(Tier::Customer, Some(0))?.with_leader(),
    );

    let maintenance = guarded(
        Router::new().route("/maintenance/dashboard", get(maintenance_dashboard)),
        authorizer.clone(),
        AuthorizationRequirement::minimum_position(Tier::Maintenance, DASHBOARD_MIN_POSITION)?.with_dev_bypass(),
    );

    let console = guarded(
        Router::new().route("/super/console", get(super_console)),
        authorizer,
        AuthorizationRequirement::minimum_role(Tier::Super, Role::Admin).with_mfa(),
    );

    Ok(Router::new()
        .merge(customer)
        .merge(customer_leads)
        .merge(maintenance)
        .merge(console))
}

fn area(name: &'static str, ctx: &AuthContext) -> Json<serde_json::Value> {
    Json(json!({
        "area": name,
        "tier": ctx.tier,
        "authenticated": ctx.is_authenticated,
    }))
}

pub async fn customer_overview(Extension(ctx): Extension<AuthContext>) -> Json<serde_json::Value> {
    area("customer_overview", &ctx)
}

pub async fn customer_leads(Extension(ctx): Extension<AuthContext>) -> Json<serde_json::Value> {
    area("customer_leads", &ctx)
}

pub async fn maintenance_dashboard(Extension(ctx): Extension<AuthContext>) -> Json<serde_json::Value> {
    area("maintenance_dashboard", &ctx)
}

pub async fn super_console(Extension(ctx): Extension<AuthContext>) -> Json<serde_json::Value> {
    area("super_console", &ctx)
}
