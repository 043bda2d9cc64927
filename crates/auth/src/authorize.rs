use serde::Serialize;

use crate::{AuthContext, AuthorizationRequirement, RankRule, Role, Tier, hierarchy, position};

/// Outcome of evaluating a requirement against a context.
///
/// Denials are values, not errors: callers must be able to tell
/// "who are you?" (401) from "not you" (403).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Unauthenticated,
    Forbidden,
    Allowed,
}

impl AuthorizationDecision {
    pub fn is_allowed(self) -> bool {
        self == AuthorizationDecision::Allowed
    }
}

/// Anything that turns a context + requirement into a decision.
///
/// - No IO
/// - No panics
/// - Deterministic
pub trait Authorizer: Send + Sync {
    fn evaluate(&self, ctx: &AuthContext, requirement: &AuthorizationRequirement) -> AuthorizationDecision;
}

/// The tier/position/role engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationEngine;

impl Authorizer for AuthorizationEngine {
    fn evaluate(&self, ctx: &AuthContext, requirement: &AuthorizationRequirement) -> AuthorizationDecision {
        let decision = match assess(ctx, requirement) {
            Ok(_) => AuthorizationDecision::Allowed,
            Err(DenialKind::Unauthenticated) => AuthorizationDecision::Unauthenticated,
            Err(_) => AuthorizationDecision::Forbidden,
        };

        tracing::debug!(
            required_tier = %requirement.required_tier(),
            tier = ?ctx.tier,
            position = ?ctx.position,
            ?decision,
            "authorization evaluated"
        );

        decision
    }
}

/// Allows everything in a development environment when the requirement opts in.
///
/// The environment check runs before the authentication check, so anonymous
/// requests pass too.
#[derive(Debug, Default, Clone)]
pub struct DevBypass<A> {
    inner: A,
}

impl<A> DevBypass<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: Authorizer> Authorizer for DevBypass<A> {
    fn evaluate(&self, ctx: &AuthContext, requirement: &AuthorizationRequirement) -> AuthorizationDecision {
        if bypasses(ctx, requirement) {
            tracing::debug!(
                required_tier = %requirement.required_tier(),
                authenticated = ctx.is_authenticated,
                "development bypass granted"
            );
            return AuthorizationDecision::Allowed;
        }
        self.inner.evaluate(ctx, requirement)
    }
}

/// Evaluate with the standard chain (dev bypass around the engine).
pub fn authorize(ctx: &AuthContext, requirement: &AuthorizationRequirement) -> AuthorizationDecision {
    DevBypass::new(AuthorizationEngine).evaluate(ctx, requirement)
}

fn bypasses(ctx: &AuthContext, requirement: &AuthorizationRequirement) -> bool {
    requirement.allow_dev_bypass() && ctx.is_dev_environment
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Grant {
    HierarchyOverride,
    TierMatch,
}

/// Single source of truth for the engine and for explanations.
fn assess(ctx: &AuthContext, requirement: &AuthorizationRequirement) -> Result<Grant, DenialKind> {
    if !ctx.is_authenticated {
        return Err(DenialKind::Unauthenticated);
    }

    if requirement.require_mfa() && !ctx.is_mfa_verified {
        return Err(DenialKind::MfaRequired);
    }

    let required_tier = requirement.required_tier();

    if requirement.allow_hierarchy_override() && hierarchy::is_higher_tier(ctx.tier, required_tier) {
        return Ok(Grant::HierarchyOverride);
    }

    if ctx.tier != Some(required_tier) {
        return Err(DenialKind::TierMismatch);
    }

    check_rank(ctx, requirement.rank())?;

    if requirement.require_leader() && !ctx.is_leader {
        return Err(DenialKind::NotLeader);
    }

    Ok(Grant::TierMatch)
}

fn check_rank(ctx: &AuthContext, rank: RankRule) -> Result<(), DenialKind> {
    match rank {
        RankRule::Position {
            required_position,
            match_mode,
        } => {
            // An unset position only satisfies "any position".
            let ok = match ctx.position {
                Some(actual) => position::satisfies(actual, required_position, match_mode),
                None => required_position.is_none(),
            };
            if ok {
                Ok(())
            } else {
                Err(DenialKind::PositionMismatch)
            }
        }
        RankRule::Role { minimum } => {
            if ctx.role.is_some_and(|role| role.at_least(minimum)) {
                Ok(())
            } else {
                Err(DenialKind::InsufficientRole)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// This structure provides transparent, debuggable information about why
/// a request was allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The requirement that was being checked.
    pub requirement: AuthorizationRequirement,

    /// The decision the engine reaches for this context.
    pub decision: AuthorizationDecision,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// The caller as the engine saw it.
    pub context: AuthContext,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Detailed reason why authorization was denied.
#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    MfaRequired,
    TierMismatch,
    PositionMismatch,
    InsufficientRole,
    NotLeader,
}

/// Explain why an authorization decision was made (or would be made).
///
/// Answers "why was this request allowed/denied?". The decision always equals
/// what [`authorize`] returns for the same inputs.
pub fn explain_authorization(
    ctx: &AuthContext,
    requirement: &AuthorizationRequirement,
) -> AuthorizationExplanation {
    let required_tier = requirement.required_tier();

    if bypasses(ctx, requirement) {
        return AuthorizationExplanation {
            requirement: requirement.clone(),
            decision: AuthorizationDecision::Allowed,
            reason: "Development environment bypass is enabled for this requirement".to_string(),
            context: ctx.clone(),
            denial_reason: None,
        };
    }

    let (decision, reason, denial_reason) = match assess(ctx, requirement) {
        Ok(Grant::HierarchyOverride) => (
            AuthorizationDecision::Allowed,
            format!(
                "Caller's tier '{}' ranks above required tier '{}' and hierarchy override is allowed",
                display_tier(ctx.tier),
                required_tier
            ),
            None,
        ),
        Ok(Grant::TierMatch) => (
            AuthorizationDecision::Allowed,
            format!("Caller is a member of tier '{required_tier}' and meets its rank rule"),
            None,
        ),
        Err(kind) => {
            let decision = if kind == DenialKind::Unauthenticated {
                AuthorizationDecision::Unauthenticated
            } else {
                AuthorizationDecision::Forbidden
            };
            let denial = denial_for(kind, ctx, requirement);
            (decision, denial.message.clone(), Some(denial))
        }
    };

    AuthorizationExplanation {
        requirement: requirement.clone(),
        decision,
        reason,
        context: ctx.clone(),
        denial_reason,
    }
}

fn denial_for(kind: DenialKind, ctx: &AuthContext, requirement: &AuthorizationRequirement) -> DenialReason {
    let required_tier = requirement.required_tier();

    let (message, suggestions) = match kind {
        DenialKind::Unauthenticated => (
            "Request carries no valid access token".to_string(),
            vec!["Sign in and send the access token as a Bearer credential".to_string()],
        ),
        DenialKind::MfaRequired => (
            "Second-factor verification has not been completed for this session".to_string(),
            vec!["Complete two-step verification and request a new access token".to_string()],
        ),
        DenialKind::TierMismatch => {
            let mut suggestions = vec![format!("Act within a '{required_tier}' team")];
            if !requirement.allow_hierarchy_override() {
                suggestions.push("This requirement matches its tier exactly; higher tiers do not qualify".to_string());
            }
            (
                format!(
                    "Caller's tier '{}' does not satisfy required tier '{}'",
                    display_tier(ctx.tier),
                    required_tier
                ),
                suggestions,
            )
        }
        DenialKind::PositionMismatch => {
            let (required, mode) = match requirement.rank() {
                RankRule::Position {
                    required_position,
                    match_mode,
                } => (required_position, match_mode),
                RankRule::Role { .. } => (None, Default::default()),
            };
            (
                format!(
                    "Caller's position {} does not satisfy {:?} position {}",
                    ctx.position.map_or_else(|| "(unset)".to_string(), |p| p.to_string()),
                    mode,
                    required.map_or_else(|| "(any)".to_string(), |p| p.to_string()),
                ),
                vec!["Ask a team administrator to adjust the member's position".to_string()],
            )
        }
        DenialKind::InsufficientRole => {
            let minimum = match requirement.rank() {
                RankRule::Role { minimum } => minimum,
                RankRule::Position { .. } => Role::User,
            };
            (
                format!(
                    "Caller's role '{}' is below the required '{}'",
                    ctx.role.map_or("(none)", |r| r.as_str()),
                    minimum
                ),
                vec![format!("Assign the '{minimum}' role (or higher) within the team")],
            )
        }
        DenialKind::NotLeader => (
            "Only team leaders may perform this action".to_string(),
            vec!["Ask a team administrator to mark the member as leader".to_string()],
        ),
    };

    DenialReason {
        kind,
        message,
        suggestions,
    }
}

fn display_tier(tier: Option<Tier>) -> &'static str {
    tier.map_or("(none)", |t| t.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchMode;

    fn maintenance_min_5() -> AuthorizationRequirement {
        AuthorizationRequirement::minimum_position(Tier::Maintenance, 5).unwrap()
    }

    #[test]
    fn scenario_maintenance_minimum_five() {
        let req = maintenance_min_5();

        let super_user = AuthContext::member(Tier::Super, Role::User, Some(0));
        assert_eq!(authorize(&super_user, &req), AuthorizationDecision::Allowed);

        let junior = AuthContext::member(Tier::Maintenance, Role::User, Some(4));
        assert_eq!(authorize(&junior, &req), AuthorizationDecision::Forbidden);

        let anonymous = AuthContext::anonymous(false);
        assert_eq!(authorize(&anonymous, &req), AuthorizationDecision::Unauthenticated);
    }

    #[test]
    fn override_ignores_negative_position() {
        let req = AuthorizationRequirement::minimum_position(Tier::Maintenance, 10).unwrap();
        let ctx = AuthContext::member(Tier::Super, Role::User, Some(-5));
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
    }

    #[test]
    fn exact_requirement_rejects_higher_tier() {
        let req = AuthorizationRequirement::exact_position(Tier::Customer, Some(1)).unwrap();
        let ctx = AuthContext::member(Tier::Super, Role::Admin, Some(1));
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn exact_without_position_is_membership_only() {
        let req = AuthorizationRequirement::exact_position(Tier::Customer, None).unwrap();
        assert_eq!(
            authorize(&AuthContext::member(Tier::Customer, Role::User, Some(42)), &req),
            AuthorizationDecision::Allowed
        );
        assert_eq!(
            authorize(&AuthContext::member(Tier::Customer, Role::User, None), &req),
            AuthorizationDecision::Allowed
        );
    }

    #[test]
    fn minimum_boundary() {
        let req = maintenance_min_5();
        let at = AuthContext::member(Tier::Maintenance, Role::User, Some(5));
        let below = AuthContext::member(Tier::Maintenance, Role::User, Some(4));
        assert_eq!(authorize(&at, &req), AuthorizationDecision::Allowed);
        assert_eq!(authorize(&below, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn unset_position_fails_positional_requirement() {
        let req = maintenance_min_5();
        let ctx = AuthContext::member(Tier::Maintenance, Role::Admin, None);
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn any_position_in_tier_allowed() {
        let req = AuthorizationRequirement::tier_member(Tier::Maintenance);
        for position in [None, Some(0), Some(-1), Some(99)] {
            let ctx = AuthContext::member(Tier::Maintenance, Role::User, position);
            assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
        }
    }

    #[test]
    fn missing_tier_is_forbidden() {
        let req = AuthorizationRequirement::tier_member(Tier::Customer);
        let ctx = AuthContext {
            is_authenticated: true,
            ..Default::default()
        };
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn lower_tier_is_forbidden() {
        let req = AuthorizationRequirement::tier_member(Tier::Super);
        let ctx = AuthContext::member(Tier::Maintenance, Role::Admin, Some(100));
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn dev_bypass_admits_anonymous_requests() {
        let req = maintenance_min_5().with_dev_bypass();
        let ctx = AuthContext::anonymous(true);
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
    }

    #[test]
    fn dev_flag_alone_does_not_bypass() {
        let req = maintenance_min_5();
        let ctx = AuthContext::anonymous(true);
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Unauthenticated);
    }

    #[test]
    fn bypass_requirement_outside_dev_still_checks() {
        let req = maintenance_min_5().with_dev_bypass();
        let ctx = AuthContext::member(Tier::Customer, Role::Admin, Some(9));
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn role_rule_uses_ordinal_minimum_and_keeps_override() {
        let req = AuthorizationRequirement::minimum_role(Tier::Maintenance, Role::Manager);

        let manager = AuthContext::member(Tier::Maintenance, Role::Manager, None);
        let user = AuthContext::member(Tier::Maintenance, Role::User, Some(1000));
        let super_user = AuthContext::member(Tier::Super, Role::User, None);

        assert_eq!(authorize(&manager, &req), AuthorizationDecision::Allowed);
        assert_eq!(authorize(&user, &req), AuthorizationDecision::Forbidden);
        assert_eq!(authorize(&super_user, &req), AuthorizationDecision::Allowed);
    }

    #[test]
    fn leader_predicate_applies_to_same_tier() {
        let req = AuthorizationRequirement::tier_member(Tier::Customer).with_leader();
        let mut ctx = AuthContext::member(Tier::Customer, Role::User, Some(0));
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
        ctx.is_leader = true;
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
    }

    #[test]
    fn mfa_predicate_blocks_even_higher_tiers() {
        let req = AuthorizationRequirement::tier_member(Tier::Customer).with_mfa();
        let mut ctx = AuthContext::member(Tier::Super, Role::Admin, Some(1));
        ctx.is_mfa_verified = false;
        assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Forbidden);
    }

    #[test]
    fn explanation_names_the_missing_piece() {
        let req = AuthorizationRequirement::position(Tier::Customer, Some(3), MatchMode::Exact, false).unwrap();
        let ctx = AuthContext::member(Tier::Customer, Role::User, Some(2));

        let explanation = explain_authorization(&ctx, &req);
        assert_eq!(explanation.decision, AuthorizationDecision::Forbidden);
        let denial = explanation.denial_reason.unwrap();
        assert_eq!(denial.kind, DenialKind::PositionMismatch);
        assert!(denial.message.contains("Exact"));
    }

    #[test]
    fn explanation_reports_override() {
        let req = maintenance_min_5();
        let ctx = AuthContext::member(Tier::Super, Role::User, None);
        let explanation = explain_authorization(&ctx, &req);
        assert!(explanation.decision.is_allowed());
        assert!(explanation.reason.contains("ranks above"));
        assert!(explanation.denial_reason.is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_tier() -> impl Strategy<Value = Tier> {
            prop_oneof![Just(Tier::Customer), Just(Tier::Maintenance), Just(Tier::Super)]
        }

        fn any_role() -> impl Strategy<Value = Role> {
            prop_oneof![Just(Role::User), Just(Role::Manager), Just(Role::Admin)]
        }

        fn any_mode() -> impl Strategy<Value = MatchMode> {
            prop_oneof![Just(MatchMode::Exact), Just(MatchMode::Minimum)]
        }

        fn any_context() -> impl Strategy<Value = AuthContext> {
            (
                any::<bool>(),
                any::<bool>(),
                proptest::option::of(any_tier()),
                proptest::option::of(-20i32..20),
                any::<bool>(),
                proptest::option::of(any_role()),
                any::<bool>(),
            )
                .prop_map(
                    |(is_authenticated, is_dev_environment, tier, position, is_leader, role, is_mfa_verified)| {
                        AuthContext {
                            is_authenticated,
                            is_dev_environment,
                            tier,
                            position,
                            is_leader,
                            role,
                            is_mfa_verified,
                        }
                    },
                )
        }

        fn any_requirement() -> impl Strategy<Value = AuthorizationRequirement> {
            (
                any_tier(),
                proptest::option::of(0i32..20),
                any_mode(),
                any::<bool>(),
                any::<bool>(),
                any::<bool>(),
                any::<bool>(),
            )
                .prop_map(|(tier, position, mode, overrides, bypass, leader, mfa)| {
                    let mut req = AuthorizationRequirement::position(tier, position, mode, overrides).unwrap();
                    if bypass {
                        req = req.with_dev_bypass();
                    }
                    if leader {
                        req = req.with_leader();
                    }
                    if mfa {
                        req = req.with_mfa();
                    }
                    req
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: a strictly higher tier passes any overridable positional requirement.
            #[test]
            fn higher_tier_overrides_position(
                required in prop_oneof![Just(Tier::Customer), Just(Tier::Maintenance)],
                required_position in proptest::option::of(0i32..100),
                mode in any_mode(),
                actual_position in proptest::option::of(any::<i32>()),
                role in any_role(),
            ) {
                let req = AuthorizationRequirement::position(required, required_position, mode, true).unwrap();
                let ctx = AuthContext::member(Tier::Super, role, actual_position);
                prop_assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
            }

            /// Property: without dev bypass, anonymous callers are always Unauthenticated.
            #[test]
            fn unauthenticated_beats_forbidden(ctx in any_context(), req in any_requirement()) {
                let ctx = AuthContext { is_authenticated: false, ..ctx };
                let req = if req.allow_dev_bypass() {
                    AuthorizationRequirement::position(req.required_tier(), None, MatchMode::Minimum, true).unwrap()
                } else {
                    req
                };
                prop_assert_eq!(authorize(&ctx, &req), AuthorizationDecision::Unauthenticated);
            }

            /// Property: exact requirements never admit another tier.
            #[test]
            fn exact_never_overrides(ctx in any_context(), tier in any_tier(), position in proptest::option::of(0i32..20)) {
                let req = AuthorizationRequirement::exact_position(tier, position).unwrap();
                if ctx.tier != Some(tier) {
                    prop_assert_ne!(authorize(&ctx, &req), AuthorizationDecision::Allowed);
                }
            }

            /// Property: explanations agree with the decision chain.
            #[test]
            fn explanation_matches_decision(ctx in any_context(), req in any_requirement()) {
                prop_assert_eq!(explain_authorization(&ctx, &req).decision, authorize(&ctx, &req));
            }
        }
    }
}
