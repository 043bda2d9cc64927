use serde::{Deserialize, Serialize};
use thiserror::Error;

use teamgate_auth::{AuthorizationRequirement, MatchMode, RequirementError, Role, Tier};
use teamgate_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

/// Login for an account whose credentials were already checked upstream.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub two_factor_verified: bool,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_id: Option<String>,
}

/// Query describing a requirement to explain against the caller.
///
/// `role` switches to a minimum-role rule; otherwise `position`/`mode` apply.
/// The two kinds of rule cannot be mixed.
#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub tier: Tier,
    pub position: Option<i32>,
    pub mode: Option<MatchMode>,
    pub role: Option<Role>,
    #[serde(default = "default_true")]
    pub hierarchy_override: bool,
    #[serde(default)]
    pub leader: bool,
    #[serde(default)]
    pub mfa: bool,
    #[serde(default)]
    pub dev_bypass: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExplainQueryError {
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    #[error("role cannot be combined with position or mode")]
    MixedRankRule,
}

impl ExplainQuery {
    pub fn to_requirement(&self) -> Result<AuthorizationRequirement, ExplainQueryError> {
        let mut req = match self.role {
            Some(_) if self.position.is_some() || self.mode.is_some() => {
                return Err(ExplainQueryError::MixedRankRule);
            }
            Some(minimum) => AuthorizationRequirement::minimum_role(self.tier, minimum),
            None => AuthorizationRequirement::position(
                self.tier,
                self.position,
                self.mode.unwrap_or_default(),
                self.hierarchy_override,
            )?,
        };
        if !self.hierarchy_override {
            req = req.without_hierarchy_override();
        }
        if self.leader {
            req = req.with_leader();
        }
        if self.mfa {
            req = req.with_mfa();
        }
        if self.dev_bypass {
            req = req.with_dev_bypass();
        }
        Ok(req)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: String,
    pub team_id: String,
    pub tier: Tier,
    pub role: Role,
    pub position: Option<i32>,
    pub leader: bool,
    pub mfa_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamgate_auth::RankRule;

    fn query(json: serde_json::Value) -> ExplainQuery {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn defaults_to_overridable_minimum() {
        let req = query(serde_json::json!({ "tier": "maintenance", "position": 5 }))
            .to_requirement()
            .unwrap();
        assert!(req.allow_hierarchy_override());
        assert_eq!(
            req.rank(),
            RankRule::Position {
                required_position: Some(5),
                match_mode: MatchMode::Minimum
            }
        );
    }

    #[test]
    fn role_query_builds_role_rule() {
        let req = query(serde_json::json!({ "tier": "super", "role": "admin", "hierarchy_override": false }))
            .to_requirement()
            .unwrap();
        assert_eq!(req.rank(), RankRule::Role { minimum: Role::Admin });
        assert!(!req.allow_hierarchy_override());
    }

    #[test]
    fn negative_position_rejected() {
        let err = query(serde_json::json!({ "tier": "customer", "position": -1 }))
            .to_requirement()
            .unwrap_err();
        assert_eq!(err, ExplainQueryError::Requirement(RequirementError::NegativePosition(-1)));
    }

    #[test]
    fn role_mixed_with_position_rejected() {
        for json in [
            serde_json::json!({ "tier": "super", "role": "admin", "position": 2 }),
            serde_json::json!({ "tier": "super", "role": "admin", "mode": "exact" }),
        ] {
            assert_eq!(query(json).to_requirement().unwrap_err(), ExplainQueryError::MixedRankRule);
        }
    }

    #[test]
    fn explicit_exact_mode_is_kept() {
        let req = query(serde_json::json!({ "tier": "customer", "position": 0, "mode": "exact" }))
            .to_requirement()
            .unwrap();
        assert_eq!(
            req.rank(),
            RankRule::Position {
                required_position: Some(0),
                match_mode: MatchMode::Exact
            }
        );
    }
}
