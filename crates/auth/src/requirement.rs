//! Authorization requirements: what a route demands of its caller.

use serde::Serialize;
use thiserror::Error;

use crate::{MatchMode, Role, Tier};

/// How seniority inside the required tier is checked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankRule {
    /// Position-based check. `required_position = None` accepts any position.
    Position {
        required_position: Option<i32>,
        match_mode: MatchMode,
    },
    /// Ordinal role check, ignoring position.
    Role { minimum: Role },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("required position must be non-negative (got {0}); use no position to accept any")]
    NegativePosition(i32),
}

/// A static authorization requirement.
///
/// Construct through the named constructors; fallible ones reject malformed
/// input up front so evaluation never sees an ambiguous requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequirement {
    required_tier: Tier,
    rank: RankRule,
    allow_hierarchy_override: bool,
    allow_dev_bypass: bool,
    require_leader: bool,
    require_mfa: bool,
}

impl AuthorizationRequirement {
    /// Any member of `tier` (or, via override, of a higher tier).
    pub fn tier_member(tier: Tier) -> Self {
        Self {
            required_tier: tier,
            rank: RankRule::Position {
                required_position: None,
                match_mode: MatchMode::Minimum,
            },
            allow_hierarchy_override: true,
            allow_dev_bypass: false,
            require_leader: false,
            require_mfa: false,
        }
    }

    /// Members of `tier` with position at least `position`; higher tiers override.
    pub fn minimum_position(tier: Tier, position: i32) -> Result<Self, RequirementError> {
        Self::position(tier, Some(position), MatchMode::Minimum, true)
    }

    /// Members of exactly `tier` holding exactly `position` (or any position
    /// when `None`). Higher tiers do not override.
    pub fn exact_position(tier: Tier, position: Option<i32>) -> Result<Self, RequirementError> {
        Self::position(tier, position, MatchMode::Exact, false)
    }

    /// Fully parametrized position requirement.
    pub fn position(
        tier: Tier,
        required_position: Option<i32>,
        match_mode: MatchMode,
        allow_hierarchy_override: bool,
    ) -> Result<Self, RequirementError> {
        if let Some(position) = required_position.filter(|p| *p < 0) {
            return Err(RequirementError::NegativePosition(position));
        }

        Ok(Self {
            rank: RankRule::Position {
                required_position,
                match_mode,
            },
            allow_hierarchy_override,
            ..Self::tier_member(tier)
        })
    }

    /// Members of `tier` whose role is at least `minimum`; higher tiers override.
    pub fn minimum_role(tier: Tier, minimum: Role) -> Self {
        Self {
            rank: RankRule::Role { minimum },
            ..Self::tier_member(tier)
        }
    }

    pub fn with_dev_bypass(mut self) -> Self {
        self.allow_dev_bypass = true;
        self
    }

    pub fn without_hierarchy_override(mut self) -> Self {
        self.allow_hierarchy_override = false;
        self
    }

    /// Same-tier callers must also be team leaders.
    pub fn with_leader(mut self) -> Self {
        self.require_leader = true;
        self
    }

    /// Callers must have completed their second factor.
    pub fn with_mfa(mut self) -> Self {
        self.require_mfa = true;
        self
    }

    pub fn required_tier(&self) -> Tier {
        self.required_tier
    }

    pub fn rank(&self) -> RankRule {
        self.rank
    }

    pub fn allow_hierarchy_override(&self) -> bool {
        self.allow_hierarchy_override
    }

    pub fn allow_dev_bypass(&self) -> bool {
        self.allow_dev_bypass
    }

    pub fn require_leader(&self) -> bool {
        self.require_leader
    }

    pub fn require_mfa(&self) -> bool {
        self.require_mfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_position_fails_fast() {
        assert_eq!(
            AuthorizationRequirement::minimum_position(Tier::Maintenance, -1),
            Err(RequirementError::NegativePosition(-1))
        );
        assert!(AuthorizationRequirement::exact_position(Tier::Customer, Some(-3)).is_err());
    }

    #[test]
    fn exact_requirements_disable_override() {
        let req = AuthorizationRequirement::exact_position(Tier::Customer, Some(2)).unwrap();
        assert!(!req.allow_hierarchy_override());
        assert_eq!(
            req.rank(),
            RankRule::Position {
                required_position: Some(2),
                match_mode: MatchMode::Exact
            }
        );
    }

    #[test]
    fn defaults_are_strict() {
        let req = AuthorizationRequirement::minimum_role(Tier::Super, Role::Admin);
        assert!(req.allow_hierarchy_override());
        assert!(!req.allow_dev_bypass());
        assert!(!req.require_leader());
        assert!(!req.require_mfa());

        let req = req.with_dev_bypass().with_mfa();
        assert!(req.allow_dev_bypass());
        assert!(req.require_mfa());
    }
}
