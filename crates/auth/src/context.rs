//! Per-request authorization context.

use serde::Serialize;

use crate::{AccessClaims, Role, Tier};

/// What the authorization engine knows about the caller.
///
/// Built once per request from verified claims (or as anonymous) and
/// discarded afterwards. It never touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AuthContext {
    pub is_authenticated: bool,
    pub is_dev_environment: bool,
    /// `None` when the caller belongs to no team; every tier check then fails.
    pub tier: Option<Tier>,
    /// `None` when no position is assigned.
    pub position: Option<i32>,
    pub is_leader: bool,
    pub role: Option<Role>,
    pub is_mfa_verified: bool,
}

impl AuthContext {
    /// Context for a request that carried no valid credentials.
    pub fn anonymous(is_dev_environment: bool) -> Self {
        Self {
            is_dev_environment,
            ..Default::default()
        }
    }

    /// Read the context out of verified access-token claims.
    ///
    /// A token still waiting for its second factor authenticates nothing.
    pub fn from_claims(claims: &AccessClaims, is_dev_environment: bool) -> Self {
        if claims.mfa_pending {
            return Self::anonymous(is_dev_environment);
        }
        Self {
            is_authenticated: true,
            is_dev_environment,
            tier: Some(claims.tier),
            position: claims.position,
            is_leader: claims.leader,
            role: Some(claims.role),
            is_mfa_verified: claims.mfa_verified,
        }
    }

    /// Authenticated member of `tier` (test and fixture helper).
    pub fn member(tier: Tier, role: Role, position: Option<i32>) -> Self {
        Self {
            is_authenticated: true,
            tier: Some(tier),
            position,
            role: Some(role),
            is_mfa_verified: true,
            ..Default::default()
        }
    }
}
