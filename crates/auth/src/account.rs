//! Identity inputs to token issuance: the account and its team membership.

use serde::{Deserialize, Serialize};

use teamgate_core::{TeamId, UserId};

use crate::{Role, Tier};

/// Second-factor channel configured for an account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoFactorProvider {
    Email,
    Phone,
    AuthenticatorApp,
}

/// An authenticated account, as seen by token issuance.
///
/// Credential material never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: UserId,
    pub email: String,
    /// Configured second factor. `Some` means MFA is enabled.
    pub two_factor: Option<TwoFactorProvider>,
}

impl AccountUser {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            two_factor: None,
        }
    }

    pub fn with_two_factor(mut self, provider: TwoFactorProvider) -> Self {
        self.two_factor = Some(provider);
        self
    }

    pub fn two_factor_enabled(&self) -> bool {
        self.two_factor.is_some()
    }
}

/// A user's membership in a team for the current session.
///
/// This is the authorization boundary object: it states *which tier* the user
/// acts in, their sub-role and their seniority there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: TeamId,
    pub tier: Tier,
    pub role: Role,
    /// Seniority within the tier; `None` when never assigned.
    pub position: Option<i32>,
    pub is_leader: bool,
}

impl TeamMembership {
    pub fn new(team_id: TeamId, tier: Tier, role: Role) -> Self {
        Self {
            team_id,
            tier,
            role,
            position: None,
            is_leader: false,
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn as_leader(mut self) -> Self {
        self.is_leader = true;
        self
    }
}
