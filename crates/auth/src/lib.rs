//! `teamgate-auth`: tier-based authorization and session token issuance.
//!
//! Authorization here is pure: no IO, no HTTP. Token issuance talks to its
//! collaborators only through the `TokenBuilder` and `RefreshTokenStore` traits.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod context;
pub mod hierarchy;
pub mod jwt;
pub mod position;
pub mod requirement;
pub mod roles;
pub mod tier;
pub mod tokens;

pub use account::{AccountUser, TeamMembership, TwoFactorProvider};
pub use authorize::{
    AuthorizationDecision, AuthorizationEngine, AuthorizationExplanation, Authorizer, DenialKind, DenialReason,
    DevBypass, authorize, explain_authorization,
};
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use context::AuthContext;
pub use jwt::{Hs256JwtValidator, Hs256TokenBuilder, JwtOptions, JwtValidator};
pub use position::MatchMode;
pub use requirement::{AuthorizationRequirement, RankRule, RequirementError};
pub use roles::Role;
pub use tier::Tier;
