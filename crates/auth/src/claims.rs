use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use teamgate_core::{TeamId, UserId};

use crate::{Role, Tier};

/// Access-token claims model.
///
/// This is the claim set teamgate signs into access tokens and expects back
/// once a token has been decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Team the session acts within.
    pub team_id: TeamId,

    pub tier: Tier,
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    #[serde(default)]
    pub leader: bool,

    /// Whether the second factor was completed for this session.
    #[serde(default)]
    pub mfa_verified: bool,

    /// Second factor is enabled on the account but not completed yet.
    #[serde(default)]
    pub mfa_pending: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Issuer.
    pub iss: String,

    /// Issued-at timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token could not be decoded or its signature is invalid")]
    Malformed,

    #[error("token was issued by '{0}'")]
    WrongIssuer(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of access claims.
///
/// Signature verification and decoding happen in [`crate::jwt`]; this checks
/// the claims only, against an explicit `now`.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
