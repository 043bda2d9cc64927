//! HS256 signing and verification of access tokens.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::claims::{AccessClaims, TokenValidationError, validate_claims};
use crate::tokens::{SignedAccessToken, TokenBuilder, TokenError};
use crate::{AccountUser, TeamMembership};

/// Access-token signing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtOptions {
    pub secret: String,
    pub issuer: String,
    pub access_token_minutes: i64,
}

impl JwtOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "teamgate".to_string(),
            access_token_minutes: 15,
        }
    }

    /// `None` when the configured minutes do not fit a `Duration`.
    pub fn access_token_lifetime(&self) -> Option<Duration> {
        Duration::try_minutes(self.access_token_minutes)
    }
}

/// Signs [`AccessClaims`] with a shared HS256 secret.
pub struct Hs256TokenBuilder {
    key: EncodingKey,
    issuer: String,
    lifetime: Option<Duration>,
}

impl Hs256TokenBuilder {
    pub fn new(options: &JwtOptions) -> Self {
        Self {
            key: EncodingKey::from_secret(options.secret.as_bytes()),
            issuer: options.issuer.clone(),
            lifetime: options.access_token_lifetime(),
        }
    }

    /// Sign claims for `user` in `team`, issued at `now`.
    pub fn sign_at(
        &self,
        user: &AccountUser,
        team: &TeamMembership,
        device_id: Option<&str>,
        two_factor_verified: bool,
        now: DateTime<Utc>,
    ) -> Result<SignedAccessToken, TokenError> {
        let lifetime = self
            .lifetime
            .filter(|l| *l > Duration::zero())
            .ok_or_else(|| TokenError::Signing("access token lifetime must be positive".to_string()))?;
        let exp = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| TokenError::Signing("access token expiry out of range".to_string()))?;

        let claims = AccessClaims {
            sub: user.id,
            team_id: team.team_id,
            tier: team.tier,
            role: team.role,
            position: team.position,
            leader: team.is_leader,
            mfa_verified: two_factor_verified,
            mfa_pending: user.two_factor_enabled() && !two_factor_verified,
            device_id: device_id.map(str::to_string),
            iss: self.issuer.clone(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedAccessToken {
            token,
            expires_at: claims.exp,
        })
    }
}

#[async_trait]
impl TokenBuilder for Hs256TokenBuilder {
    async fn create_access_token(
        &self,
        user: &AccountUser,
        team: &TeamMembership,
        device_id: Option<&str>,
        two_factor_verified: bool,
    ) -> Result<SignedAccessToken, TokenError> {
        self.sign_at(user, team, device_id, two_factor_verified, Utc::now())
    }
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenValidationError>;
}

/// HS256 validator paired with [`Hs256TokenBuilder`].
pub struct Hs256JwtValidator {
    key: DecodingKey,
    issuer: String,
}

impl Hs256JwtValidator {
    pub fn new(options: &JwtOptions) -> Self {
        Self {
            key: DecodingKey::from_secret(options.secret.as_bytes()),
            issuer: options.issuer.clone(),
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenValidationError> {
        // Time checks run against the caller's `now` in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.key, &validation)
            .map_err(|_| TokenValidationError::Malformed)?;
        let claims = data.claims;

        if claims.iss != self.issuer {
            return Err(TokenValidationError::WrongIssuer(claims.iss));
        }
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}
