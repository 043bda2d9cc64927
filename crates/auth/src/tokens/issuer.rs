//! Assembling `JwtPackage`s for login and refresh.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{AccountUser, TeamMembership};

use super::{JwtPackage, RefreshTokenRecord, RefreshTokenStore, RefreshTokenUpdatePolicy, StoreError, renewal};

/// A signed access token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key unavailable")]
    KeyUnavailable,

    #[error("failed to sign access token: {0}")]
    Signing(String),
}

/// Signs access tokens.
#[async_trait]
pub trait TokenBuilder: Send + Sync {
    async fn create_access_token(
        &self,
        user: &AccountUser,
        team: &TeamMembership,
        device_id: Option<&str>,
        two_factor_verified: bool,
    ) -> Result<SignedAccessToken, TokenError>;
}

#[async_trait]
impl<B> TokenBuilder for Arc<B>
where
    B: TokenBuilder + ?Sized,
{
    async fn create_access_token(
        &self,
        user: &AccountUser,
        team: &TeamMembership,
        device_id: Option<&str>,
        two_factor_verified: bool,
    ) -> Result<SignedAccessToken, TokenError> {
        (**self)
            .create_access_token(user, team, device_id, two_factor_verified)
            .await
    }
}

/// Issuance settings, read once per call and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerOptions {
    pub refresh_tokens_enabled: bool,
    pub refresh_token_update_policy: RefreshTokenUpdatePolicy,
}

impl Default for IssuerOptions {
    fn default() -> Self {
        Self {
            refresh_tokens_enabled: true,
            refresh_token_update_policy: RefreshTokenUpdatePolicy::default(),
        }
    }
}

/// Why a package could not be issued.
///
/// Kept apart from authorization decisions: a failure here is never "forbidden".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("refresh token has expired")]
    RefreshTokenExpired,

    #[error("refresh token belongs to another user")]
    TokenOwnerMismatch,

    #[error("issuance cancelled")]
    Cancelled,
}

const MFA_PENDING_INFO: &str = "two-step verification required";

/// Orchestrates signing, refresh-token storage and rotation.
pub struct TokenPackageIssuer<B, S> {
    builder: B,
    store: S,
    options: IssuerOptions,
}

impl<B, S> TokenPackageIssuer<B, S>
where
    B: TokenBuilder,
    S: RefreshTokenStore,
{
    pub fn new(builder: B, store: S, options: IssuerOptions) -> Self {
        Self {
            builder,
            store,
            options,
        }
    }

    pub fn options(&self) -> IssuerOptions {
        self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issue a package after a login step.
    ///
    /// With MFA enabled and not yet verified the package asks for the second
    /// step and never carries a refresh token.
    pub async fn issue(
        &self,
        user: &AccountUser,
        team: &TeamMembership,
        two_factor_verified: bool,
        device_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<JwtPackage, IssuanceError> {
        let access = cancellable(
            cancel,
            self.builder
                .create_access_token(user, team, device_id, two_factor_verified),
        )
        .await??;

        if user.two_factor_enabled() && !two_factor_verified {
            tracing::info!(user_id = %user.id, "issued access token pending second factor");
            return Ok(JwtPackage {
                access_token: access.token,
                expiration: access.expires_at.timestamp(),
                two_step_verification_required: true,
                two_factor_provider: user.two_factor,
                refresh_token: None,
                extra_info: Some(MFA_PENDING_INFO.to_string()),
            });
        }

        let refresh_token = if self.options.refresh_tokens_enabled {
            let record = cancellable(cancel, self.store.generate_token(user)).await??;
            Some(record.payload)
        } else {
            None
        };

        tracing::info!(
            user_id = %user.id,
            team_id = %team.team_id,
            refresh = refresh_token.is_some(),
            "issued token package"
        );

        Ok(JwtPackage {
            access_token: access.token,
            expiration: access.expires_at.timestamp(),
            two_step_verification_required: false,
            two_factor_provider: user.two_factor,
            refresh_token,
            extra_info: None,
        })
    }

    /// Issue a fresh access token against an existing refresh token,
    /// rotating the refresh payload when the configured policy says so.
    pub async fn refresh(
        &self,
        existing: &RefreshTokenRecord,
        user: &AccountUser,
        team: &TeamMembership,
        device_id: Option<&str>,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<JwtPackage, IssuanceError> {
        if existing.user_id != user.id {
            return Err(IssuanceError::TokenOwnerMismatch);
        }
        if existing.is_expired(now) {
            return Err(IssuanceError::RefreshTokenExpired);
        }

        let access = cancellable(
            cancel,
            self.builder.create_access_token(user, team, device_id, true),
        )
        .await??;

        let policy = self.options.refresh_token_update_policy;
        let refresh_token = if renewal::should_rotate(existing, policy, now) {
            let rotated = cancellable(cancel, self.store.update_payload(existing, now)).await??;
            tracing::info!(user_id = %user.id, ?policy, version = rotated.version, "rotated refresh token");
            rotated.payload
        } else {
            existing.payload.clone()
        };

        Ok(JwtPackage {
            access_token: access.token,
            expiration: access.expires_at.timestamp(),
            two_step_verification_required: false,
            two_factor_provider: user.two_factor,
            refresh_token: Some(refresh_token),
            extra_info: None,
        })
    }
}

/// Race `fut` against cancellation of the enclosing request.
async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, IssuanceError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IssuanceError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::InMemoryRefreshTokenStore;
    use crate::{Role, Tier, TwoFactorProvider};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use teamgate_core::{RefreshTokenId, TeamId, UserId};

    /// Deterministic builder that records what it was asked to sign.
    #[derive(Default)]
    struct StubBuilder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenBuilder for StubBuilder {
        async fn create_access_token(
            &self,
            user: &AccountUser,
            _team: &TeamMembership,
            device_id: Option<&str>,
            two_factor_verified: bool,
        ) -> Result<SignedAccessToken, TokenError> {
            if self.fail {
                return Err(TokenError::KeyUnavailable);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SignedAccessToken {
                token: format!("{}:{}:{}:{n}", user.id, device_id.unwrap_or("-"), two_factor_verified),
                expires_at: DateTime::from_timestamp(1_800_000_000, 0).unwrap(),
            })
        }
    }

    fn issuer(options: IssuerOptions) -> TokenPackageIssuer<StubBuilder, Arc<InMemoryRefreshTokenStore>> {
        TokenPackageIssuer::new(
            StubBuilder::default(),
            Arc::new(InMemoryRefreshTokenStore::new(Duration::days(14))),
            options,
        )
    }

    fn team() -> TeamMembership {
        TeamMembership::new(TeamId::new(), Tier::Maintenance, Role::Manager).with_position(3)
    }

    fn mfa_user() -> AccountUser {
        AccountUser::new(UserId::new(), "mfa@example.com").with_two_factor(TwoFactorProvider::Email)
    }

    #[tokio::test]
    async fn mfa_pending_never_gets_refresh_token() {
        let issuer = issuer(IssuerOptions::default());
        let package = issuer
            .issue(&mfa_user(), &team(), false, Some("phone"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(package.two_step_verification_required);
        assert_eq!(package.two_factor_provider, Some(TwoFactorProvider::Email));
        assert_eq!(package.refresh_token, None);
        assert_eq!(package.expiration, 1_800_000_000);
        assert!(issuer.store().is_empty());
    }

    #[tokio::test]
    async fn verified_login_gets_refresh_token_when_enabled() {
        let issuer = issuer(IssuerOptions::default());
        let user = mfa_user();
        let package = issuer
            .issue(&user, &team(), true, None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!package.two_step_verification_required);
        assert_eq!(package.two_factor_provider, Some(TwoFactorProvider::Email));
        let payload = package.refresh_token.unwrap();
        let stored = issuer.store().find_by_payload(&payload).await.unwrap().unwrap();
        assert_eq!(stored.user_id, user.id);
    }

    #[tokio::test]
    async fn refresh_toggle_off_means_no_refresh_token() {
        let issuer = issuer(IssuerOptions {
            refresh_tokens_enabled: false,
            ..Default::default()
        });
        let user = AccountUser::new(UserId::new(), "plain@example.com");
        let package = issuer
            .issue(&user, &team(), false, None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!package.two_step_verification_required);
        assert_eq!(package.two_factor_provider, None);
        assert_eq!(package.refresh_token, None);
    }

    #[tokio::test]
    async fn signing_failure_is_an_issuance_error() {
        let issuer = TokenPackageIssuer::new(
            StubBuilder {
                fail: true,
                ..Default::default()
            },
            InMemoryRefreshTokenStore::new(Duration::days(1)),
            IssuerOptions::default(),
        );
        let err = issuer
            .issue(&mfa_user(), &team(), true, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, IssuanceError::Token(TokenError::KeyUnavailable));
    }

    #[tokio::test]
    async fn cancelled_request_aborts() {
        let issuer = issuer(IssuerOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = issuer
            .issue(&mfa_user(), &team(), true, None, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, IssuanceError::Cancelled);
    }

    async fn stored_record(
        issuer: &TokenPackageIssuer<StubBuilder, Arc<InMemoryRefreshTokenStore>>,
        user: &AccountUser,
        created: DateTime<Utc>,
    ) -> RefreshTokenRecord {
        let record = RefreshTokenRecord::new(
            RefreshTokenId::new(),
            user.id,
            "existing-payload",
            created,
            created + Duration::hours(100),
        )
        .unwrap();
        issuer.store().insert(record.clone()).unwrap();
        record
    }

    #[tokio::test]
    async fn refresh_keeps_payload_before_threshold() {
        let issuer = issuer(IssuerOptions::default());
        let user = mfa_user();
        let created = Utc::now();
        let record = stored_record(&issuer, &user, created).await;

        let package = issuer
            .refresh(&record, &user, &team(), Some("tablet"), created + Duration::hours(50), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(package.refresh_token.as_deref(), Some("existing-payload"));
        assert!(package.access_token.ends_with(":tablet:true:0"));
        assert!(!package.two_step_verification_required);
    }

    #[tokio::test]
    async fn refresh_rotates_past_threshold() {
        let issuer = issuer(IssuerOptions::default());
        let user = mfa_user();
        let created = Utc::now();
        let record = stored_record(&issuer, &user, created).await;

        let package = issuer
            .refresh(&record, &user, &team(), None, created + Duration::hours(51), &CancellationToken::new())
            .await
            .unwrap();

        let rotated = package.refresh_token.unwrap();
        assert_ne!(rotated, "existing-payload");
        let stored = issuer.store().find_by_payload(&rotated).await.unwrap().unwrap();
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.version, 1);
        assert_eq!(stored.created_utc, created + Duration::hours(51));
        assert_eq!(stored.expires_utc, created + Duration::hours(51) + Duration::days(14));
    }

    #[tokio::test]
    async fn refresh_rejects_foreign_and_expired_tokens() {
        let issuer = issuer(IssuerOptions::default());
        let owner = mfa_user();
        let created = Utc::now();
        let record = stored_record(&issuer, &owner, created).await;
        let cancel = CancellationToken::new();

        let stranger = AccountUser::new(UserId::new(), "other@example.com");
        assert_eq!(
            issuer.refresh(&record, &stranger, &team(), None, created, &cancel).await,
            Err(IssuanceError::TokenOwnerMismatch)
        );

        assert_eq!(
            issuer
                .refresh(&record, &owner, &team(), None, created + Duration::hours(100), &cancel)
                .await,
            Err(IssuanceError::RefreshTokenExpired)
        );
    }

    #[tokio::test]
    async fn concurrent_rotation_surfaces_conflict() {
        let issuer = issuer(IssuerOptions {
            refresh_token_update_policy: RefreshTokenUpdatePolicy::Always,
            ..Default::default()
        });
        let user = mfa_user();
        let created = Utc::now();
        let record = stored_record(&issuer, &user, created).await;
        let cancel = CancellationToken::new();

        issuer.refresh(&record, &user, &team(), None, created, &cancel).await.unwrap();
        assert_eq!(
            issuer.refresh(&record, &user, &team(), None, created, &cancel).await,
            Err(IssuanceError::Store(StoreError::Conflict))
        );
    }
}
