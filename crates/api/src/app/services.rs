//! Service wiring: issuer, stores, directory, authorizer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use teamgate_auth::tokens::{
    InMemoryRefreshTokenStore, IssuerOptions, RefreshTokenStore, TokenBuilder, TokenPackageIssuer,
};
use teamgate_auth::{
    AccountUser, AuthorizationEngine, Authorizer, DevBypass, Hs256JwtValidator, Hs256TokenBuilder, JwtValidator,
    TeamMembership,
};
use teamgate_core::UserId;

use crate::config::ApiConfig;

pub type AppIssuer = TokenPackageIssuer<Arc<dyn TokenBuilder>, Arc<dyn RefreshTokenStore>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("account directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the account and active team membership behind a login or a
/// refresh token.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_member(&self, user_id: UserId) -> Result<Option<(AccountUser, TeamMembership)>, DirectoryError>;
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    inner: RwLock<HashMap<UserId, (AccountUser, TeamMembership)>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: AccountUser, team: TeamMembership) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(user.id, (user, team));
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_member(&self, user_id: UserId) -> Result<Option<(AccountUser, TeamMembership)>, DirectoryError> {
        let map = self
            .inner
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(&user_id).cloned())
    }
}

/// Everything handlers and middleware need, shared behind `Arc`s.
#[derive(Clone)]
pub struct AppServices {
    pub issuer: Arc<AppIssuer>,
    pub directory: Arc<dyn AccountDirectory>,
    pub authorizer: Arc<dyn Authorizer>,
    pub jwt: Arc<dyn JwtValidator>,
    pub is_dev_environment: bool,
}

/// In-memory wiring (dev/test): HS256 signing, in-memory refresh tokens,
/// a directory seeded from config, engine wrapped in dev bypass.
pub fn build_in_memory_services(config: &ApiConfig) -> (AppServices, Arc<InMemoryAccountDirectory>) {
    let builder: Arc<dyn TokenBuilder> = Arc::new(Hs256TokenBuilder::new(&config.jwt));
    let store: Arc<dyn RefreshTokenStore> = Arc::new(InMemoryRefreshTokenStore::new(config.refresh_token_lifetime));
    let issuer = Arc::new(TokenPackageIssuer::new(builder, store, config.issuer));
    let directory = Arc::new(InMemoryAccountDirectory::new());
    for seed in &config.seed_accounts {
        directory.insert(seed.user.clone(), seed.team.clone());
    }

    let services = AppServices {
        issuer,
        directory: directory.clone(),
        authorizer: Arc::new(DevBypass::new(AuthorizationEngine)),
        jwt: Arc::new(Hs256JwtValidator::new(&config.jwt)),
        is_dev_environment: config.environment.is_development(),
    };

    (services, directory)
}

impl AppServices {
    pub fn issuer_options(&self) -> IssuerOptions {
        self.issuer.options()
    }
}
