//! Refresh-token persistence boundary and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use teamgate_core::{RefreshTokenId, UserId};

use crate::AccountUser;

/// A persisted refresh token.
///
/// # Invariants
/// - `expires_utc > created_utc`
/// - `version` increases by one on every payload rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub payload: String,
    pub created_utc: DateTime<Utc>,
    pub expires_utc: DateTime<Utc>,
    pub version: u64,
}

impl RefreshTokenRecord {
    pub fn new(
        id: RefreshTokenId,
        user_id: UserId,
        payload: impl Into<String>,
        created_utc: DateTime<Utc>,
        expires_utc: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        if expires_utc <= created_utc {
            return Err(StoreError::InvalidLifetime);
        }
        Ok(Self {
            id,
            user_id,
            payload: payload.into(),
            created_utc,
            expires_utc,
            version: 0,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_utc
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("refresh token not found")]
    NotFound,

    /// The record changed since the caller read it (concurrent rotation).
    #[error("refresh token was modified concurrently")]
    Conflict,

    #[error("refresh token lifetime must be positive")]
    InvalidLifetime,

    #[error("refresh token store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for refresh tokens.
///
/// Implementations must reject `update_payload` when the stored record no
/// longer matches the caller's copy (`version` and `payload`), so two racing
/// rotations cannot both succeed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Create and persist a new refresh token for `user`.
    async fn generate_token(&self, user: &AccountUser) -> Result<RefreshTokenRecord, StoreError>;

    /// Replace the payload of `record`, returning the updated record. The
    /// rotated record's window starts at `now`.
    async fn update_payload(
        &self,
        record: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError>;

    /// Look up a live or expired record by its payload.
    async fn find_by_payload(&self, payload: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Remove every record belonging to `user_id`. Returns how many were removed.
    async fn revoke_for_user(&self, user_id: UserId) -> Result<usize, StoreError>;
}

#[async_trait]
impl<S> RefreshTokenStore for Arc<S>
where
    S: RefreshTokenStore + ?Sized,
{
    async fn generate_token(&self, user: &AccountUser) -> Result<RefreshTokenRecord, StoreError> {
        (**self).generate_token(user).await
    }

    async fn update_payload(
        &self,
        record: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        (**self).update_payload(record, now).await
    }

    async fn find_by_payload(&self, payload: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        (**self).find_by_payload(payload).await
    }

    async fn revoke_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        (**self).revoke_for_user(user_id).await
    }
}

/// Random opaque payload: 32 bytes from the OS RNG, URL-safe base64.
pub fn generate_payload() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// In-memory refresh token store for tests/dev.
///
/// Records are indexed by payload for lookups. Expired records are purged
/// whenever a new token is generated.
#[derive(Debug)]
pub struct InMemoryRefreshTokenStore {
    inner: RwLock<Records>,
    lifetime: Duration,
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<RefreshTokenId, RefreshTokenRecord>,
    by_payload: HashMap<String, RefreshTokenId>,
}

impl Records {
    fn insert(&mut self, record: RefreshTokenRecord) {
        if let Some(previous) = self.by_id.remove(&record.id) {
            self.by_payload.remove(&previous.payload);
        }
        self.by_payload.insert(record.payload.clone(), record.id);
        self.by_id.insert(record.id, record);
    }

    fn retain(&mut self, keep: impl Fn(&RefreshTokenRecord) -> bool) -> usize {
        let before = self.by_id.len();
        self.by_id.retain(|_id, r| keep(r));
        let by_id = &self.by_id;
        self.by_payload.retain(|_payload, id| by_id.contains_key(id));
        before - self.by_id.len()
    }
}

impl InMemoryRefreshTokenStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            inner: RwLock::new(Records::default()),
            lifetime,
        }
    }

    /// Insert a record as-is (fixtures, imports).
    pub fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        self.write()?.insert(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|r| r.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Records>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn window_from(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), StoreError> {
        let expires = now.checked_add_signed(self.lifetime).ok_or(StoreError::InvalidLifetime)?;
        Ok((now, expires))
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn generate_token(&self, user: &AccountUser) -> Result<RefreshTokenRecord, StoreError> {
        let now = Utc::now();
        let (created, expires) = self.window_from(now)?;
        let record = RefreshTokenRecord::new(RefreshTokenId::new(), user.id, generate_payload(), created, expires)?;

        let mut records = self.write()?;
        let purged = records.retain(|r| !r.is_expired(now));
        if purged > 0 {
            tracing::debug!(purged, "purged expired refresh tokens");
        }
        records.insert(record.clone());
        Ok(record)
    }

    async fn update_payload(
        &self,
        record: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let (created, expires) = self.window_from(now)?;
        let mut records = self.write()?;

        let stored = records.by_id.get(&record.id).ok_or(StoreError::NotFound)?;
        if stored.version != record.version || stored.payload != record.payload {
            return Err(StoreError::Conflict);
        }

        let rotated = RefreshTokenRecord {
            payload: generate_payload(),
            created_utc: created,
            expires_utc: expires,
            version: stored.version + 1,
            ..stored.clone()
        };
        records.insert(rotated.clone());
        Ok(rotated)
    }

    async fn find_by_payload(&self, payload: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let records = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records
            .by_payload
            .get(payload)
            .and_then(|id| records.by_id.get(id))
            .cloned())
    }

    async fn revoke_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        Ok(self.write()?.retain(|r| r.user_id != user_id))
    }
}
