//! Runtime configuration read from the environment.

use chrono::Duration;
use serde::Deserialize;

use teamgate_auth::{AccountUser, JwtOptions, TeamMembership};
use teamgate_auth::tokens::{IssuerOptions, RefreshTokenUpdatePolicy};

const DEV_SECRET: &str = "dev-secret";

const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 14;
const MAX_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Deployment environment. Only `Development` enables dev bypass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// An account preloaded into the in-memory directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedAccount {
    pub user: AccountUser,
    pub team: TeamMembership,
}

/// Everything the API binary needs to start.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub environment: Environment,
    pub jwt: JwtOptions,
    pub issuer: IssuerOptions,
    pub refresh_token_lifetime: Duration,
    /// Accounts loaded into the directory at startup (`SEED_ACCOUNTS`, JSON array).
    pub seed_accounts: Vec<SeedAccount>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to
    /// defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);

        let secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_SECRET.to_string()
        });

        let mut jwt = JwtOptions::new(secret);
        if let Some(issuer) = lookup("JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        jwt.access_token_minutes = parse_bounded(
            "ACCESS_TOKEN_MINUTES",
            &lookup,
            jwt.access_token_minutes,
            MAX_ACCESS_TOKEN_MINUTES,
        );

        let defaults = IssuerOptions::default();
        let issuer = IssuerOptions {
            refresh_tokens_enabled: parse_or("REFRESH_TOKENS_ENABLED", &lookup, defaults.refresh_tokens_enabled),
            refresh_token_update_policy: parse_or(
                "REFRESH_TOKEN_UPDATE_POLICY",
                &lookup,
                defaults.refresh_token_update_policy,
            ),
        };

        let refresh_days = parse_bounded(
            "REFRESH_TOKEN_DAYS",
            &lookup,
            DEFAULT_REFRESH_TOKEN_DAYS,
            MAX_REFRESH_TOKEN_DAYS,
        );
        let refresh_token_lifetime = Duration::try_days(refresh_days)
            .unwrap_or_else(|| Duration::days(DEFAULT_REFRESH_TOKEN_DAYS));

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            environment,
            jwt,
            issuer,
            refresh_token_lifetime,
            seed_accounts: parse_seed_accounts(&lookup),
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!(key, value = %raw, error = %e, "invalid config value; using default");
            default
        }),
    }
}

fn parse_seed_accounts(lookup: &impl Fn(&str) -> Option<String>) -> Vec<SeedAccount> {
    let Some(raw) = lookup("SEED_ACCOUNTS") else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(key = "SEED_ACCOUNTS", error = %e, "invalid seed accounts; starting with none");
        Vec::new()
    })
}

/// Parse a count in `1..=max`; anything else falls back to `default`.
fn parse_bounded(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: i64, max: i64) -> i64 {
    let value = parse_or(key, lookup, default);
    if (1..=max).contains(&value) {
        value
    } else {
        tracing::warn!(key, value, max, "config value out of range; using default");
        default
    }
}
