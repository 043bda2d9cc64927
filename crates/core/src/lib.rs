//! `teamgate-core`: shared identifiers and the domain error model.
//!
//! This crate has no knowledge of HTTP, tokens, or storage.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{RefreshTokenId, TeamId, UserId};
