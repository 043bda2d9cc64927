//! Access/refresh token issuance and renewal.

pub mod issuer;
pub mod package;
pub mod renewal;
pub mod store;

pub use issuer::{IssuanceError, IssuerOptions, SignedAccessToken, TokenBuilder, TokenError, TokenPackageIssuer};
pub use package::JwtPackage;
pub use renewal::{RefreshTokenUpdatePolicy, elapsed_fraction, should_rotate};
pub use store::{InMemoryRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore, StoreError, generate_payload};
