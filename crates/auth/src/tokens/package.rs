use serde::{Deserialize, Serialize};

use crate::TwoFactorProvider;

/// Token response handed to clients after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtPackage {
    pub access_token: String,
    /// Access-token expiry, unix seconds.
    pub expiration: i64,
    pub two_step_verification_required: bool,
    pub two_factor_provider: Option<TwoFactorProvider>,
    pub refresh_token: Option<String>,
    pub extra_info: Option<String>,
}
