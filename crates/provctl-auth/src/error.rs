//! Authentication error types.

use provctl_core::error::ProvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for ProvError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                ProvError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::Crypto(msg) => ProvError::Internal(msg),
        }
    }
}
