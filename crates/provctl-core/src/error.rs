//! Error types for the provctl system.

use thiserror::Error;

/// Domain error shared by every crate in the workspace.
///
/// Each variant is one error *kind*; the boundary classifies failures by
/// matching on the variant, never on the message text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvError {
    #[error("{entity} not found: {name}")]
    NotFound { entity: String, name: String },

    /// Raw input could not be decoded into a descriptor. The message is
    /// the decoder's own and is shown to the caller unchanged.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    Validation { message: String },

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("you don't have permission to do this action")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("audit trail unavailable: {0}")]
    AuditUnavailable(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProvError {
    pub fn not_found(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            name: name.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type ProvResult<T> = Result<T, ProvError>;
