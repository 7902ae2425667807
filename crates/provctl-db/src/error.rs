//! Database-specific error types and conversions.

use provctl_core::error::ProvError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with name {name}")]
    NotFound { entity: String, name: String },

    #[error("{0}")]
    Conflict(String),
}

impl From<DbError> for ProvError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, name } => ProvError::NotFound { entity, name },
            DbError::Conflict(message) => ProvError::Conflict(message),
            other => ProvError::Store(other.to_string()),
        }
    }
}
