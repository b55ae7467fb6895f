//! Error taxonomy for protocol operations.
//!
//! Every variant is local to one operation; nothing here is retried
//! internally. A rejected mutation leaves stored state untouched.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Version conflict on {entity} {id}: expected {expected}, found {actual}")]
    Conflict {
        entity: String,
        id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProtocolError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &str, id: impl ToString, expected: i64, actual: i64) -> Self {
        Self::Conflict {
            entity: entity.into(),
            id: id.to_string(),
            expected,
            actual,
        }
    }

    /// True for stale-token rejections the caller should retry after a re-fetch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<rusqlite::Error> for ProtocolError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(error))
    }
}
