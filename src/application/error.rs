//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, LevelsError};

/// Application errors wrap domain errors and add registry and storage context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid levels for '{name}': {source}")]
    InvalidLevels {
        name: String,
        #[source]
        source: LevelsError,
    },

    #[error("invalid domain structure: {0}")]
    InvalidDomainStruct(String),

    #[error("optimistic conflict on '{key}': loaded version {expected}, stored version {found}")]
    OptimisticConflict {
        key: String,
        expected: u64,
        found: u64,
    },

    #[error("store operation failed: {context}")]
    Store {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
