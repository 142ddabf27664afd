use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("a valid collection name is required")]
    EmptyCollectionName,

    #[error("permission denied: unknown collection name {0:?}")]
    UnknownCollection(String),

    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid sort direction: {0}")]
    InvalidSortDirection(i64),
}
