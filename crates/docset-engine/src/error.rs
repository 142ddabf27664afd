/// Errors from document engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A field targeted by an increment holds a non-numeric value.
    #[error("cannot increment non-numeric field {field:?}")]
    NonNumericField { field: String },

    /// An increment produced a value that cannot be represented.
    #[error("numeric overflow incrementing field {field:?}")]
    NumericOverflow { field: String },

    /// A document or snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal state of the backend is unusable (e.g. a poisoned lock).
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Failure reported by an external backend (connection loss, write
    /// conflict). Passed through unchanged.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
