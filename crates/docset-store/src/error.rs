use docset_engine::EngineError;
use docset_types::TypeError;

/// Errors from data-access operations.
///
/// The first four variants are validation failures: they are returned before
/// any query reaches the engine. [`StoreError::Engine`] passes engine failures
/// through untouched.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested collection is not on the allow-list.
    #[error("invalid collection {name:?}: {reason}")]
    InvalidCollection { name: String, reason: String },

    /// A key is empty or numeric where a named key is required.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A required argument is missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by the document engine.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is a caller-side validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCollection { .. }
                | Self::InvalidKey { .. }
                | Self::InvalidArgument(_)
                | Self::InvalidConfig(_)
        )
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::EmptyCollectionName => Self::InvalidCollection {
                name: String::new(),
                reason: e.to_string(),
            },
            TypeError::UnknownCollection(ref name) => Self::InvalidCollection {
                name: name.clone(),
                reason: e.to_string(),
            },
            TypeError::InvalidKey { key, reason } => Self::InvalidKey { key, reason },
            TypeError::InvalidSortDirection(_) => Self::InvalidArgument(e.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
