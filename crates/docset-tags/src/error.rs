use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tag name cannot be more than {max} characters, got {len}")]
    NameTooLong { max: usize, len: usize },

    #[error("no such category was found with category id {0}")]
    CategoryNotFound(u64),

    #[error("no such tag {tag_id} in category {cid}")]
    TagNotFound { cid: u64, tag_id: u64 },

    #[error("user {0} requires elevated permissions for this operation")]
    PermissionDenied(u64),

    #[error("could not allocate a tag id")]
    IdUnavailable,

    #[error("role lookup failed: {0}")]
    Roles(String),

    #[error("store error: {0}")]
    Store(#[from] docset_store::StoreError),

    #[error("malformed tag document: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type TagResult<T> = Result<T, TagError>;
