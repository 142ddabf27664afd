//! Foundation types for docset.
//!
//! docset emulates key-value, hash, and sorted-set semantics on top of a
//! general-purpose document database. Every record lives in one flat
//! collection and is addressed by a synthetic `_key` field; sorted-set
//! members add a `value` and a numeric `rank`.
//!
//! # Key Types
//!
//! - [`Document`] — schemaless JSON object stored by the engine
//! - [`Collection`] — the fixed allow-list of collection names
//! - [`SortSpec`] / [`SortDirection`] — natural or field ordering
//! - [`Projection`] — include/exclude field lists
//! - [`validate_object_key`] — rules for keys written by the object store

pub mod collection;
pub mod document;
pub mod error;
pub mod key;
pub mod sort;

pub use collection::Collection;
pub use document::{
    document_key, shape_fields, stamp_key, Document, ID_FIELD, KEY_FIELD, RANK_FIELD, VALUE_FIELD,
};
pub use error::TypeError;
pub use key::validate_object_key;
pub use sort::{Projection, SortDirection, SortSpec};

pub use serde_json::{Map, Number, Value};
