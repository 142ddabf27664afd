//! Key-value, hash and sorted-set semantics over a document engine.
//!
//! [`DocStore`] is the data-access layer. It is built over an injected
//! `Arc<dyn DocumentEngine>` and emulates every structure with documents in
//! one flat collection addressed by `_key`.
//!
//! # Capabilities
//!
//! - **Options** — [`ParamOptions`] resolved by the pure
//!   [`normalize_options`] before every query
//! - **Objects** — get/set/update/delete by key, with `null`-filled field
//!   projection and pagination
//! - **Sorted sets** — `{_key, value, rank}` members with Redis-style index
//!   ranges, rank bounds, multi-key batching ([`merge`]), lexical ranges
//!   ([`lexical`]) and wildcard search ([`search`])
//! - **Intersection** — smallest-set-first intersection counts
//! - **Counters** — upsert-on-increment numeric fields
//!
//! # Example
//!
//! ```ignore
//! let store = DocStore::with_engine(Arc::new(InMemoryEngine::new()));
//! store.sorted_set_add_key("s", "a", 10.0, &ParamOptions::default()).await?;
//! let members = store.fetch_sorted_sets_range(&["s"], 0, -1, &ParamOptions::default()).await?;
//! ```

pub mod config;
pub mod counters;
pub mod error;
pub mod intersect;
pub mod lexical;
pub mod merge;
pub mod objects;
pub mod options;
pub mod search;
pub mod sorted_set;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use lexical::{lexical_filter, LexBound};
pub use merge::{batch_size, chunk_keys, merge_batch_sets, BatchMember};
pub use objects::{Paginate, UpdateOutcome, UpdateScope};
pub use options::{normalize_options, ParamOptions, ResolvedOptions};
pub use search::{build_search_pattern, SearchParams};
pub use sorted_set::{RangeQuery, RankedMember, SortedSetEntry};
pub use store::DocStore;
