//! Document query engine interface for docset.
//!
//! The data-access layer never reaches a database handle through global
//! state. It is given an `Arc<dyn DocumentEngine>` and issues every query
//! through it: find/count/insert/update/delete/aggregate over named
//! collections, with sort, skip, limit and projection modifiers and an
//! atomic find-and-update primitive that can upsert.
//!
//! # Backends
//!
//! - [`InMemoryEngine`] — `Vec`-per-collection engine for tests, the CLI and
//!   embedding. Its state can be exported as an [`EngineSnapshot`].
//!
//! # Query Model
//!
//! - [`Filter`] — conjunction of [`Condition`]s on document fields
//! - [`FindOptions`] — sort/skip/limit/projection
//! - [`Update`] — `$set`-style field overwrite or `$inc`-style increment
//! - [`Stage`] — aggregation pipeline steps

pub mod error;
pub mod filter;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{EngineError, EngineResult};
pub use filter::{compare_values, values_equal, Clause, Condition, Filter};
pub use memory::{EngineSnapshot, InMemoryEngine};
pub use query::{FindOptions, Stage, Update, UpdateResult};
pub use traits::DocumentEngine;
