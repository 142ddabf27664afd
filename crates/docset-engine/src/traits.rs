use async_trait::async_trait;
use docset_types::{Collection, Document, Projection, SortDirection, SortSpec};

use crate::error::EngineResult;
use crate::filter::Filter;
use crate::query::{FindOptions, Stage, Update, UpdateResult};

/// General-purpose document query engine.
///
/// docset never talks to a database directly; it is handed an implementation
/// of this trait at construction. Implementations must satisfy:
/// - Single-document mutations (`find_one_and_update`, `update_one`,
///   `delete_one`) are atomic with respect to each other.
/// - Multi-document operations need not be atomic as a group.
/// - Backend failures are returned as errors, never swallowed.
/// - Documents handed out are owned copies; mutating them never touches
///   stored state.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// All documents matching `filter`, with sort/skip/limit/projection.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> EngineResult<Vec<Document>>;

    /// Number of matching documents, stopping at `limit` when given.
    async fn count(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: Option<u64>,
    ) -> EngineResult<u64>;

    /// Insert every document. Returns the number inserted.
    async fn insert_many(&self, collection: Collection, docs: Vec<Document>) -> EngineResult<u64>;

    /// Atomically update the first match and return it after the update.
    ///
    /// With `upsert`, a missing document is created from the filter's
    /// equality clauses before the update is applied. Without it, a miss
    /// returns `Ok(None)`.
    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> EngineResult<Option<Document>>;

    /// Update the first match.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> EngineResult<UpdateResult>;

    /// Update every match.
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> EngineResult<UpdateResult>;

    /// Delete the first match. Returns the number deleted (0 or 1).
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> EngineResult<u64>;

    /// Delete every match. Returns the number deleted.
    async fn delete_many(&self, collection: Collection, filter: &Filter) -> EngineResult<u64>;

    /// Run an aggregation pipeline and materialize the output.
    async fn aggregate(&self, collection: Collection, pipeline: &[Stage])
        -> EngineResult<Vec<Document>>;

    /// First match in insertion order.
    ///
    /// Default implementation calls `find()` with a limit of one.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: Option<Projection>,
    ) -> EngineResult<Option<Document>> {
        let mut options = FindOptions::new()
            .sort(SortSpec::Natural(SortDirection::Ascending))
            .limit(1);
        options.projection = projection;
        Ok(self.find(collection, filter, &options).await?.into_iter().next())
    }
}
