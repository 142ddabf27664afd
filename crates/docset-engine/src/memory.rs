use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use docset_types::{Collection, Document, SortDirection, SortSpec, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::filter::{compare_values, Filter};
use crate::query::{FindOptions, Stage, Update, UpdateResult};
use crate::traits::DocumentEngine;

static NULL: Value = Value::Null;

type Collections = HashMap<Collection, Vec<Document>>;

/// In-memory document engine.
///
/// Intended for tests, the CLI and embedding. Each collection is a `Vec` kept
/// in insertion order, which doubles as the natural sort order. Every stored
/// document is stamped with a monotonically increasing numeric `_id`. All
/// state sits behind one `RwLock`, so each call is atomic.
pub struct InMemoryEngine {
    collections: RwLock<Collections>,
    next_id: AtomicU64,
}

/// Serializable image of an [`InMemoryEngine`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub next_id: u64,
    pub collections: BTreeMap<String, Vec<Document>>,
}

impl InMemoryEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Rebuild an engine from a snapshot.
    pub fn from_snapshot(snapshot: EngineSnapshot) -> EngineResult<Self> {
        let mut collections = HashMap::new();
        for (name, docs) in snapshot.collections {
            let collection = Collection::parse(&name)
                .map_err(|e| EngineError::Serialization(e.to_string()))?;
            collections.insert(collection, docs);
        }
        Ok(Self {
            collections: RwLock::new(collections),
            next_id: AtomicU64::new(snapshot.next_id.max(1)),
        })
    }

    /// Export the full state.
    pub fn snapshot(&self) -> EngineResult<EngineSnapshot> {
        let map = self.read()?;
        Ok(EngineSnapshot {
            next_id: self.next_id.load(Ordering::SeqCst),
            collections: map
                .iter()
                .map(|(c, docs)| (c.as_str().to_string(), docs.clone()))
                .collect(),
        })
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.read()
            .map(|map| map.get(&collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Returns `true` if no collection holds any document.
    pub fn is_empty(&self) -> bool {
        self.read()
            .map(|map| map.values().all(Vec::is_empty))
            .unwrap_or(true)
    }

    /// Remove every document from every collection.
    pub fn clear(&self) -> EngineResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| EngineError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| EngineError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn stamp_id(&self, doc: &mut Document) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        doc.insert(ID_FIELD.to_string(), Value::from(id));
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Order documents in place. Sorting is stable, so ties keep insertion order.
fn sort_documents(docs: &mut [&Document], sort: Option<&SortSpec>) {
    match sort {
        None | Some(SortSpec::Natural(SortDirection::Ascending)) => {}
        Some(SortSpec::Natural(SortDirection::Descending)) => docs.reverse(),
        Some(SortSpec::Field { field, direction }) => docs.sort_by(|a, b| {
            let l = a.get(field).unwrap_or(&NULL);
            let r = b.get(field).unwrap_or(&NULL);
            direction.apply(compare_values(l, r))
        }),
    }
}

fn select(docs: &[Document], filter: &Filter, options: &FindOptions) -> Vec<Document> {
    let mut matched: Vec<&Document> = docs.iter().filter(|d| filter.matches(d)).collect();
    sort_documents(&mut matched, options.sort.as_ref());
    let limit = options.limit.map_or(usize::MAX, |l| l as usize);
    matched
        .into_iter()
        .skip(options.skip as usize)
        .take(limit)
        .map(|d| match &options.projection {
            Some(p) => p.apply(d.clone()),
            None => d.clone(),
        })
        .collect()
}

fn run_stage(docs: Vec<Document>, stage: &Stage) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Sort(sort) => {
            let mut refs: Vec<&Document> = docs.iter().collect();
            sort_documents(&mut refs, Some(sort));
            refs.into_iter().cloned().collect()
        }
        Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
        Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
        Stage::Project(p) => docs.into_iter().map(|d| p.apply(d)).collect(),
        Stage::Count(name) => {
            let mut out = Document::new();
            out.insert(name.clone(), Value::from(docs.len() as u64));
            vec![out]
        }
    }
}

#[async_trait]
impl DocumentEngine for InMemoryEngine {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> EngineResult<Vec<Document>> {
        let map = self.read()?;
        Ok(map
            .get(&collection)
            .map(|docs| select(docs, filter, options))
            .unwrap_or_default())
    }

    async fn count(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: Option<u64>,
    ) -> EngineResult<u64> {
        let map = self.read()?;
        let n = map
            .get(&collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(d)).count() as u64);
        Ok(limit.map_or(n, |l| n.min(l)))
    }

    async fn insert_many(&self, collection: Collection, docs: Vec<Document>) -> EngineResult<u64> {
        let mut map = self.write()?;
        let target = map.entry(collection).or_default();
        let n = docs.len() as u64;
        for mut doc in docs {
            self.stamp_id(&mut doc);
            target.push(doc);
        }
        debug!(collection = %collection, inserted = n, "insert_many");
        Ok(n)
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> EngineResult<Option<Document>> {
        let mut map = self.write()?;
        let docs = map.entry(collection).or_default();
        if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
            update.apply(doc)?;
            return Ok(Some(doc.clone()));
        }
        if !upsert {
            return Ok(None);
        }
        let mut doc = filter.equality_seed();
        update.apply(&mut doc)?;
        self.stamp_id(&mut doc);
        debug!(collection = %collection, "upserted document");
        docs.push(doc.clone());
        Ok(Some(doc))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> EngineResult<UpdateResult> {
        let mut map = self.write()?;
        let mut result = UpdateResult::default();
        if let Some(doc) = map
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)))
        {
            result.matched = 1;
            if update.apply(doc)? {
                result.modified = 1;
            }
        }
        Ok(result)
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> EngineResult<UpdateResult> {
        let mut map = self.write()?;
        let mut result = UpdateResult::default();
        if let Some(docs) = map.get_mut(&collection) {
            for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
                result.matched += 1;
                if update.apply(doc)? {
                    result.modified += 1;
                }
            }
        }
        Ok(result)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> EngineResult<u64> {
        let mut map = self.write()?;
        let Some(docs) = map.get_mut(&collection) else {
            return Ok(0);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(pos) => {
                docs.remove(pos);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> EngineResult<u64> {
        let mut map = self.write()?;
        let Some(docs) = map.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        let deleted = (before - docs.len()) as u64;
        debug!(collection = %collection, deleted, "delete_many");
        Ok(deleted)
    }

    async fn aggregate(
        &self,
        collection: Collection,
        pipeline: &[Stage],
    ) -> EngineResult<Vec<Document>> {
        let docs = {
            let map = self.read()?;
            map.get(&collection).cloned().unwrap_or_default()
        };
        Ok(pipeline.iter().fold(docs, run_stage))
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&'static str, usize> = Collection::ALL
            .iter()
            .map(|c| (c.as_str(), self.len(*c)))
            .collect();
        f.debug_struct("InMemoryEngine")
            .field("document_counts", &counts)
            .finish()
    }
}
