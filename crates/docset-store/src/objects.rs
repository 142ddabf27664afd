//! Generic document access by opaque `_key`.

use docset_engine::{EngineError, Filter, FindOptions, Stage, Update};
use docset_types::{
    document_key, shape_fields, stamp_key, validate_object_key, Document, SortDirection, SortSpec,
    KEY_FIELD,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::options::ParamOptions;
use crate::store::DocStore;

/// Which update primitive `update_objects` ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateScope {
    /// Only the first matching document.
    First,
    /// Every matching document.
    All,
}

/// Result of [`DocStore::update_objects`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub scope: UpdateScope,
    pub matched: u64,
    pub modified: u64,
    /// A new document was created because nothing matched and upsert was
    /// requested.
    pub upserted: bool,
}

/// Page request for [`DocStore::paginate_objects`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paginate {
    /// Page size; `0` means unlimited.
    pub limit: u64,
    /// Zero-based page number.
    pub page: u64,
    /// Ordering; defaults to newest-first insertion order.
    pub order: Option<SortSpec>,
}

fn shape_all<S: AsRef<str>>(docs: Vec<Document>, fields: &[S]) -> Vec<Document> {
    if fields.is_empty() {
        return docs;
    }
    docs.into_iter().map(|d| shape_fields(d, fields)).collect()
}

impl DocStore {
    /// Documents matching an arbitrary filter.
    ///
    /// Single mode (the default) returns at most the first match; multi mode
    /// returns every match ordered by the resolved sort.
    pub async fn get_from_db<S: AsRef<str>>(
        &self,
        filter: &Filter,
        fields: &[S],
        options: &ParamOptions,
    ) -> StoreResult<Vec<Document>> {
        let opts = self.resolve(options)?;
        let docs = if opts.multi {
            let find = FindOptions::new().sort(opts.sort);
            self.engine().find(opts.collection, filter, &find).await?
        } else {
            self.engine()
                .find_one(opts.collection, filter, None)
                .await?
                .into_iter()
                .collect()
        };
        Ok(shape_all(docs, fields))
    }

    /// The first document stored under `key`, reshaped to `fields` when any
    /// are given.
    pub async fn get_object<S: AsRef<str>>(
        &self,
        key: &str,
        fields: &[S],
        options: &ParamOptions,
    ) -> StoreResult<Option<Document>> {
        let opts = self.resolve(options)?;
        let doc = self
            .engine()
            .find_one(opts.collection, &Filter::key(key), None)
            .await?;
        Ok(doc.map(|d| shape_fields(d, fields)))
    }

    /// Every document stored under `key`, ordered by the resolved sort and
    /// paginated by `skip`/`limit` when given.
    pub async fn get_objects<S: AsRef<str>>(
        &self,
        key: &str,
        fields: &[S],
        options: &ParamOptions,
    ) -> StoreResult<Vec<Document>> {
        let opts = self.resolve(options)?;
        let mut find = FindOptions::new().sort(opts.sort);
        if let Some(skip) = opts.skip {
            find = find.skip(skip);
        }
        find.limit = opts.limit;
        let docs = self
            .engine()
            .find(opts.collection, &Filter::key(key), &find)
            .await?;
        Ok(shape_all(docs, fields))
    }

    /// Number of documents stored under `key`.
    pub async fn get_objects_count(&self, key: &str, options: &ParamOptions) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        Ok(self
            .engine()
            .count(opts.collection, &Filter::key(key), None)
            .await?)
    }

    /// Upsert a single document under `key` and return it as stored.
    ///
    /// The key must be non-empty and must not read as a number.
    pub async fn set_object(
        &self,
        key: &str,
        mut data: Document,
        options: &ParamOptions,
    ) -> StoreResult<Document> {
        validate_object_key(key)?;
        let opts = self.resolve(options)?;
        data.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));
        let doc = self
            .engine()
            .find_one_and_update(opts.collection, &Filter::key(key), &Update::Set(data), true)
            .await?
            .ok_or_else(|| EngineError::Backend(format!("upsert of {key:?} returned no document")))?;
        debug!(key, collection = %opts.collection, "set object");
        Ok(doc)
    }

    /// Insert a batch of documents. Documents without a `_key` are stamped
    /// with `key`.
    ///
    /// The batch is not atomic: an engine failure part-way through leaves
    /// the earlier documents in place.
    pub async fn set_objects(
        &self,
        key: Option<&str>,
        mut docs: Vec<Document>,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        if docs.is_empty() {
            return Ok(0);
        }
        for doc in &mut docs {
            if let Some(key) = key {
                stamp_key(doc, key);
            }
            if document_key(doc).map_or(true, str::is_empty) {
                return Err(StoreError::InvalidKey {
                    key: String::new(),
                    reason: "every document in a batch needs a string _key".into(),
                });
            }
        }
        let inserted = self.engine().insert_many(opts.collection, docs).await?;
        debug!(inserted, collection = %opts.collection, "set objects");
        Ok(inserted)
    }

    /// Merge `data` into documents stored under `key`.
    ///
    /// Scope follows the long-standing convention of this call: by default
    /// every matching document is updated, and `multi = true` restricts the
    /// update to the first match. The outcome reports which path ran.
    pub async fn update_objects(
        &self,
        key: &str,
        data: Document,
        options: &ParamOptions,
    ) -> StoreResult<UpdateOutcome> {
        let opts = self.resolve(options)?;
        let filter = Filter::key(key);
        let update = Update::Set(data);
        let scope = if opts.multi {
            UpdateScope::First
        } else {
            UpdateScope::All
        };
        let result = match scope {
            UpdateScope::First => self.engine().update_one(opts.collection, &filter, &update).await?,
            UpdateScope::All => self.engine().update_many(opts.collection, &filter, &update).await?,
        };
        let mut outcome = UpdateOutcome {
            scope,
            matched: result.matched,
            modified: result.modified,
            upserted: false,
        };
        if result.matched == 0 && opts.upsert {
            self.engine()
                .find_one_and_update(opts.collection, &filter, &update, true)
                .await?;
            outcome.upserted = true;
        }
        Ok(outcome)
    }

    /// Delete the first document under `key`, or every one with `multi`.
    pub async fn delete_objects(&self, key: &str, options: &ParamOptions) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        let filter = Filter::key(key);
        let deleted = if opts.multi {
            self.engine().delete_many(opts.collection, &filter).await?
        } else {
            self.engine().delete_one(opts.collection, &filter).await?
        };
        Ok(deleted)
    }

    /// Delete every document whose `_key` is in `keys`.
    pub async fn delete_objects_with_keys<S: AsRef<str>>(
        &self,
        keys: &[S],
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        if keys.is_empty() {
            return Ok(0);
        }
        let filter = Filter::new().is_in(KEY_FIELD, keys.iter().map(|k| k.as_ref().to_string()));
        Ok(self.engine().delete_many(opts.collection, &filter).await?)
    }

    /// One page of documents matching `filter`.
    pub async fn paginate_objects(
        &self,
        filter: &Filter,
        paginate: &Paginate,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Document>> {
        let opts = self.resolve(options)?;
        let order = paginate
            .order
            .clone()
            .unwrap_or(SortSpec::Natural(SortDirection::Descending));
        let mut find = FindOptions::new()
            .sort(order)
            .skip(paginate.page.saturating_mul(paginate.limit));
        if paginate.limit > 0 {
            find = find.limit(paginate.limit);
        }
        Ok(self.engine().find(opts.collection, filter, &find).await?)
    }

    /// Run an aggregation pipeline as-is.
    pub async fn aggregate_objects(
        &self,
        pipeline: &[Stage],
        options: &ParamOptions,
    ) -> StoreResult<Vec<Document>> {
        let opts = self.resolve(options)?;
        Ok(self.engine().aggregate(opts.collection, pipeline).await?)
    }
}
