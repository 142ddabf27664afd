//! Ordered multisets of `(key, value, rank)` entries.
//!
//! Each member is one document `{_key, value, rank}` in the store's
//! collection. Ranges are read by sorting on `rank` and translating
//! Redis-style indices (`-1` is the last member) into skip/limit windows.
//! Requests spanning more than `batch_key_limit` keys fan out in batches and
//! are merged back into global rank order before the window is applied.

use std::collections::HashMap;

use docset_engine::{Filter, FindOptions, Update};
use docset_types::{
    Document, Projection, SortDirection, SortSpec, ID_FIELD, KEY_FIELD, RANK_FIELD, VALUE_FIELD,
};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::merge::{batch_size, chunk_keys, merge_batch_sets, BatchMember};
use crate::options::{ParamOptions, ResolvedOptions};
use crate::store::DocStore;

/// One member of a sorted set as returned by the `_with_ranks` reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedMember {
    pub value: Value,
    pub rank: f64,
}

impl RankedMember {
    pub(crate) fn from_document(mut doc: Document) -> Self {
        let rank = doc.get(RANK_FIELD).and_then(Value::as_f64).unwrap_or(0.0);
        let value = doc.remove(VALUE_FIELD).unwrap_or(Value::Null);
        Self { value, rank }
    }
}

/// A member to be written by [`DocStore::sorted_set_add_keys`].
#[derive(Clone, Debug, PartialEq)]
pub struct SortedSetEntry {
    pub key: String,
    pub value: Value,
    pub rank: f64,
}

impl SortedSetEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>, rank: f64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            rank,
        }
    }

    /// The stored shape: `{_key, value, rank}`.
    pub fn to_document(&self) -> Document {
        let mut doc = Map::new();
        doc.insert(KEY_FIELD.to_string(), Value::String(self.key.clone()));
        doc.insert(VALUE_FIELD.to_string(), self.value.clone());
        doc.insert(RANK_FIELD.to_string(), rank_value(self.rank));
        doc
    }

    fn validate(&self) -> StoreResult<()> {
        if self.key.is_empty() {
            return Err(StoreError::InvalidArgument(
                "sorted-set key must not be empty".into(),
            ));
        }
        if !is_member_value(&self.value) {
            return Err(StoreError::InvalidArgument(format!(
                "sorted-set member must be a string or number, got {}",
                self.value
            )));
        }
        if !self.rank.is_finite() {
            return Err(StoreError::InvalidArgument(format!(
                "rank for {:?} must be finite, got {}",
                self.key, self.rank
            )));
        }
        Ok(())
    }
}

/// Integral ranks are stored as JSON integers.
pub(crate) fn rank_value(rank: f64) -> Value {
    if rank.fract() == 0.0 && rank.abs() < i64::MAX as f64 {
        return Value::Number(Number::from(rank as i64));
    }
    Number::from_f64(rank).map_or(Value::Number(Number::from(0)), Value::Number)
}

fn is_member_value(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// `_key` condition for one or many keys.
pub(crate) fn keys_filter<S: AsRef<str>>(keys: &[S]) -> Filter {
    match keys {
        [key] => Filter::key(key.as_ref()),
        _ => Filter::new().is_in(KEY_FIELD, keys.iter().map(|k| k.as_ref().to_string())),
    }
}

/// Inclusive rank bounds; infinite or NaN bounds are open, and equal bounds
/// become an equality test.
pub(crate) fn rank_filter<S: AsRef<str>>(keys: &[S], min: f64, max: f64) -> Filter {
    let filter = keys_filter(keys);
    if min.is_finite() && min == max {
        return filter.eq(RANK_FIELD, rank_value(min));
    }
    let filter = if min.is_finite() {
        filter.gte(RANK_FIELD, rank_value(min))
    } else {
        filter
    };
    if max.is_finite() {
        filter.lte(RANK_FIELD, rank_value(max))
    } else {
        filter
    }
}

fn member_projection() -> Projection {
    Projection::exclude([ID_FIELD, KEY_FIELD])
}

/// A rank-ordered range read over one or more keys.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeQuery {
    pub keys: Vec<String>,
    /// Index of the first member; negative counts from the tail.
    pub start: i64,
    /// Index of the last member, inclusive; `-1` is the last member.
    pub stop: i64,
    /// Lowest rank to include; `-inf` for none.
    pub min: f64,
    /// Highest rank to include; `+inf` for none.
    pub max: f64,
    pub direction: SortDirection,
}

impl RangeQuery {
    pub fn new<S: AsRef<str>>(keys: &[S], start: i64, stop: i64) -> Self {
        Self {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            start,
            stop,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            direction: SortDirection::Ascending,
        }
    }

    pub fn reverse(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    pub fn ranks(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// A skip/limit read in one direction, optionally reversed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Window {
    pub direction: SortDirection,
    pub skip: u64,
    pub take: Option<u64>,
    pub reverse: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Plan {
    Empty,
    Window(Window),
    /// Indices of mixed sign; the set's cardinality is needed first.
    NeedsCount,
}

fn inclusive_take(start: i64, stop: i64) -> Option<u64> {
    Some(stop.abs_diff(start) + 1)
}

/// Translate `start..=stop` into a window without knowing the cardinality.
pub(crate) fn plan_window(start: i64, stop: i64, direction: SortDirection) -> Plan {
    match (start, stop) {
        (s, -1) if s >= 0 => Plan::Window(Window {
            direction,
            skip: s.unsigned_abs(),
            take: None,
            reverse: false,
        }),
        (s, t) if s >= 0 && t >= 0 => {
            if s > t {
                Plan::Empty
            } else {
                Plan::Window(Window {
                    direction,
                    skip: s.unsigned_abs(),
                    take: inclusive_take(s, t),
                    reverse: false,
                })
            }
        }
        // Everything but the last |stop+1| members: read from the tail and
        // skip them.
        (0, t) => Plan::Window(Window {
            direction: direction.flip(),
            skip: (t + 1).unsigned_abs(),
            take: None,
            reverse: true,
        }),
        (s, t) if s < 0 && t < 0 => {
            if s > t {
                Plan::Empty
            } else {
                let skip = (t + 1).unsigned_abs();
                let last = (s + 1).unsigned_abs();
                Plan::Window(Window {
                    direction: direction.flip(),
                    skip,
                    take: Some(last - skip + 1),
                    reverse: true,
                })
            }
        }
        _ => Plan::NeedsCount,
    }
}

/// Translate `start..=stop` once the cardinality `len` is known.
pub(crate) fn window_for_len(start: i64, stop: i64, len: u64, direction: SortDirection) -> Option<Window> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let first = if start < 0 { (len + start).max(0) } else { start };
    let last = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if last < 0 || first > last {
        return None;
    }
    Some(Window {
        direction,
        skip: first.unsigned_abs(),
        take: inclusive_take(first, last),
        reverse: false,
    })
}

impl DocStore {
    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Add one member. A NaN rank is stored as 0.
    ///
    /// Fails before touching the engine when `key` is empty, or `value` is
    /// falsy (`""`, `0`, `null`, `false`) or not a string or number.
    pub async fn sorted_set_add_key(
        &self,
        key: &str,
        value: impl Into<Value>,
        rank: f64,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let value = value.into();
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("sorted-set key is required".into()));
        }
        if is_falsy(&value) {
            return Err(StoreError::InvalidArgument(format!(
                "sorted-set member is required for {key:?}"
            )));
        }
        let rank = if rank.is_nan() { 0.0 } else { rank };
        self.sorted_set_add_keys(vec![SortedSetEntry::new(key, value, rank)], options)
            .await
    }

    /// Add many members, possibly across keys. Returns the number written.
    ///
    /// Inserts are not atomic as a group. Unless `unique_members` is
    /// configured, re-adding an existing value creates a duplicate entry.
    pub async fn sorted_set_add_keys(
        &self,
        entries: Vec<SortedSetEntry>,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        if entries.is_empty() {
            return Ok(0);
        }
        for entry in &entries {
            entry.validate()?;
        }

        if !self.config().unique_members {
            let docs = entries.iter().map(SortedSetEntry::to_document).collect();
            return Ok(self.engine().insert_many(opts.collection, docs).await?);
        }

        let collection = opts.collection;
        let writes = entries.iter().map(|entry| {
            let filter = Filter::key(entry.key.as_str()).eq(VALUE_FIELD, entry.value.clone());
            let mut fields = Map::new();
            fields.insert(RANK_FIELD.to_string(), rank_value(entry.rank));
            let update = Update::Set(fields);
            async move {
                self.engine()
                    .find_one_and_update(collection, &filter, &update, true)
                    .await
            }
        });
        let written = try_join_all(writes).await?;
        Ok(written.iter().filter(|d| d.is_some()).count() as u64)
    }

    /// Remove every entry of `key` whose value equals `value` exactly.
    pub async fn sorted_set_remove_key(
        &self,
        key: &str,
        value: impl Into<Value>,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        let value = value.into();
        if key.is_empty() || is_falsy(&value) {
            return Ok(0);
        }
        let filter = Filter::key(key).eq(VALUE_FIELD, value);
        Ok(self.engine().delete_many(opts.collection, &filter).await?)
    }

    /// Remove many `(key, value)` pairs concurrently. Returns the total
    /// removed.
    pub async fn sorted_set_remove_keys<K, V>(
        &self,
        pairs: &[(K, V)],
        options: &ParamOptions,
    ) -> StoreResult<u64>
    where
        K: AsRef<str>,
        V: Clone + Into<Value>,
    {
        let collection = self.resolve(options)?.collection;
        let removals = pairs
            .iter()
            .filter(|(k, _)| !k.as_ref().is_empty())
            .map(|(k, v)| {
                let filter = Filter::key(k.as_ref()).eq(VALUE_FIELD, v.clone().into());
                async move { self.engine().delete_many(collection, &filter).await }
            });
        let removed = try_join_all(removals).await?;
        Ok(removed.into_iter().sum())
    }

    // -----------------------------------------------------------------------
    // Range reads
    // -----------------------------------------------------------------------

    /// Members of `keys` between `start` and `stop`, rank ascending.
    pub async fn fetch_sorted_sets_range<S: AsRef<str>>(
        &self,
        keys: &[S],
        start: i64,
        stop: i64,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Value>> {
        let query = RangeQuery::new(keys, start, stop);
        Ok(values_of(self.fetch_sorted_sets_range_by(&query, options).await?))
    }

    /// Members of `keys` between `start` and `stop`, rank descending.
    pub async fn fetch_sorted_sets_range_reverse<S: AsRef<str>>(
        &self,
        keys: &[S],
        start: i64,
        stop: i64,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Value>> {
        let query = RangeQuery::new(keys, start, stop).reverse();
        Ok(values_of(self.fetch_sorted_sets_range_by(&query, options).await?))
    }

    pub async fn fetch_sorted_sets_range_with_ranks<S: AsRef<str>>(
        &self,
        keys: &[S],
        start: i64,
        stop: i64,
        options: &ParamOptions,
    ) -> StoreResult<Vec<RankedMember>> {
        self.fetch_sorted_sets_range_by(&RangeQuery::new(keys, start, stop), options)
            .await
    }

    pub async fn fetch_sorted_sets_range_reverse_with_ranks<S: AsRef<str>>(
        &self,
        keys: &[S],
        start: i64,
        stop: i64,
        options: &ParamOptions,
    ) -> StoreResult<Vec<RankedMember>> {
        let query = RangeQuery::new(keys, start, stop).reverse();
        self.fetch_sorted_sets_range_by(&query, options).await
    }

    /// General range read: index window, rank bounds and direction.
    ///
    /// An empty key list or an empty window returns an empty result without
    /// error.
    pub async fn fetch_sorted_sets_range_by(
        &self,
        query: &RangeQuery,
        options: &ParamOptions,
    ) -> StoreResult<Vec<RankedMember>> {
        let opts = self.resolve(options)?;
        if query.keys.is_empty() {
            return Ok(Vec::new());
        }
        let filter = rank_filter(&query.keys, query.min, query.max);

        let window = match plan_window(query.start, query.stop, query.direction) {
            Plan::Empty => return Ok(Vec::new()),
            Plan::Window(w) => w,
            Plan::NeedsCount => {
                let len = self.engine().count(opts.collection, &filter, None).await?;
                match window_for_len(query.start, query.stop, len, query.direction) {
                    Some(w) => w,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let mut members = if query.keys.len() > self.config().batch_key_limit {
            self.fetch_batched(&opts, query, window).await?
        } else {
            self.fetch_window(&opts, &filter, window).await?
        };
        if window.reverse {
            members.reverse();
        }
        Ok(members)
    }

    async fn fetch_window(
        &self,
        opts: &ResolvedOptions,
        filter: &Filter,
        window: Window,
    ) -> StoreResult<Vec<RankedMember>> {
        let docs = self
            .find_window(opts, filter, window, member_projection())
            .await?;
        Ok(docs.into_iter().map(RankedMember::from_document).collect())
    }

    /// Like `fetch_window`, keeping each member's `_id` so batches can be
    /// merged with the engine's tie order.
    async fn fetch_sequenced(
        &self,
        opts: &ResolvedOptions,
        filter: &Filter,
        window: Window,
    ) -> StoreResult<Vec<BatchMember>> {
        let docs = self
            .find_window(opts, filter, window, Projection::exclude([KEY_FIELD]))
            .await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                let seq = doc.get(ID_FIELD).and_then(Value::as_u64).unwrap_or(0);
                BatchMember::new(RankedMember::from_document(doc), seq)
            })
            .collect())
    }

    async fn find_window(
        &self,
        opts: &ResolvedOptions,
        filter: &Filter,
        window: Window,
        projection: Projection,
    ) -> StoreResult<Vec<Document>> {
        let mut find = FindOptions::new()
            .sort(SortSpec::by(RANK_FIELD, window.direction))
            .skip(window.skip)
            .projection(projection);
        find.limit = window.take;
        Ok(self.engine().find(opts.collection, filter, &find).await?)
    }

    /// Query each key batch for its first `skip + take` members, merge them
    /// in rank order, then cut the window.
    async fn fetch_batched(
        &self,
        opts: &ResolvedOptions,
        query: &RangeQuery,
        window: Window,
    ) -> StoreResult<Vec<RankedMember>> {
        let size = batch_size(query.keys.len(), self.config().batch_key_limit);
        let batches = chunk_keys(&query.keys, size);
        let head = window.take.map(|t| window.skip.saturating_add(t));
        debug!(
            keys = query.keys.len(),
            batches = batches.len(),
            batch_size = size,
            "fanning out sorted-set range"
        );

        let wide = Window {
            skip: 0,
            take: head,
            ..window
        };
        let reads = batches.iter().map(|batch| {
            let filter = rank_filter(batch, query.min, query.max);
            async move { self.fetch_sequenced(opts, &filter, wide).await }
        });
        let results = try_join_all(reads).await?;

        let limit = head.map(|h| usize::try_from(h).unwrap_or(usize::MAX));
        let merged = merge_batch_sets(results, window.direction, limit);
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        Ok(merged.into_iter().skip(skip).collect())
    }

    // -----------------------------------------------------------------------
    // Counts and lookups
    // -----------------------------------------------------------------------

    /// Number of members of `keys` with `min <= rank <= max`.
    pub async fn sorted_set_count<S: AsRef<str>>(
        &self,
        keys: &[S],
        min: f64,
        max: f64,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        if keys.is_empty() {
            return Ok(0);
        }
        let filter = rank_filter(keys, min, max);
        Ok(self.engine().count(opts.collection, &filter, None).await?)
    }

    /// Number of members in `key`.
    pub async fn sorted_set_card(&self, key: &str, options: &ParamOptions) -> StoreResult<u64> {
        self.sorted_set_count(&[key], f64::NEG_INFINITY, f64::INFINITY, options)
            .await
    }

    /// Rank of `value` in `key`, if present.
    pub async fn get_sorted_set_value(
        &self,
        key: &str,
        value: impl Into<Value>,
        options: &ParamOptions,
    ) -> StoreResult<Option<f64>> {
        let opts = self.resolve(options)?;
        let filter = Filter::key(key).eq(VALUE_FIELD, value.into());
        let doc = self
            .engine()
            .find_one(opts.collection, &filter, Some(Projection::include([RANK_FIELD])))
            .await?;
        Ok(doc.and_then(|d| d.get(RANK_FIELD).and_then(Value::as_f64)))
    }

    /// Rank of `value` in each of `keys`, aligned with `keys`.
    pub async fn get_sorted_sets_value<S: AsRef<str>>(
        &self,
        keys: &[S],
        value: impl Into<Value>,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Option<f64>>> {
        let opts = self.resolve(options)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let filter = keys_filter(keys).eq(VALUE_FIELD, value.into());
        let find = FindOptions::new()
            .sort(SortSpec::Natural(SortDirection::Ascending))
            .projection(Projection::include([KEY_FIELD, RANK_FIELD]));
        let docs = self.engine().find(opts.collection, &filter, &find).await?;

        let mut ranks: HashMap<String, f64> = HashMap::new();
        for doc in docs {
            if let (Some(Value::String(k)), Some(rank)) =
                (doc.get(KEY_FIELD), doc.get(RANK_FIELD).and_then(Value::as_f64))
            {
                ranks.entry(k.clone()).or_insert(rank);
            }
        }
        Ok(keys.iter().map(|k| ranks.get(k.as_ref()).copied()).collect())
    }

    /// Whether `value` is a member of `key`.
    pub async fn sorted_set_is_member(
        &self,
        key: &str,
        value: impl Into<Value>,
        options: &ParamOptions,
    ) -> StoreResult<bool> {
        let opts = self.resolve(options)?;
        let filter = Filter::key(key).eq(VALUE_FIELD, value.into());
        Ok(self.engine().count(opts.collection, &filter, Some(1)).await? > 0)
    }
}

fn values_of(members: Vec<RankedMember>) -> Vec<Value> {
    members.into_iter().map(|m| m.value).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docset_engine::InMemoryEngine;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::config::StoreConfig;

    fn store() -> DocStore {
        DocStore::with_engine(Arc::new(InMemoryEngine::new()))
    }

    fn opts() -> ParamOptions {
        ParamOptions::default()
    }

    async fn seeded(entries: &[(&str, Value, f64)]) -> DocStore {
        let s = store();
        let entries = entries
            .iter()
            .map(|(k, v, r)| SortedSetEntry::new(*k, v.clone(), *r))
            .collect();
        s.sorted_set_add_keys(entries, &opts()).await.unwrap();
        s
    }

    async fn s123() -> DocStore {
        seeded(&[("s", json!(1), 10.0), ("s", json!(2), 20.0), ("s", json!(3), 30.0)]).await
    }

    // ===== Writes =====

    #[tokio::test]
    async fn add_key_stores_triple() {
        let s = store();
        s.sorted_set_add_key("z", "a", 5.0, &opts()).await.unwrap();
        let docs = s.get_objects::<&str>("z", &[], &opts()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["value"], json!("a"));
        assert_eq!(docs[0]["rank"], json!(5));
    }

    #[tokio::test]
    async fn add_key_rejects_missing_arguments() {
        let s = store();
        for bad in [json!(""), json!(0), json!(null), json!(false)] {
            let err = s.sorted_set_add_key("z", bad, 1.0, &opts()).await.unwrap_err();
            assert!(err.is_validation());
        }
        let err = s.sorted_set_add_key("", "a", 1.0, &opts()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert_eq!(s.sorted_set_card("z", &opts()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn add_key_nan_rank_becomes_zero() {
        let s = store();
        s.sorted_set_add_key("z", "a", f64::NAN, &opts()).await.unwrap();
        assert_eq!(s.get_sorted_set_value("z", "a", &opts()).await.unwrap(), Some(0.0));
    }

    #[tokio::test]
    async fn add_keys_rejects_infinite_rank_and_object_value() {
        let s = store();
        let err = s
            .sorted_set_add_keys(vec![SortedSetEntry::new("z", "a", f64::INFINITY)], &opts())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let err = s
            .sorted_set_add_keys(vec![SortedSetEntry::new("z", json!({"x": 1}), 1.0)], &opts())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn duplicate_adds_create_duplicates_by_default() {
        let s = store();
        s.sorted_set_add_key("z", "a", 1.0, &opts()).await.unwrap();
        s.sorted_set_add_key("z", "a", 2.0, &opts()).await.unwrap();
        assert_eq!(s.sorted_set_card("z", &opts()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unique_members_upserts_rank() {
        let config = StoreConfig {
            unique_members: true,
            ..Default::default()
        };
        let s = DocStore::new(Arc::new(InMemoryEngine::new()), config).unwrap();
        s.sorted_set_add_key("z", "a", 1.0, &opts()).await.unwrap();
        s.sorted_set_add_key("z", "a", 7.0, &opts()).await.unwrap();
        assert_eq!(s.sorted_set_card("z", &opts()).await.unwrap(), 1);
        assert_eq!(s.get_sorted_set_value("z", "a", &opts()).await.unwrap(), Some(7.0));
    }

    #[tokio::test]
    async fn remove_matches_value_exactly() {
        let s = seeded(&[("z", json!(1), 1.0), ("z", json!("1"), 2.0)]).await;
        assert_eq!(s.sorted_set_remove_key("z", "1", &opts()).await.unwrap(), 1);
        assert_eq!(s.fetch_sorted_sets_range(&["z"], 0, -1, &opts()).await.unwrap(), vec![json!(1)]);
    }

    #[tokio::test]
    async fn remove_keys_sums_removals() {
        let s = seeded(&[("a", json!("x"), 1.0), ("b", json!("y"), 1.0), ("b", json!("z"), 2.0)]).await;
        let removed = s
            .sorted_set_remove_keys(&[("a", "x"), ("b", "y"), ("b", "missing")], &opts())
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(s.sorted_set_card("b", &opts()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_honor_collection_option() {
        let s = store();
        let sessions = ParamOptions::new().collection("sessions");
        s.sorted_set_add_key("z", "a", 1.0, &sessions).await.unwrap();
        assert_eq!(s.sorted_set_card("z", &opts()).await.unwrap(), 0);
        assert_eq!(s.sorted_set_card("z", &sessions).await.unwrap(), 1);
    }

    // ===== Range reads =====

    #[tokio::test]
    async fn three_member_scenario() {
        let s = s123().await;
        assert_eq!(
            s.fetch_sorted_sets_range(&["s"], 0, 1, &opts()).await.unwrap(),
            vec![json!(1), json!(2)]
        );
        assert_eq!(
            s.fetch_sorted_sets_range_reverse(&["s"], 0, 0, &opts()).await.unwrap(),
            vec![json!(3)]
        );
    }

    #[tokio::test]
    async fn full_range_orders_by_rank() {
        let s = seeded(&[("s", json!("c"), 3.0), ("s", json!("a"), 1.0), ("s", json!("b"), 2.0)]).await;
        assert_eq!(
            s.fetch_sorted_sets_range(&["s"], 0, -1, &opts()).await.unwrap(),
            vec![json!("a"), json!("b"), json!("c")]
        );
        assert_eq!(
            s.fetch_sorted_sets_range_reverse(&["s"], 0, -1, &opts()).await.unwrap(),
            vec![json!("c"), json!("b"), json!("a")]
        );
    }

    #[tokio::test]
    async fn empty_key_range_is_empty() {
        let s = store();
        assert!(s.fetch_sorted_sets_range(&["nothing"], 0, -1, &opts()).await.unwrap().is_empty());
        let none: [&str; 0] = [];
        assert!(s.fetch_sorted_sets_range(&none, 0, -1, &opts()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_windows_read_from_tail() {
        let s = s123().await;
        assert_eq!(
            s.fetch_sorted_sets_range(&["s"], 0, -2, &opts()).await.unwrap(),
            vec![json!(1), json!(2)]
        );
        assert_eq!(
            s.fetch_sorted_sets_range(&["s"], -2, -1, &opts()).await.unwrap(),
            vec![json!(2), json!(3)]
        );
        assert_eq!(
            s.fetch_sorted_sets_range_reverse(&["s"], -1, -1, &opts()).await.unwrap(),
            vec![json!(1)]
        );
        assert_eq!(
            s.fetch_sorted_sets_range(&["s"], -2, 5, &opts()).await.unwrap(),
            vec![json!(2), json!(3)]
        );
        assert!(s.fetch_sorted_sets_range(&["s"], 2, 1, &opts()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn with_ranks_pairs_value_and_rank() {
        let s = s123().await;
        let got = s.fetch_sorted_sets_range_reverse_with_ranks(&["s"], 0, 1, &opts()).await.unwrap();
        assert_eq!(
            got,
            vec![
                RankedMember { value: json!(3), rank: 30.0 },
                RankedMember { value: json!(2), rank: 20.0 },
            ]
        );
    }

    #[tokio::test]
    async fn rank_bounds_are_inclusive() {
        let s = s123().await;
        let q = RangeQuery::new(&["s"], 0, -1).ranks(10.0, 20.0);
        let got = values_of(s.fetch_sorted_sets_range_by(&q, &opts()).await.unwrap());
        assert_eq!(got, vec![json!(1), json!(2)]);

        let q = RangeQuery::new(&["s"], 0, -1).ranks(20.0, 20.0);
        let got = values_of(s.fetch_sorted_sets_range_by(&q, &opts()).await.unwrap());
        assert_eq!(got, vec![json!(2)]);
    }

    #[tokio::test]
    async fn multiple_keys_merge_in_one_query() {
        let s = seeded(&[("a", json!("a1"), 1.0), ("b", json!("b2"), 2.0), ("a", json!("a3"), 3.0)]).await;
        assert_eq!(
            s.fetch_sorted_sets_range(&["a", "b"], 0, -1, &opts()).await.unwrap(),
            vec![json!("a1"), json!("b2"), json!("a3")]
        );
    }

    #[tokio::test]
    async fn many_keys_match_single_key_union() {
        let s = store();
        let keys: Vec<String> = (0..150).map(|i| format!("set:{i}")).collect();
        let entries = keys
            .iter()
            .enumerate()
            .flat_map(|(i, k)| {
                let i = i as f64;
                [
                    SortedSetEntry::new(k.as_str(), format!("{k}:x"), i * 2.0),
                    SortedSetEntry::new(k.as_str(), format!("{k}:y"), 1000.0 - i * 2.0 - 1.0),
                ]
            })
            .collect();
        s.sorted_set_add_keys(entries, &opts()).await.unwrap();

        let mut union = Vec::new();
        for k in &keys {
            union.extend(s.fetch_sorted_sets_range_with_ranks(&[k], 0, -1, &opts()).await.unwrap());
        }
        union.sort_by(|a, b| a.rank.total_cmp(&b.rank));

        let all = s.fetch_sorted_sets_range_with_ranks(&keys, 0, -1, &opts()).await.unwrap();
        assert_eq!(all, union);

        let window = s.fetch_sorted_sets_range_with_ranks(&keys, 10, 19, &opts()).await.unwrap();
        assert_eq!(window, union[10..20].to_vec());

        let mut reversed = union.clone();
        reversed.reverse();
        let rev = s.fetch_sorted_sets_range_reverse_with_ranks(&keys, 0, 4, &opts()).await.unwrap();
        assert_eq!(rev, reversed[..5].to_vec());

        let tail = s.fetch_sorted_sets_range_with_ranks(&keys, -3, -1, &opts()).await.unwrap();
        assert_eq!(tail, union[union.len() - 3..].to_vec());
    }

    #[tokio::test]
    async fn tied_ranks_keep_insertion_order_across_batches() {
        let engine = Arc::new(InMemoryEngine::new());
        let batched = DocStore::with_engine(engine.clone());
        let wide = StoreConfig { batch_key_limit: 1000, ..Default::default() };
        let single = DocStore::new(engine, wide).unwrap();

        let keys: Vec<String> = (0..150).map(|i| format!("k{i}")).collect();
        let entries = keys
            .iter()
            .rev()
            .map(|k| SortedSetEntry::new(k.as_str(), k.as_str(), 1.0))
            .collect();
        batched.sorted_set_add_keys(entries, &opts()).await.unwrap();

        let head = batched.fetch_sorted_sets_range(&keys, 0, 2, &opts()).await.unwrap();
        assert_eq!(head, vec![json!("k149"), json!("k148"), json!("k147")]);
        assert_eq!(head, single.fetch_sorted_sets_range(&keys, 0, 2, &opts()).await.unwrap());

        let tail = batched.fetch_sorted_sets_range(&keys, -2, -1, &opts()).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail, single.fetch_sorted_sets_range(&keys, -2, -1, &opts()).await.unwrap());

        let rev = batched.fetch_sorted_sets_range_reverse(&keys, 0, 1, &opts()).await.unwrap();
        assert_eq!(rev, single.fetch_sorted_sets_range_reverse(&keys, 0, 1, &opts()).await.unwrap());
    }

    // ===== Counts and lookups =====

    #[tokio::test]
    async fn count_by_rank() {
        let s = s123().await;
        assert_eq!(s.sorted_set_count(&["s"], 15.0, f64::INFINITY, &opts()).await.unwrap(), 2);
        assert_eq!(s.sorted_set_count(&["s"], 10.0, 10.0, &opts()).await.unwrap(), 1);
        assert_eq!(s.sorted_set_card("s", &opts()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn rank_lookups() {
        let s = seeded(&[("a", json!("m"), 4.0), ("c", json!("m"), 9.5)]).await;
        assert_eq!(s.get_sorted_set_value("a", "m", &opts()).await.unwrap(), Some(4.0));
        assert_eq!(s.get_sorted_set_value("a", "zz", &opts()).await.unwrap(), None);
        assert_eq!(
            s.get_sorted_sets_value(&["c", "b", "a"], "m", &opts()).await.unwrap(),
            vec![Some(9.5), None, Some(4.0)]
        );
        assert!(s.sorted_set_is_member("c", "m", &opts()).await.unwrap());
        assert!(!s.sorted_set_is_member("b", "m", &opts()).await.unwrap());
    }

    // ===== Index translation =====

    #[test]
    fn plans_without_count() {
        let asc = SortDirection::Ascending;
        assert_eq!(plan_window(3, 1, asc), Plan::Empty);
        assert_eq!(plan_window(-1, -2, asc), Plan::Empty);
        assert_eq!(plan_window(-1, 2, asc), Plan::NeedsCount);
        assert_eq!(plan_window(1, -3, asc), Plan::NeedsCount);
        assert_eq!(
            plan_window(0, -3, asc),
            Plan::Window(Window {
                direction: SortDirection::Descending,
                skip: 2,
                take: None,
                reverse: true,
            })
        );
    }

    fn model(len: usize, start: i64, stop: i64) -> Vec<usize> {
        let n = len as i64;
        let first = if start < 0 { (n + start).max(0) } else { start };
        let last = if stop < 0 { n + stop } else { stop.min(n - 1) };
        if last < 0 || first > last || first >= n {
            return Vec::new();
        }
        (first as usize..=last as usize).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn ranges_follow_tail_index_semantics(
            len in 0usize..8,
            start in -10i64..10,
            stop in -10i64..10,
            reverse in any::<bool>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let got = rt.block_on(async {
                let s = store();
                let entries = (0..len)
                    .map(|i| SortedSetEntry::new("p", i as u64, i as f64))
                    .collect();
                s.sorted_set_add_keys(entries, &opts()).await.unwrap();
                if reverse {
                    s.fetch_sorted_sets_range_reverse(&["p"], start, stop, &opts()).await.unwrap()
                } else {
                    s.fetch_sorted_sets_range(&["p"], start, stop, &opts()).await.unwrap()
                }
            });

            let ordered: Vec<usize> = if reverse { (0..len).rev().collect() } else { (0..len).collect() };
            let expected: Vec<Value> = model(len, start, stop)
                .into_iter()
                .map(|i| json!(ordered[i]))
                .collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn batched_ranges_match_unbatched(
            ranks in proptest::collection::vec(0u32..8, 1..30),
            start in -6i64..6,
            stop in -6i64..6,
            reverse in any::<bool>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (batched, single) = rt.block_on(async {
                let engine = Arc::new(InMemoryEngine::new());
                let narrow = StoreConfig { batch_key_limit: 3, ..Default::default() };
                let batched = DocStore::new(engine.clone(), narrow).unwrap();
                let single = DocStore::with_engine(engine);

                // Narrow rank range so many members tie; inserted last key first.
                let keys: Vec<String> = (0..ranks.len()).map(|i| format!("k{i}")).collect();
                let entries = ranks
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, r)| SortedSetEntry::new(format!("k{i}"), i as u64, f64::from(*r)))
                    .collect();
                single.sorted_set_add_keys(entries, &opts()).await.unwrap();

                if reverse {
                    (
                        batched.fetch_sorted_sets_range_reverse(&keys, start, stop, &opts()).await.unwrap(),
                        single.fetch_sorted_sets_range_reverse(&keys, start, stop, &opts()).await.unwrap(),
                    )
                } else {
                    (
                        batched.fetch_sorted_sets_range(&keys, start, stop, &opts()).await.unwrap(),
                        single.fetch_sorted_sets_range(&keys, start, stop, &opts()).await.unwrap(),
                    )
                }
            });
            prop_assert_eq!(batched, single);
        }
    }
}
