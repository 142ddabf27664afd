//! Cardinality of the intersection of several sorted sets.

use docset_engine::{Filter, FindOptions};
use docset_types::{Collection, Projection, SortDirection, SortSpec, VALUE_FIELD};
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreResult;
use crate::options::ParamOptions;
use crate::store::DocStore;

impl DocStore {
    /// Number of values present in every set of `keys`.
    ///
    /// Every set's cardinality is probed first, capped at
    /// `intersect_count_limit`. The smallest set is the pivot: its values are
    /// loaded and narrowed set by set, and the last set is only counted.
    /// Duplicate entries count once per entry.
    pub async fn sorted_set_intersect_keys<S: AsRef<str>>(
        &self,
        keys: &[S],
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        let collection = opts.collection;
        if keys.is_empty() {
            return Ok(0);
        }
        let cap = self.config().intersect_count_limit;

        let probes = keys.iter().map(|k| {
            let filter = Filter::key(k.as_ref());
            async move { self.engine().count(collection, &filter, Some(cap)).await }
        });
        let counts = try_join_all(probes).await?;

        let Some((pivot, &smallest)) = counts.iter().enumerate().min_by_key(|(_, c)| **c) else {
            return Ok(0);
        };
        if smallest == 0 {
            return Ok(0);
        }
        let pivot_key = keys[pivot].as_ref();
        let rest: Vec<&str> = keys
            .iter()
            .map(|k| k.as_ref())
            .filter(|k| *k != pivot_key)
            .collect();
        debug!(sets = keys.len(), pivot = pivot_key, smallest, "intersecting sorted sets");

        let mut candidates = self.set_values(collection, Filter::key(pivot_key)).await?;
        let Some((last, narrowing)) = rest.split_last() else {
            return Ok(candidates.len() as u64);
        };
        for key in narrowing {
            let filter = Filter::key(*key).is_in(VALUE_FIELD, candidates);
            candidates = self.set_values(collection, filter).await?;
            if candidates.is_empty() {
                return Ok(0);
            }
        }
        let filter = Filter::key(*last).is_in(VALUE_FIELD, candidates);
        Ok(self.engine().count(collection, &filter, None).await?)
    }

    async fn set_values(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> StoreResult<Vec<Value>> {
        let find = FindOptions::new()
            .sort(SortSpec::Natural(SortDirection::Ascending))
            .projection(Projection::include([VALUE_FIELD]));
        let docs = self.engine().find(collection, &filter, &find).await?;
        Ok(docs
            .into_iter()
            .filter_map(|mut d| d.remove(VALUE_FIELD))
            .collect())
    }
}
