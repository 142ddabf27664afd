//! Lexical ranges over sorted-set values.
//!
//! Boundaries use the Redis `ZRANGEBYLEX` syntax: `-` and `+` are open ends,
//! a leading `(` makes the bound exclusive, a leading `[` makes it inclusive,
//! and a bare value is inclusive. Results are ordered by `value`, not rank.

use docset_engine::{Filter, FindOptions};
use docset_types::{Projection, SortDirection, SortSpec, ID_FIELD, KEY_FIELD, VALUE_FIELD};
use serde_json::Value;

use crate::error::StoreResult;
use crate::options::ParamOptions;
use crate::store::DocStore;

/// One end of a lexical range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexBound {
    Unbounded,
    Inclusive(String),
    Exclusive(String),
}

impl LexBound {
    /// Parse a lower bound; `-` is unbounded.
    pub fn parse_min(token: &str) -> Self {
        Self::parse(token, "-")
    }

    /// Parse an upper bound; `+` is unbounded.
    pub fn parse_max(token: &str) -> Self {
        Self::parse(token, "+")
    }

    fn parse(token: &str, open: &str) -> Self {
        if token == open {
            return Self::Unbounded;
        }
        if let Some(rest) = token.strip_prefix('(') {
            return Self::Exclusive(rest.to_string());
        }
        match token.strip_prefix('[') {
            Some(rest) => Self::Inclusive(rest.to_string()),
            None => Self::Inclusive(token.to_string()),
        }
    }
}

/// `value` conditions for the range `min..max` on one key.
pub fn lexical_filter(key: &str, min: &LexBound, max: &LexBound) -> Filter {
    let filter = Filter::key(key);
    let filter = match min {
        LexBound::Unbounded => filter,
        LexBound::Inclusive(v) => filter.gte(VALUE_FIELD, v.as_str()),
        LexBound::Exclusive(v) => filter.gt(VALUE_FIELD, v.as_str()),
    };
    match max {
        LexBound::Unbounded => filter,
        LexBound::Inclusive(v) => filter.lte(VALUE_FIELD, v.as_str()),
        LexBound::Exclusive(v) => filter.lt(VALUE_FIELD, v.as_str()),
    }
}

impl DocStore {
    /// Values of `key` between `min` and `max`, ascending. Skips `start`
    /// values and returns at most `count` when given.
    pub async fn get_sorted_sets_lexical(
        &self,
        key: &str,
        min: &str,
        max: &str,
        start: u64,
        count: Option<u64>,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Value>> {
        self.lexical_range(key, min, max, SortDirection::Ascending, start, count, options)
            .await
    }

    /// Values of `key` between `min` and `max`, descending.
    pub async fn get_sorted_sets_lexical_reverse(
        &self,
        key: &str,
        min: &str,
        max: &str,
        start: u64,
        count: Option<u64>,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Value>> {
        self.lexical_range(key, min, max, SortDirection::Descending, start, count, options)
            .await
    }

    /// Number of values of `key` between `min` and `max`.
    pub async fn get_sorted_sets_lexical_count(
        &self,
        key: &str,
        min: &str,
        max: &str,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        let filter = lexical_filter(key, &LexBound::parse_min(min), &LexBound::parse_max(max));
        Ok(self.engine().count(opts.collection, &filter, None).await?)
    }

    /// Delete the values of `key` between `min` and `max`.
    pub async fn sorted_set_remove_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        options: &ParamOptions,
    ) -> StoreResult<u64> {
        let opts = self.resolve(options)?;
        let filter = lexical_filter(key, &LexBound::parse_min(min), &LexBound::parse_max(max));
        Ok(self.engine().delete_many(opts.collection, &filter).await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn lexical_range(
        &self,
        key: &str,
        min: &str,
        max: &str,
        direction: SortDirection,
        start: u64,
        count: Option<u64>,
        options: &ParamOptions,
    ) -> StoreResult<Vec<Value>> {
        let opts = self.resolve(options)?;
        let filter = lexical_filter(key, &LexBound::parse_min(min), &LexBound::parse_max(max));
        let mut find = FindOptions::new()
            .sort(SortSpec::by(VALUE_FIELD, direction))
            .skip(start)
            .projection(Projection::exclude([ID_FIELD, KEY_FIELD]));
        find.limit = count;
        let docs = self.engine().find(opts.collection, &filter, &find).await?;
        Ok(docs
            .into_iter()
            .filter_map(|mut d| d.remove(VALUE_FIELD))
            .collect())
    }
}
