//! Prefix/wildcard search over the values of one sorted set.

use docset_engine::{Filter, FindOptions};
use docset_types::{Projection, SortDirection, SortSpec, ID_FIELD, KEY_FIELD, RANK_FIELD, VALUE_FIELD};
use regex::RegexBuilder;
use tracing::debug;

use crate::error::StoreResult;
use crate::options::ParamOptions;
use crate::sorted_set::RankedMember;
use crate::store::DocStore;

/// Compiled patterns larger than this are refused.
const PATTERN_SIZE_LIMIT: usize = 1 << 16;

/// Anchored, case-sensitive pattern for `term`.
///
/// The term is trimmed and every regex metacharacter escaped, except `*`
/// which matches any run of characters.
pub fn build_search_pattern(term: &str) -> String {
    let escaped: Vec<String> = term.trim().split('*').map(regex::escape).collect();
    format!("^{}", escaped.join(".*"))
}

/// A search within one sorted set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub key: String,
    pub term: String,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl SearchParams {
    pub fn new(key: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

impl DocStore {
    /// Values of `params.key` matching the search term, rank ascending.
    pub async fn get_sorted_sets_search(
        &self,
        params: &SearchParams,
        options: &ParamOptions,
    ) -> StoreResult<Vec<serde_json::Value>> {
        let members = self.get_sorted_sets_search_with_ranks(params, options).await?;
        Ok(members.into_iter().map(|m| m.value).collect())
    }

    /// Like [`DocStore::get_sorted_sets_search`], keeping ranks.
    ///
    /// A term that does not compile to a usable pattern yields an empty
    /// result rather than an error.
    pub async fn get_sorted_sets_search_with_ranks(
        &self,
        params: &SearchParams,
        options: &ParamOptions,
    ) -> StoreResult<Vec<RankedMember>> {
        let opts = self.resolve(options)?;
        let pattern = build_search_pattern(&params.term);
        let re = match RegexBuilder::new(&pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                debug!(key = %params.key, error = %e, "search pattern rejected");
                return Ok(Vec::new());
            }
        };

        let filter = Filter::key(params.key.as_str()).regex(VALUE_FIELD, re);
        let mut find = FindOptions::new()
            .sort(SortSpec::by(RANK_FIELD, SortDirection::Ascending))
            .skip(params.skip)
            .projection(Projection::exclude([ID_FIELD, KEY_FIELD]));
        find.limit = params.limit;
        let docs = self.engine().find(opts.collection, &filter, &find).await?;
        Ok(docs.into_iter().map(RankedMember::from_document).collect())
    }
}
