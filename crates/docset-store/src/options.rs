//! Per-call options and their normalization.
//!
//! Callers pass a partial [`ParamOptions`]; every operation resolves it with
//! [`normalize_options`] before issuing a query. Resolution is pure: the
//! input is never modified and a fresh [`ResolvedOptions`] is returned.

use docset_types::{Collection, SortSpec};

use crate::error::StoreResult;

/// Partial options accepted by every store operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamOptions {
    /// Operate on every matching document instead of the first. Read by
    /// `get_from_db`, `update_objects` and `delete_objects`; `get_object` and
    /// `get_objects` choose single or multi by name and ignore it.
    pub multi: Option<bool>,
    /// Target collection name; must be on the allow-list.
    pub collection: Option<String>,
    /// Result ordering for multi reads.
    pub sort: Option<SortSpec>,
    /// Pagination for multi reads.
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Create the document when an update matches nothing.
    pub upsert: Option<bool>,
}

impl ParamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }
}

/// Fully populated options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub multi: bool,
    pub collection: Collection,
    pub sort: SortSpec,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub upsert: bool,
}

/// Fill in defaults and validate the collection name.
///
/// - `multi` defaults to `false`
/// - `collection` defaults to `default_collection`
/// - `sort` defaults to newest-first insertion order; a field sort with an
///   empty field name counts as absent
/// - `upsert` defaults to `false`
pub fn normalize_options(
    options: &ParamOptions,
    default_collection: Collection,
) -> StoreResult<ResolvedOptions> {
    let collection = match &options.collection {
        Some(name) => Collection::parse(name)?,
        None => default_collection,
    };
    let sort = match &options.sort {
        Some(SortSpec::Field { field, .. }) if field.trim().is_empty() => SortSpec::natural_desc(),
        Some(sort) => sort.clone(),
        None => SortSpec::natural_desc(),
    };
    Ok(ResolvedOptions {
        multi: options.multi.unwrap_or(false),
        collection,
        sort,
        skip: options.skip,
        limit: options.limit,
        upsert: options.upsert.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use docset_types::SortDirection;

    #[test]
    fn empty_options_get_defaults() {
        let r = normalize_options(&ParamOptions::default(), Collection::Objects).unwrap();
        assert_eq!(
            r,
            ResolvedOptions {
                multi: false,
                collection: Collection::Objects,
                sort: SortSpec::Natural(SortDirection::Descending),
                skip: None,
                limit: None,
                upsert: false,
            }
        );
    }

    #[test]
    fn supplied_values_are_kept() {
        let input = ParamOptions::new()
            .multi(true)
            .collection("sessions")
            .sort(SortSpec::by("rank", SortDirection::Ascending))
            .page(10, 5);
        let r = normalize_options(&input, Collection::Objects).unwrap();
        assert!(r.multi);
        assert_eq!(r.collection, Collection::Sessions);
        assert_eq!(r.sort, SortSpec::by("rank", SortDirection::Ascending));
        assert_eq!((r.skip, r.limit), (Some(10), Some(5)));
    }

    #[test]
    fn default_collection_comes_from_caller() {
        let r = normalize_options(&ParamOptions::default(), Collection::Sessions).unwrap();
        assert_eq!(r.collection, Collection::Sessions);
    }

    #[test]
    fn unknown_collection_is_rejected() {
        let err = normalize_options(&ParamOptions::new().collection("users"), Collection::Objects)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn blank_collection_is_rejected() {
        let err = normalize_options(&ParamOptions::new().collection("  "), Collection::Objects)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection { .. }));
    }

    #[test]
    fn empty_sort_field_falls_back_to_default() {
        let input = ParamOptions::new().sort(SortSpec::by("", SortDirection::Ascending));
        let r = normalize_options(&input, Collection::Objects).unwrap();
        assert_eq!(r.sort, SortSpec::natural_desc());
    }

    #[test]
    fn normalization_does_not_touch_input() {
        let input = ParamOptions::new().collection("objects");
        let before = input.clone();
        let _ = normalize_options(&input, Collection::Objects).unwrap();
        assert_eq!(input, before);
    }
}
