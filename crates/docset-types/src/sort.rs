use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Direction of an ordering, `+1` ascending and `-1` descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Build from the conventional `1` / `-1` integer form.
    pub fn from_i64(n: i64) -> Result<Self, TypeError> {
        match n {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(TypeError::InvalidSortDirection(other)),
        }
    }

    /// The `1` / `-1` integer form.
    pub const fn as_i64(&self) -> i64 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }

    /// The opposite direction.
    pub const fn flip(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Orient an ascending comparison result.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// How query results are ordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortSpec {
    /// Insertion order.
    Natural(SortDirection),
    /// Order by a document field.
    Field {
        field: String,
        direction: SortDirection,
    },
}

impl SortSpec {
    /// Newest-first insertion order, the default for every object query.
    pub const fn natural_desc() -> Self {
        Self::Natural(SortDirection::Descending)
    }

    /// Order by `field` in `direction`.
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self::Field {
            field: field.into(),
            direction,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::natural_desc()
    }
}

/// Field selection applied by the engine before results are returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Keep only these fields (fields absent on the document are omitted).
    Include(Vec<String>),
    /// Drop these fields.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Apply the projection to a document.
    pub fn apply(&self, doc: crate::Document) -> crate::Document {
        match self {
            Self::Include(fields) => doc
                .into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
            Self::Exclude(fields) => doc
                .into_iter()
                .filter(|(k, _)| !fields.iter().any(|f| f == k))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direction_integer_form() {
        assert_eq!(SortDirection::from_i64(1).unwrap(), SortDirection::Ascending);
        assert_eq!(SortDirection::from_i64(-1).unwrap(), SortDirection::Descending);
        assert_eq!(SortDirection::from_i64(0), Err(TypeError::InvalidSortDirection(0)));
        assert_eq!(SortDirection::Descending.as_i64(), -1);
    }

    #[test]
    fn flip_is_involutive() {
        for d in [SortDirection::Ascending, SortDirection::Descending] {
            assert_eq!(d.flip().flip(), d);
            assert_ne!(d.flip(), d);
        }
    }

    #[test]
    fn apply_reverses_for_descending() {
        assert_eq!(SortDirection::Ascending.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortDirection::Descending.apply(Ordering::Less), Ordering::Greater);
    }

    #[test]
    fn default_sort_is_natural_descending() {
        assert_eq!(SortSpec::default(), SortSpec::Natural(SortDirection::Descending));
    }

    #[test]
    fn include_projection() {
        let doc = json!({"_id": 1, "_key": "k", "value": "v", "rank": 2});
        let out = Projection::include(["value", "rank", "missing"]).apply(doc.as_object().cloned().unwrap());
        assert_eq!(serde_json::Value::Object(out), json!({"value": "v", "rank": 2}));
    }

    #[test]
    fn exclude_projection() {
        let doc = json!({"_id": 1, "_key": "k", "value": "v", "rank": 2});
        let out = Projection::exclude(["_id", "_key"]).apply(doc.as_object().cloned().unwrap());
        assert_eq!(serde_json::Value::Object(out), json!({"value": "v", "rank": 2}));
    }
}
