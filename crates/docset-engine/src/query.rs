use docset_types::{Document, Projection, SortSpec};
use serde_json::{Number, Value};

use crate::error::{EngineError, EngineResult};
use crate::filter::Filter;

/// Modifiers applied to a `find`: sort, then skip, then limit, then projection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// `None` returns documents in ascending insertion order.
    pub sort: Option<SortSpec>,
    pub skip: u64,
    /// `None` is unlimited.
    pub limit: Option<u64>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// A single-document mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    /// Overwrite the listed fields, leaving the rest untouched.
    Set(Document),
    /// Add `by` to a numeric field, treating an absent field as zero.
    Inc { field: String, by: Number },
}

impl Update {
    pub fn inc(field: impl Into<String>, by: impl Into<Number>) -> Self {
        Self::Inc {
            field: field.into(),
            by: by.into(),
        }
    }

    /// Apply the mutation in place. Returns whether the document changed.
    pub fn apply(&self, doc: &mut Document) -> EngineResult<bool> {
        match self {
            Update::Set(fields) => {
                let mut changed = false;
                for (k, v) in fields {
                    if doc.get(k) != Some(v) {
                        doc.insert(k.clone(), v.clone());
                        changed = true;
                    }
                }
                Ok(changed)
            }
            Update::Inc { field, by } => {
                let current = match doc.get(field) {
                    None | Some(Value::Null) => Number::from(0),
                    Some(Value::Number(n)) => n.clone(),
                    Some(_) => {
                        return Err(EngineError::NonNumericField {
                            field: field.clone(),
                        })
                    }
                };
                let next = add_numbers(&current, by).ok_or_else(|| EngineError::NumericOverflow {
                    field: field.clone(),
                })?;
                doc.insert(field.clone(), Value::Number(next));
                Ok(true)
            }
        }
    }
}

/// Integer addition when both sides are integers, float addition otherwise.
fn add_numbers(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.checked_add(y).map(Number::from);
    }
    Number::from_f64(a.as_f64()? + b.as_f64()?)
}

/// Outcome of `update_one` / `update_many`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// One step of an aggregation pipeline.
#[derive(Clone, Debug)]
pub enum Stage {
    Match(Filter),
    Sort(SortSpec),
    Skip(u64),
    Limit(u64),
    Project(Projection),
    /// Replace the stream with a single `{name: count}` document.
    Count(String),
}
