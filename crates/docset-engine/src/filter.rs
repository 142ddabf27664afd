//! Query predicates evaluated against documents.
//!
//! A [`Filter`] is a conjunction of per-field [`Condition`]s. Values are
//! ordered by a canonical type bracket (null < numbers < strings < objects <
//! arrays < booleans); range conditions only match values in the same bracket
//! as their bound, so a string bound never matches a numeric field.

use std::cmp::Ordering;

use docset_types::{Document, KEY_FIELD};
use regex::Regex;
use serde_json::Value;

/// A single-field predicate.
#[derive(Clone, Debug)]
pub enum Condition {
    Eq(Value),
    In(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Regex(Regex),
}

impl Condition {
    /// Evaluate against a field value; `None` means the field is absent.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => match field {
                Some(v) => values_equal(v, expected),
                None => expected.is_null(),
            },
            Condition::In(candidates) => match field {
                Some(v) => candidates.iter().any(|c| values_equal(v, c)),
                None => candidates.iter().any(Value::is_null),
            },
            Condition::Gt(bound) => range_match(field, bound, |o| o == Ordering::Greater),
            Condition::Gte(bound) => range_match(field, bound, |o| o != Ordering::Less),
            Condition::Lt(bound) => range_match(field, bound, |o| o == Ordering::Less),
            Condition::Lte(bound) => range_match(field, bound, |o| o != Ordering::Greater),
            Condition::Regex(re) => matches!(field, Some(Value::String(s)) if re.is_match(s)),
        }
    }
}

fn range_match(field: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        Some(v) if type_bracket(v) == type_bracket(bound) => accept(compare_values(v, bound)),
        _ => false,
    }
}

/// One `(field, condition)` pair of a filter.
#[derive(Clone, Debug)]
pub struct Clause {
    pub field: String,
    pub condition: Condition,
}

/// Conjunction of field predicates. The empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Filter::new().eq("_key", key)`.
    pub fn key(key: impl Into<String>) -> Self {
        Self::new().eq(KEY_FIELD, Value::String(key.into()))
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            condition,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    pub fn is_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(field, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    pub fn regex(self, field: impl Into<String>, re: Regex) -> Self {
        self.with(field, Condition::Regex(re))
    }

    /// Append every clause of `other`.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether every clause holds for `doc`.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|c| c.condition.matches(doc.get(&c.field)))
    }

    /// Fields a freshly upserted document inherits from the filter: every
    /// equality clause.
    pub fn equality_seed(&self) -> Document {
        self.clauses
            .iter()
            .filter_map(|c| match &c.condition {
                Condition::Eq(v) => Some((c.field.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }
}

fn type_bracket(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values used for sorting and range predicates.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(i), Some(j)) => i.cmp(&j),
                _ => {
                    // JSON numbers are never NaN; `-0.0` equals `0`.
                    let (fx, fy) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                    fx.partial_cmp(&fy).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_bracket(a).cmp(&type_bracket(b)),
    }
}

/// Equality with numeric normalization (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    // -----------------------------------------------------------------------
    // Value ordering
    // -----------------------------------------------------------------------

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!(1.0)), Ordering::Equal);
        assert_eq!(compare_values(&json!(-1.5), &json!(-1)), Ordering::Less);
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(compare_values(&json!(0), &json!(-0.0)), Ordering::Equal);
        assert_eq!(compare_values(&json!(-0.0), &json!(0.0)), Ordering::Equal);
        assert!(values_equal(&json!(0), &json!(-0.0)));
        assert!(Filter::new().gte("rank", 0).matches(&doc(json!({"rank": -0.0}))));
    }

    #[test]
    fn strings_compare_bytewise() {
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!("B"), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("ab"), &json!("a")), Ordering::Greater);
    }

    #[test]
    fn type_brackets_order() {
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("0")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!({})), Ordering::Less);
        assert_eq!(compare_values(&json!([]), &json!(false)), Ordering::Less);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(!values_equal(&json!(3), &json!("3")));
    }

    // -----------------------------------------------------------------------
    // Conditions
    // -----------------------------------------------------------------------

    #[test]
    fn eq_null_matches_missing_field() {
        let f = Filter::new().eq("b", Value::Null);
        assert!(f.matches(&doc(json!({"a": 1}))));
        assert!(!f.matches(&doc(json!({"b": 1}))));
    }

    #[test]
    fn in_matches_any_candidate() {
        let f = Filter::new().is_in("_key", ["a", "c"]);
        assert!(f.matches(&doc(json!({"_key": "a"}))));
        assert!(f.matches(&doc(json!({"_key": "c"}))));
        assert!(!f.matches(&doc(json!({"_key": "b"}))));
        assert!(!f.matches(&doc(json!({}))));
    }

    #[test]
    fn range_bounds_inclusive_and_exclusive() {
        let incl = Filter::new().gte("rank", 10).lte("rank", 20);
        let excl = Filter::new().gt("rank", 10).lt("rank", 20);
        for (rank, in_incl, in_excl) in [(10, true, false), (15, true, true), (20, true, false), (21, false, false)] {
            let d = doc(json!({"rank": rank}));
            assert_eq!(incl.matches(&d), in_incl, "rank {rank}");
            assert_eq!(excl.matches(&d), in_excl, "rank {rank}");
        }
    }

    #[test]
    fn range_does_not_cross_type_brackets() {
        let f = Filter::new().gte("value", "a");
        assert!(f.matches(&doc(json!({"value": "b"}))));
        assert!(!f.matches(&doc(json!({"value": 5}))));
        assert!(!f.matches(&doc(json!({}))));
    }

    #[test]
    fn regex_matches_strings_only() {
        let f = Filter::new().regex("value", Regex::new("^ab").unwrap());
        assert!(f.matches(&doc(json!({"value": "abc"}))));
        assert!(!f.matches(&doc(json!({"value": "cab"}))));
        assert!(!f.matches(&doc(json!({"value": 12}))));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({"x": 1}))));
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn equality_seed_collects_eq_clauses() {
        let f = Filter::key("k").eq("value", "v").gte("rank", 1);
        let seed = f.equality_seed();
        assert_eq!(Value::Object(seed), json!({"_key": "k", "value": "v"}));
    }

    #[test]
    fn and_concatenates_clauses() {
        let f = Filter::key("k").and(Filter::new().gt("rank", 1));
        assert_eq!(f.clauses().len(), 2);
    }

    proptest::proptest! {
        #[test]
        fn integer_order_matches_compare_values(a in proptest::num::i32::ANY, b in proptest::num::i32::ANY) {
            proptest::prop_assert_eq!(compare_values(&json!(a), &json!(b)), a.cmp(&b));
        }

        #[test]
        fn string_order_matches_compare_values(a in "[a-z]{0,6}", b in "[a-z]{0,6}") {
            proptest::prop_assert_eq!(compare_values(&json!(a.clone()), &json!(b.clone())), a.cmp(&b));
        }
    }
}
