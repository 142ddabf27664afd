//! Named numeric fields incremented atomically on a keyed document.
//!
//! Counters are best effort: an empty key or an unusable delta yields
//! `Ok(None)` rather than an error, so callers that need a guaranteed count
//! must check the return value.

use docset_engine::{Filter, Update};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::DocStore;

/// Integral deltas stay integers so counters read back as JSON integers.
fn delta_number(by: f64) -> Option<Number> {
    if !by.is_finite() {
        return None;
    }
    if by.fract() == 0.0 && by.abs() < i64::MAX as f64 {
        return Some(Number::from(by as i64));
    }
    Number::from_f64(by)
}

impl DocStore {
    /// Add one to `field` on the document at `key` (the configured counters
    /// document when `None`), creating either if absent. Returns the new
    /// value, which stays fractional if the field already was.
    pub async fn increment_field_count(
        &self,
        field: &str,
        key: Option<&str>,
    ) -> StoreResult<Option<Number>> {
        self.increment_by(key, field, Number::from(1)).await
    }

    /// Subtract one from `field`; see [`DocStore::increment_field_count`].
    pub async fn decrement_field_count(
        &self,
        field: &str,
        key: Option<&str>,
    ) -> StoreResult<Option<Number>> {
        self.increment_by(key, field, Number::from(-1)).await
    }

    /// Add an arbitrary delta to `field` on the document at `key`.
    ///
    /// Returns `Ok(None)` without touching the engine when `key` is empty or
    /// `by` is NaN or infinite.
    pub async fn increment_object_field_by(
        &self,
        key: &str,
        field: &str,
        by: f64,
    ) -> StoreResult<Option<f64>> {
        let Some(delta) = delta_number(by) else {
            debug!(key, field, by, "ignoring non-finite counter delta");
            return Ok(None);
        };
        let value = self.increment_by(Some(key), field, delta).await?;
        Ok(value.and_then(|n| n.as_f64()))
    }

    async fn increment_by(
        &self,
        key: Option<&str>,
        field: &str,
        by: Number,
    ) -> StoreResult<Option<Number>> {
        let key = key.unwrap_or(self.config().counters_key.as_str());
        if key.is_empty() {
            debug!(field, "ignoring counter update without a key");
            return Ok(None);
        }
        let collection = self.config().default_collection;
        let update = Update::Inc {
            field: field.to_string(),
            by,
        };
        let doc = self
            .engine()
            .find_one_and_update(collection, &Filter::key(key), &update, true)
            .await?;
        Ok(doc.and_then(|mut d| match d.remove(field) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }))
    }
}
