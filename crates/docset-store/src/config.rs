use std::path::Path;

use docset_types::Collection;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`DocStore`](crate::DocStore).
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// batch_key_limit = 50
/// unique_members = true
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Collection used when a call does not name one.
    pub default_collection: Collection,
    /// Multi-key range queries over more keys than this are split into
    /// batches and merged.
    pub batch_key_limit: usize,
    /// Cap on each cardinality probe issued by set intersection.
    pub intersect_count_limit: u64,
    /// Document holding counters when the caller names no key.
    pub counters_key: String,
    /// When `true`, adding an existing `(key, value)` sorted-set member
    /// updates its rank instead of inserting a duplicate entry.
    pub unique_members: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_collection: Collection::Objects,
            batch_key_limit: 100,
            intersect_count_limit: 50_000,
            counters_key: "global:counters".into(),
            unique_members: false,
        }
    }
}

impl StoreConfig {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and validate.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }

    /// Reject settings the store cannot run with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.batch_key_limit == 0 {
            return Err(StoreError::InvalidConfig(
                "batch_key_limit must be greater than zero".into(),
            ));
        }
        if self.intersect_count_limit == 0 {
            return Err(StoreError::InvalidConfig(
                "intersect_count_limit must be greater than zero".into(),
            ));
        }
        if self.counters_key.trim().is_empty() {
            return Err(StoreError::InvalidConfig("counters_key must not be empty".into()));
        }
        Ok(())
    }
}
