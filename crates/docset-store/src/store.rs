use std::sync::Arc;

use docset_engine::DocumentEngine;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::options::{normalize_options, ParamOptions, ResolvedOptions};

/// The data-access layer.
///
/// Holds the injected engine handle and the store configuration. Operations
/// are grouped by capability in sibling modules (`objects`, `counters`,
/// `sorted_set`, `lexical`, `search`, `intersect`), each adding methods to
/// this type. Cloning is cheap and shares the engine.
#[derive(Clone)]
pub struct DocStore {
    engine: Arc<dyn DocumentEngine>,
    config: StoreConfig,
}

impl DocStore {
    /// Create a store over `engine`. The configuration is validated once
    /// here.
    pub fn new(engine: Arc<dyn DocumentEngine>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// Create a store with the default configuration.
    pub fn with_engine(engine: Arc<dyn DocumentEngine>) -> Self {
        Self {
            engine,
            config: StoreConfig::default(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn DocumentEngine> {
        &self.engine
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resolve per-call options against this store's defaults.
    pub fn resolve(&self, options: &ParamOptions) -> StoreResult<ResolvedOptions> {
        normalize_options(options, self.config.default_collection)
    }
}

impl std::fmt::Debug for DocStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docset_engine::InMemoryEngine;
    use docset_types::Collection;

    #[test]
    fn new_validates_config() {
        let engine = Arc::new(InMemoryEngine::new());
        let bad = StoreConfig {
            batch_key_limit: 0,
            ..Default::default()
        };
        assert!(DocStore::new(engine.clone(), bad).is_err());
        assert!(DocStore::new(engine, StoreConfig::default()).is_ok());
    }

    #[test]
    fn resolve_uses_configured_default_collection() {
        let config = StoreConfig {
            default_collection: Collection::Sessions,
            ..Default::default()
        };
        let store = DocStore::new(Arc::new(InMemoryEngine::new()), config).unwrap();
        let r = store.resolve(&ParamOptions::default()).unwrap();
        assert_eq!(r.collection, Collection::Sessions);
    }

    #[test]
    fn debug_shows_config() {
        let store = DocStore::with_engine(Arc::new(InMemoryEngine::new()));
        let debug = format!("{store:?}");
        assert!(debug.contains("DocStore"));
        assert!(debug.contains("batch_key_limit"));
    }
}
