use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The fixed set of collections docset is allowed to touch.
///
/// Every query names its target collection, and any name outside this list is
/// rejected before the engine sees it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// The shared flat store holding objects, sorted-set entries and counters.
    #[default]
    Objects,
    /// Session records written by the web tier.
    Sessions,
}

impl Collection {
    /// All permitted collections.
    pub const ALL: [Collection; 2] = [Collection::Objects, Collection::Sessions];

    /// The collection name as stored by the engine.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Objects => "objects",
            Collection::Sessions => "sessions",
        }
    }

    /// Parse and validate a collection name.
    ///
    /// Surrounding whitespace is ignored. An empty name and any name not in
    /// [`Collection::ALL`] are errors.
    ///
    /// ```
    /// use docset_types::Collection;
    ///
    /// assert_eq!(Collection::parse(" objects ").unwrap(), Collection::Objects);
    /// assert!(Collection::parse("users").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TypeError::EmptyCollectionName);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| TypeError::UnknownCollection(name.to_string()))
    }
}

impl FromStr for Collection {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
