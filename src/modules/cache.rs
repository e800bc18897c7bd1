//! Load Cache
//!
//! Maps resolved paths (`Foo/Bar.toml`) to the definition produced on first
//! successful load. A path is fetched at most once per resolver; later
//! requests are answered from here without any I/O.
//!
//! Paths currently being evaluated are tracked separately so a nested request
//! for the same package during its own evaluation does not fetch it again.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::value::Definition;

/// Path -> definition memo plus the set of in-progress loads.
#[derive(Clone, Debug, Default)]
pub struct LoadCache {
    /// Resolved path -> definition.
    loaded: BTreeMap<String, Arc<Definition>>,

    /// Resolved paths whose evaluation has started but not finished.
    loading: HashSet<String>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached definition for a resolved path.
    pub fn get(&self, path: &str) -> Option<Arc<Definition>> {
        self.loaded.get(path).cloned()
    }

    /// Record a definition for `path` unless one is already recorded.
    ///
    /// Returns the definition cached for `path` after the call.
    pub fn insert(&mut self, path: &str, def: Arc<Definition>) -> Arc<Definition> {
        Arc::clone(self.loaded.entry(path.to_string()).or_insert(def))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.loaded.contains_key(path)
    }

    /// Iterate over `(path, definition)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Definition>)> {
        self.loaded.iter().map(|(path, def)| (path.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Check if a path is currently being loaded.
    pub fn is_loading(&self, path: &str) -> bool {
        self.loading.contains(path)
    }

    /// Mark a path as being loaded.
    pub fn mark_loading(&mut self, path: &str) {
        self.loading.insert(path.to_string());
    }

    /// Unmark a path as loading.
    pub fn unmark_loading(&mut self, path: &str) {
        self.loading.remove(path);
    }
}
