//! Checker registry keyed by `(category, type)`.

use crate::checker::{SectionCategory, SectionChecker};
use indexmap::IndexMap;
use infragraph_core::{SchemaError, SchemaResult};
use std::sync::Arc;

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A checker is already registered for this pair
    #[error("checker already registered for {category} type {kind:?}")]
    AlreadyRegistered {
        /// Section category
        category: SectionCategory,
        /// Type discriminator
        kind: String,
    },
}

/// Registry of section checkers.
///
/// Populated by explicit [`register`](Self::register) calls at process
/// start; lookups never load anything on demand.
#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: IndexMap<(SectionCategory, String), Arc<dyn SectionChecker>>,
}

impl CheckerRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checker under its own `(category, kind)`
    ///
    /// # Errors
    ///
    /// Returns error if the pair is already taken
    pub fn register(&mut self, checker: Arc<dyn SectionChecker>) -> Result<(), RegistryError> {
        let key = (checker.category(), checker.kind().to_string());
        if self.checkers.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered {
                category: key.0,
                kind: key.1,
            });
        }

        tracing::debug!(category = %key.0, kind = %key.1, "registered section checker");
        self.checkers.insert(key, checker);
        Ok(())
    }

    /// Get a checker
    #[must_use]
    pub fn get(&self, category: SectionCategory, kind: &str) -> Option<Arc<dyn SectionChecker>> {
        self.checkers
            .get(&(category, kind.to_string()))
            .map(Arc::clone)
    }

    /// Resolve a checker, failing the way a bad `type` value in the input should
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if nothing is registered for the pair
    pub fn resolve(
        &self,
        category: SectionCategory,
        kind: &str,
    ) -> SchemaResult<Arc<dyn SectionChecker>> {
        self.get(category, kind).ok_or_else(|| {
            SchemaError::new(format!("unknown {} type {:?}", category, kind))
        })
    }

    /// Check if a checker is registered
    #[must_use]
    pub fn contains(&self, category: SectionCategory, kind: &str) -> bool {
        self.checkers.contains_key(&(category, kind.to_string()))
    }

    /// List registered pairs in registration order
    #[must_use]
    pub fn list(&self) -> Vec<(SectionCategory, String)> {
        self.checkers.keys().cloned().collect()
    }

    /// Number of registered checkers
    #[must_use]
    pub fn count(&self) -> usize {
        self.checkers.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("checkers", &self.list())
            .finish()
    }
}
