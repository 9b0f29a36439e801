//! Section checker interface.

use infragraph_core::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Section of a node definition that is checked by a pluggable checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    /// Cloud resource handler settings
    Resource,
    /// Configuration management settings
    ConfigManagement,
    /// Contextualisation (node resolution) settings
    Contextualisation,
    /// Health check settings
    HealthCheck,
}

impl SectionCategory {
    /// All categories, in the order they are checked
    pub const ALL: [SectionCategory; 4] = [
        Self::Resource,
        Self::ConfigManagement,
        Self::Contextualisation,
        Self::HealthCheck,
    ];

    /// Key of this section inside a node definition entry
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::ConfigManagement => "config_management",
            Self::Contextualisation => "contextualisation",
            Self::HealthCheck => "health_check",
        }
    }

    /// Look up a category by its section key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for SectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A checker for one `(category, type)` pair.
///
/// Implementations are registered explicitly in a
/// [`CheckerRegistry`](crate::CheckerRegistry) at start-up.
pub trait SectionChecker: Send + Sync {
    /// Category this checker handles
    fn category(&self) -> SectionCategory;

    /// Value of the section's `type` discriminator this checker handles
    fn kind(&self) -> &str;

    /// Validate one section payload
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first problem found
    fn perform_check(&self, section: &Map<String, Value>) -> SchemaResult<()>;
}

/// Checker that enforces required and allowed key sets.
///
/// The `type` key is always allowed.
#[derive(Debug, Clone)]
pub struct KeysChecker {
    category: SectionCategory,
    kind: String,
    required: BTreeSet<String>,
    allowed: Option<BTreeSet<String>>,
}

impl KeysChecker {
    /// Create a checker that accepts any keys
    #[must_use]
    pub fn new(category: SectionCategory, kind: impl Into<String>) -> Self {
        Self {
            category,
            kind: kind.into(),
            required: BTreeSet::new(),
            allowed: None,
        }
    }

    /// Keys that must be present
    #[must_use]
    pub fn with_required<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Restrict the section to these keys (plus `type` and the required ones)
    #[must_use]
    pub fn with_allowed<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed
            .get_or_insert_with(BTreeSet::new)
            .extend(keys.into_iter().map(Into::into));
        self
    }
}

impl SectionChecker for KeysChecker {
    fn category(&self) -> SectionCategory {
        self.category
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn perform_check(&self, section: &Map<String, Value>) -> SchemaResult<()> {
        let owner = format!("{} section", self.category);

        if let Some(missing) = self.required.iter().find(|k| !section.contains_key(*k)) {
            return Err(SchemaError::missing_key(missing, &owner));
        }

        if let Some(allowed) = &self.allowed {
            let unknown = section
                .keys()
                .find(|k| *k != "type" && !allowed.contains(*k) && !self.required.contains(*k));
            if let Some(key) = unknown {
                return Err(SchemaError::unknown_key(key, &owner));
            }
        }

        Ok(())
    }
}
