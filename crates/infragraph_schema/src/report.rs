//! Non-fatal schema findings.

use serde::{Deserialize, Serialize};

/// A finding that does not stop compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// The description names no requesting user
    MissingUserId,
    /// The description has no name
    MissingInfraName,
    /// A node has no scaling section; a single instance is assumed
    MissingScaling {
        /// Node name
        node: String,
    },
    /// No dependencies are given; every node lands in one level
    MissingDependencies,
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUserId => write!(f, "user_id is not defined in infrastructure description"),
            Self::MissingInfraName => {
                write!(f, "infra_name is not defined in infrastructure description")
            }
            Self::MissingScaling { node } => write!(
                f,
                "missing \"scaling\" in node {:?}, using default scaling (single instance)",
                node
            ),
            Self::MissingDependencies => write!(f, "no dependencies specified"),
        }
    }
}

/// Receives warnings raised during validation
pub trait WarningReporter {
    /// Record one warning
    fn report(&mut self, warning: SchemaWarning);
}

/// Reporter that keeps every warning in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectingReporter {
    warnings: Vec<SchemaWarning>,
}

impl CollectingReporter {
    /// Create an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings seen so far
    #[must_use]
    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }

    /// Consume the reporter
    #[must_use]
    pub fn into_warnings(self) -> Vec<SchemaWarning> {
        self.warnings
    }
}

impl WarningReporter for CollectingReporter {
    fn report(&mut self, warning: SchemaWarning) {
        self.warnings.push(warning);
    }
}

/// Reporter that logs each warning and hands it on to `inner`
#[derive(Debug, Clone, Default)]
pub struct TracingReporter<R = CollectingReporter> {
    inner: R,
}

impl<R: WarningReporter> TracingReporter<R> {
    /// Wrap a reporter
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwrap the inner reporter
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: WarningReporter> WarningReporter for TracingReporter<R> {
    fn report(&mut self, warning: SchemaWarning) {
        tracing::warn!(%warning, "schema warning");
        self.inner.report(warning);
    }
}
