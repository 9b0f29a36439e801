//! Schema error shared by every validation stage.

use std::fmt;

/// Schema result type
pub type SchemaResult<T> = Result<T, SchemaError>;

/// The input description failed structural validation.
///
/// `context` is filled in when the failure came from a delegated section
/// checker and identifies the node, section and entry index that
/// triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Human-readable reason
    pub message: String,
    /// Where the error was raised, if known
    pub context: Option<String>,
}

impl SchemaError {
    /// Create an error without context
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
        }
    }

    /// Attach (or replace) the context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Missing required key
    #[must_use]
    pub fn missing_key(key: &str, owner: &str) -> Self {
        Self::new(format!("missing key {:?} in {}", key, owner))
    }

    /// Key outside the recognized set
    #[must_use]
    pub fn unknown_key(key: &str, owner: &str) -> Self {
        Self::new(format!("unknown key {:?} in {}", key, owner))
    }

    /// Value has the wrong shape
    #[must_use]
    pub fn invalid_type(key: &str, owner: &str, expected: &str) -> Self {
        Self::new(format!("{:?} in {} must be {}", key, owner, expected))
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "Schema error {}: {}", context, self.message),
            None => write!(f, "Schema error: {}", self.message),
        }
    }
}

impl std::error::Error for SchemaError {}
