//! Infrastructure identifiers.
//!
//! A fresh random UUID is generated for every compile; ids are never
//! derived from description content.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Infrastructure identifier - identifies one compiled infrastructure instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfraId(Uuid);

impl InfraId {
    /// Create a new random InfraId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InfraId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InfraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
