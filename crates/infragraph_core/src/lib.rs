//! infragraph core types
//!
//! Pure types shared by the schema checker and the planner: the
//! infrastructure identifier, the schema error carried across the
//! validation boundary, and the variable merge used when nodes inherit
//! infrastructure-level settings. No I/O happens here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod vars;

// Re-exports
pub use error::{SchemaError, SchemaResult};
pub use id::InfraId;
pub use vars::{merge_variables, Variables};
