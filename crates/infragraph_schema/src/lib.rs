//! infragraph schema checking
//!
//! Shallow shape validation of infrastructure descriptions, plus the
//! registry through which deep per-section checks are delegated to
//! pluggable checkers keyed by `(category, type)`.
//! Non-fatal findings are handed to an explicit [`WarningReporter`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod infra;
pub mod node_def;
pub mod registry;
pub mod report;

pub use checker::{KeysChecker, SectionCategory, SectionChecker};
pub use infra::{check_infra_shape, is_valid_infra_name};
pub use node_def::check_node_definitions;
pub use registry::{CheckerRegistry, RegistryError};
pub use report::{CollectingReporter, SchemaWarning, TracingReporter, WarningReporter};
