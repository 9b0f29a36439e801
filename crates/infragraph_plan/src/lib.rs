//! infragraph planner
//!
//! Compiles an infrastructure description into a self-contained plan:
//! a typed dependency graph, per-node attribute mapping tables, and the
//! ordered sequence of topological levels an orchestrator walks. Levels
//! run strictly in sequence; nodes inside one level may run in parallel.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod description;
pub mod graph;
pub mod level;
pub mod mapping;

pub use compiler::{
    CompileError, CompiledDescription, CompiledEdge, CompiledNode, Compiler, CompilerConfig,
    CompilerOutput, DefaultShapeCheck, ShapeCheck,
};
pub use description::{InfraDescription, RawDescription};
pub use graph::{Edge, EdgeSpec, GraphError, InfraGraph, Node, NodeIndex};
pub use level::{level, CycleError, TopoLevel, TopologicalOrder};
pub use mapping::{resolve, Mapping, MappingTables};
