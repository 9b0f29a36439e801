//! Typed infrastructure graph.
//!
//! Nodes are stored once, in description order, and addressed by
//! [`NodeIndex`]; edges refer to their endpoints by index. Nothing is
//! mutated after [`InfraGraph::build`] returns. Derived state (mapping
//! tables, levels) lives in side tables built by other modules.

use crate::mapping::Mapping;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Error building the graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two nodes share a name
    #[error("duplicate node name {name:?}")]
    DuplicateNode {
        /// Repeated name
        name: String,
    },
    /// An edge names a node that does not exist
    #[error("dependency #{edge} references unknown node {name:?}")]
    UnknownNode {
        /// Position of the edge in the dependency list
        edge: usize,
        /// Missing name
        name: String,
    },
}

/// Position of a node in the graph's node table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Raw position
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node: its name plus the caller's record, kept opaque
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique name
    pub name: String,
    /// Full record as given, including `name`
    pub record: Map<String, Value>,
}

impl Node {
    /// Create a node with an empty record
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut record = Map::new();
        record.insert("name".to_string(), Value::String(name.clone()));
        Self { name, record }
    }

    /// Create a node from a record that already carries its name
    #[must_use]
    pub fn with_record(name: impl Into<String>, record: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }
}

/// A dependency as given by the caller, endpoints still by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeSpec {
    /// Node that needs the other one first
    pub dependent: String,
    /// Node that must be realized first
    pub dependee: String,
    /// Attribute wiring carried by this edge
    pub mappings: Vec<Mapping>,
    /// Free-form annotations
    pub annotations: Map<String, Value>,
}

impl EdgeSpec {
    /// Create an edge without mappings
    #[must_use]
    pub fn new(dependent: impl Into<String>, dependee: impl Into<String>) -> Self {
        Self {
            dependent: dependent.into(),
            dependee: dependee.into(),
            ..Self::default()
        }
    }

    /// Attach mappings
    #[must_use]
    pub fn with_mappings(mut self, mappings: Vec<Mapping>) -> Self {
        self.mappings = mappings;
        self
    }
}

/// A resolved dependency edge
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Node that needs the other one first
    pub dependent: NodeIndex,
    /// Node that must be realized first
    pub dependee: NodeIndex,
    /// Attribute wiring carried by this edge
    pub mappings: Vec<Mapping>,
    /// Free-form annotations
    pub annotations: Map<String, Value>,
}

/// Immutable dependency graph of one infrastructure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfraGraph {
    nodes: IndexMap<String, Node>,
    edges: Vec<Edge>,
}

impl InfraGraph {
    /// Build the graph from nodes and edge specs
    ///
    /// # Errors
    ///
    /// Returns error if a node name repeats or an edge names an unknown node
    pub fn build(nodes: Vec<Node>, edge_specs: Vec<EdgeSpec>) -> Result<Self, GraphError> {
        let mut table = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            if table.contains_key(&node.name) {
                return Err(GraphError::DuplicateNode { name: node.name });
            }
            table.insert(node.name.clone(), node);
        }

        let resolve = |edge: usize, name: String| {
            table
                .get_index_of(&name)
                .map(NodeIndex)
                .ok_or(GraphError::UnknownNode { edge, name })
        };

        let mut edges = Vec::with_capacity(edge_specs.len());
        for (i, spec) in edge_specs.into_iter().enumerate() {
            edges.push(Edge {
                dependent: resolve(i, spec.dependent)?,
                dependee: resolve(i, spec.dependee)?,
                mappings: spec.mappings,
                annotations: spec.annotations,
            });
        }

        tracing::debug!(nodes = table.len(), edges = edges.len(), "built infrastructure graph");
        Ok(Self {
            nodes: table,
            edges,
        })
    }

    /// Get node by index
    ///
    /// Indices handed out by this graph are always valid for it.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    /// Get node by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Look up the index of a name
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get_index_of(name).map(NodeIndex)
    }

    /// Check if a node exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Nodes in description order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node indices in description order
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// Edges in description order
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Nodes that directly depend on `index`
    #[must_use]
    pub fn dependents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.edges
            .iter()
            .filter(|e| e.dependee == index)
            .map(|e| e.dependent)
            .collect()
    }

    /// Nodes that `index` directly depends on
    #[must_use]
    pub fn dependencies(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.edges
            .iter()
            .filter(|e| e.dependent == index)
            .map(|e| e.dependee)
            .collect()
    }

    /// Get total node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
