//! Attribute mappings and the per-node inbound/outbound tables.
//!
//! For an edge `dependent -> dependee`, the dependee *produces* the
//! mapped attributes for the dependent (its outbound table, keyed by the
//! dependent's name) and the dependent *consumes* them from the dependee
//! (its inbound table, keyed by the dependee's name).

use crate::graph::InfraGraph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One attribute wiring between the two endpoints of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MappingRepr", into = "MappingRepr")]
pub struct Mapping {
    /// Attribute published by the dependee
    pub source_attribute: String,
    /// Attribute the dependent receives it as
    pub destination_attribute: String,
    /// The consumer must wait until the producer publishes the attribute
    pub synchronize: bool,
    /// Passed through unchanged for later stages
    pub metadata: Map<String, Value>,
}

impl Mapping {
    /// Create an unsynchronized mapping without metadata
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source_attribute: source.into(),
            destination_attribute: destination.into(),
            synchronize: false,
            metadata: Map::new(),
        }
    }

    /// Require synchronization on this attribute
    #[must_use]
    pub fn synchronized(mut self) -> Self {
        self.synchronize = true;
        self
    }

    /// Attach one metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Wire format: a bare `[source, destination]` pair, or a mapping with
/// `attributes`, optional `synch`, and any further metadata keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum MappingRepr {
    Full {
        attributes: (String, String),
        #[serde(default)]
        synch: bool,
        #[serde(flatten)]
        metadata: Map<String, Value>,
    },
    Pair(String, String),
}

impl From<MappingRepr> for Mapping {
    fn from(repr: MappingRepr) -> Self {
        match repr {
            MappingRepr::Pair(source, destination) => Self::new(source, destination),
            MappingRepr::Full {
                attributes: (source_attribute, destination_attribute),
                synch,
                metadata,
            } => Self {
                source_attribute,
                destination_attribute,
                synchronize: synch,
                metadata,
            },
        }
    }
}

impl From<Mapping> for MappingRepr {
    fn from(mapping: Mapping) -> Self {
        Self::Full {
            attributes: (mapping.source_attribute, mapping.destination_attribute),
            synch: mapping.synchronize,
            metadata: mapping.metadata,
        }
    }
}

/// Mappings touching one node, grouped by peer name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MappingTables {
    /// Consumed from dependee `peer`
    pub inbound: IndexMap<String, Vec<Mapping>>,
    /// Produced for dependent `peer`
    pub outbound: IndexMap<String, Vec<Mapping>>,
}

impl MappingTables {
    /// Check if both tables are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inbound.is_empty() && self.outbound.is_empty()
    }

    /// Synchronized mappings this node must wait for, with their producer
    pub fn synchronized_inbound(&self) -> impl Iterator<Item = (&str, &Mapping)> {
        self.inbound.iter().flat_map(|(peer, mappings)| {
            mappings
                .iter()
                .filter(|m| m.synchronize)
                .map(move |m| (peer.as_str(), m))
        })
    }
}

/// Derive the mapping tables of every node in `graph`.
///
/// Every node gets an entry, with empty tables if it has no edges.
/// Mappings are copied out of the edges, so callers own the result
/// outright. Several edges between the same pair accumulate under one
/// peer key, in edge order.
#[must_use]
pub fn resolve(graph: &InfraGraph) -> IndexMap<String, MappingTables> {
    let mut tables: IndexMap<String, MappingTables> = graph
        .nodes()
        .map(|n| (n.name.clone(), MappingTables::default()))
        .collect();

    for edge in graph.edges() {
        let dependent = &graph.node(edge.dependent).name;
        let dependee = &graph.node(edge.dependee).name;

        if let Some(t) = tables.get_mut(dependee) {
            t.outbound
                .entry(dependent.clone())
                .or_default()
                .extend(edge.mappings.iter().cloned());
        }
        if let Some(t) = tables.get_mut(dependent) {
            t.inbound
                .entry(dependee.clone())
                .or_default()
                .extend(edge.mappings.iter().cloned());
        }
    }

    tables
}
