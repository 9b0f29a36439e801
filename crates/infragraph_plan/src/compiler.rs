//! Compiler from an infrastructure description to an executable plan.

use crate::description::{InfraDescription, RawDescription};
use crate::graph::{GraphError, InfraGraph};
use crate::level::{level, CycleError, TopologicalOrder};
use crate::mapping::{resolve, Mapping, MappingTables};
use indexmap::IndexMap;
use infragraph_core::{merge_variables, InfraId, SchemaError, SchemaResult, Variables};
use infragraph_schema::{
    check_infra_shape, CollectingReporter, SchemaWarning, TracingReporter, WarningReporter,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Keys the compiler sets on every node; copies in the record are replaced
const DERIVED_NODE_KEYS: &[&str] = &["name", "infra_id", "user_id", "variables", "mappings"];

/// Compilation error
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Serialized input could not be read
    #[error("failed to deserialize description: {0}")]
    Deserialize(#[from] serde_yaml::Error),

    /// The description failed validation
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Duplicate node or dangling dependency
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Dependencies form a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// More nodes than the configured limit
    #[error("description has {count} nodes, limit is {limit}")]
    TooManyNodes {
        /// Nodes in the description
        count: usize,
        /// Configured limit
        limit: usize,
    },
}

/// Shape validation the compiler runs before building the graph
pub trait ShapeCheck: Send + Sync {
    /// Validate a deserialized description
    ///
    /// # Errors
    ///
    /// Returns the first schema violation found
    fn check(&self, desc: &Value, reporter: &mut dyn WarningReporter) -> SchemaResult<()>;
}

/// The stock shape check from `infragraph_schema`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShapeCheck;

impl ShapeCheck for DefaultShapeCheck {
    fn check(&self, desc: &Value, reporter: &mut dyn WarningReporter) -> SchemaResult<()> {
        check_infra_shape(desc, reporter)
    }
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Maximum allowed nodes (0 = no limit)
    pub max_nodes: usize,
    /// Stand-in for a missing name or user id
    pub placeholder: String,
}

impl CompilerConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_nodes: 0,
            placeholder: "undefined".to_string(),
        }
    }

    /// Set maximum node count
    #[must_use]
    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    /// Set the placeholder for missing identity fields
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A node ready for provisioning, with everything it inherits filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledNode {
    /// Node name
    pub name: String,
    /// Infrastructure this node belongs to
    pub infra_id: InfraId,
    /// Requesting user
    pub user_id: String,
    /// Infrastructure variables overlaid with the node's own
    pub variables: Variables,
    /// Attribute wiring to and from peers
    pub mappings: MappingTables,
    /// Remaining fields of the node record, untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A dependency edge by node name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledEdge {
    /// Node that needs the other one first
    pub dependent: String,
    /// Node that must be realized first
    pub dependee: String,
    /// Attribute wiring carried by this edge
    pub mappings: Vec<Mapping>,
    /// Free-form annotations, kept apart from the endpoint fields
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub annotations: Map<String, Value>,
}

/// Self-contained result of one compile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledDescription {
    /// Freshly generated infrastructure id
    pub infra_id: InfraId,
    /// Infrastructure name
    pub name: String,
    /// Requesting user
    pub user_id: String,
    /// Infrastructure-level variables
    pub variables: Variables,
    /// Start the infrastructure suspended
    pub suspended: bool,
    /// Opaque user-info strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_strategy: Option<Value>,
    /// Annotated nodes in description order
    pub nodes: IndexMap<String, CompiledNode>,
    /// Edges in description order
    pub edges: Vec<CompiledEdge>,
    /// Execution levels
    pub topological_order: TopologicalOrder,
}

impl CompiledDescription {
    /// Get node by name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&CompiledNode> {
        self.nodes.get(name)
    }
}

/// Output from compiling a description
#[derive(Debug, Clone)]
pub struct CompilerOutput {
    /// The compiled description
    pub description: CompiledDescription,
    /// Non-fatal schema findings
    pub warnings: Vec<SchemaWarning>,
}

/// Compiler for turning descriptions into plans.
///
/// Holds no per-compile state; one compiler may serve any number of
/// compiles, from any number of threads.
#[derive(Clone)]
pub struct Compiler {
    config: CompilerConfig,
    shape: Arc<dyn ShapeCheck>,
}

impl Compiler {
    /// Create a compiler with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    /// Create a compiler with the given settings
    #[must_use]
    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            shape: Arc::new(DefaultShapeCheck),
        }
    }

    /// Replace the shape check
    #[must_use]
    pub fn with_shape_check(mut self, shape: Arc<dyn ShapeCheck>) -> Self {
        self.shape = shape;
        self
    }

    /// Current settings
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a description
    ///
    /// # Errors
    ///
    /// Returns error if the input cannot be deserialized, fails
    /// validation, has duplicate or dangling node names, or contains a
    /// dependency cycle. Nothing is returned partially.
    pub fn compile(
        &self,
        raw: impl Into<RawDescription>,
    ) -> Result<CompilerOutput, CompileError> {
        let value = raw.into().into_value()?;

        let mut reporter = TracingReporter::new(CollectingReporter::new());
        self.shape.check(&value, &mut reporter)?;
        let warnings = reporter.into_inner().into_warnings();

        let desc = InfraDescription::from_value(&value)?;
        if self.config.max_nodes > 0 && desc.nodes.len() > self.config.max_nodes {
            return Err(CompileError::TooManyNodes {
                count: desc.nodes.len(),
                limit: self.config.max_nodes,
            });
        }

        let graph = InfraGraph::build(desc.nodes, desc.dependencies)?;
        let mut tables = resolve(&graph);
        let topological_order = level(&graph)?;

        let infra_id = InfraId::new();
        let name = desc.name.unwrap_or_else(|| self.config.placeholder.clone());
        let user_id = desc.user_id.unwrap_or_else(|| self.config.placeholder.clone());

        let nodes = graph
            .nodes()
            .map(|node| {
                let own_vars = match node.record.get("variables") {
                    Some(Value::Object(vars)) => vars.clone(),
                    _ => Variables::new(),
                };
                let mut attributes = node.record.clone();
                for key in DERIVED_NODE_KEYS {
                    attributes.remove(*key);
                }
                let compiled = CompiledNode {
                    name: node.name.clone(),
                    infra_id,
                    user_id: user_id.clone(),
                    variables: merge_variables(&desc.variables, &own_vars),
                    mappings: tables.shift_remove(&node.name).unwrap_or_default(),
                    attributes,
                };
                (node.name.clone(), compiled)
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .map(|edge| CompiledEdge {
                dependent: graph.node(edge.dependent).name.clone(),
                dependee: graph.node(edge.dependee).name.clone(),
                mappings: edge.mappings.clone(),
                annotations: edge.annotations.clone(),
            })
            .collect();

        tracing::info!(
            %infra_id,
            name = %name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            levels = topological_order.len(),
            "compiled infrastructure"
        );

        Ok(CompilerOutput {
            description: CompiledDescription {
                infra_id,
                name,
                user_id,
                variables: desc.variables,
                suspended: desc.suspended,
                userinfo_strategy: desc.userinfo_strategy,
                nodes,
                edges,
                topological_order,
            },
            warnings,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn level_sets(order: &TopologicalOrder) -> Vec<BTreeSet<String>> {
        order
            .iter()
            .map(|l| l.iter().map(str::to_string).collect())
            .collect()
    }

    fn sets(levels: &[&[&str]]) -> Vec<BTreeSet<String>> {
        levels
            .iter()
            .map(|l| l.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    const DIAMOND: &str = r#"
user_id: alice
infra_name: diamond
variables:
  region: eu
  size: small
nodes:
  - name: A
    type: db
    scaling: {min: 1, max: 1}
  - name: B
    type: app
    scaling: {min: 1}
    variables:
      size: large
  - name: C
    type: app
    scaling: {min: 1}
  - name: D
    type: lb
    scaling: {min: 1}
dependencies:
  - connection: [B, A]
    mappings:
      - attributes: [ip, db_host]
        synch: true
  - [C, A]
  - [D, B]
  - [D, C]
"#;

    #[test]
    fn test_compiler_config_builder() {
        let config = CompilerConfig::new()
            .with_max_nodes(10)
            .with_placeholder("anonymous");
        assert_eq!(config.max_nodes, 10);
        assert_eq!(config.placeholder, "anonymous");
        assert_eq!(Compiler::with_config(config.clone()).config(), &config);
    }

    #[test]
    fn test_compile_diamond() {
        let output = Compiler::new().compile(DIAMOND).unwrap();
        let desc = &output.description;

        assert!(output.warnings.is_empty());
        assert_eq!(desc.name, "diamond");
        assert_eq!(desc.user_id, "alice");
        assert_eq!(
            level_sets(&desc.topological_order),
            sets(&[&["A"], &["B", "C"], &["D"]])
        );
        assert_eq!(desc.topological_order.to_string(), "{A}\n{B, C}\n{D}");
        assert_eq!(desc.edges.len(), 4);
    }

    #[test]
    fn test_compile_annotates_nodes() {
        let output = Compiler::new().compile(DIAMOND).unwrap();
        let desc = &output.description;

        for node in desc.nodes.values() {
            assert_eq!(node.infra_id, desc.infra_id);
            assert_eq!(node.user_id, "alice");
        }

        let b = desc.node("B").unwrap();
        assert_eq!(b.variables["size"], json!("large"));
        assert_eq!(b.variables["region"], json!("eu"));
        assert_eq!(b.attributes["type"], json!("app"));
        assert!(!b.attributes.contains_key("variables"));
        assert_eq!(desc.node("C").unwrap().variables["size"], json!("small"));

        let a = desc.node("A").unwrap();
        let expected = vec![Mapping::new("ip", "db_host").synchronized()];
        assert_eq!(a.mappings.outbound["B"], expected);
        assert_eq!(b.mappings.inbound["A"], expected);
        assert!(a.mappings.inbound.is_empty());
        assert_eq!(a.mappings.outbound["C"], Vec::<Mapping>::new());
    }

    #[test]
    fn test_compile_no_edges_single_level() {
        let output = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "flat",
                "nodes": [
                    {"name": "x", "type": "t"},
                    {"name": "y", "type": "t"},
                    {"name": "z", "type": "t"},
                ],
            }))
            .unwrap();
        assert_eq!(
            level_sets(&output.description.topological_order),
            sets(&[&["x", "y", "z"]])
        );
        assert!(output.warnings.contains(&SchemaWarning::MissingDependencies));
        for node in output.description.nodes.values() {
            assert!(node.mappings.is_empty());
        }
    }

    #[test]
    fn test_compile_self_loop_is_cycle() {
        let err = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "loop",
                "nodes": [{"name": "A", "type": "t"}],
                "dependencies": [["A", "A"]],
            }))
            .unwrap_err();
        match err {
            CompileError::Cycle(cycle) => assert_eq!(cycle.remaining, vec!["A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_two_cycle() {
        let err = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "loop",
                "nodes": [{"name": "A", "type": "t"}, {"name": "B", "type": "t"}],
                "dependencies": [["A", "B"], ["B", "A"]],
            }))
            .unwrap_err();
        assert!(matches!(err, CompileError::Cycle(ref c) if c.remaining == ["A", "B"]));
    }

    #[test]
    fn test_compile_dotted_name_is_schema_error() {
        let err = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "my.infra",
                "nodes": [],
            }))
            .unwrap_err();
        match err {
            CompileError::Schema(e) => assert!(e.message.contains("hostname")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_duplicate_edges_concatenate() {
        let output = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "dup",
                "nodes": [{"name": "db", "type": "t"}, {"name": "app", "type": "t"}],
                "dependencies": [
                    {"connection": ["app", "db"], "mappings": [["ip", "host"]]},
                    {"connection": ["app", "db"], "mappings": [["port", "db_port"], ["user", "db_user"]]},
                ],
            }))
            .unwrap();
        let expected = vec![
            Mapping::new("ip", "host"),
            Mapping::new("port", "db_port"),
            Mapping::new("user", "db_user"),
        ];
        let desc = &output.description;
        assert_eq!(desc.node("db").unwrap().mappings.outbound["app"], expected);
        assert_eq!(desc.node("app").unwrap().mappings.inbound["db"], expected);
    }

    #[test]
    fn test_compile_duplicate_node() {
        let err = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "dup",
                "nodes": [{"name": "a", "type": "t"}, {"name": "a", "type": "t"}],
                "dependencies": [],
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Graph(GraphError::DuplicateNode { ref name }) if name == "a"
        ));
    }

    #[test]
    fn test_compile_unknown_node() {
        let err = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "dangling",
                "nodes": [{"name": "a", "type": "t"}],
                "dependencies": [["a", "b"]],
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Graph(GraphError::UnknownNode { edge: 0, ref name }) if name == "b"
        ));
    }

    #[test]
    fn test_compile_fresh_id_same_levels() {
        let compiler = Compiler::new();
        let first = compiler.compile(DIAMOND).unwrap().description;
        let second = compiler.compile(DIAMOND).unwrap().description;
        assert_ne!(first.infra_id, second.infra_id);
        assert_eq!(first.topological_order, second.topological_order);
        assert_eq!(first.topological_order.len(), second.topological_order.len());
    }

    #[test]
    fn test_compile_placeholders_and_warnings() {
        let output = Compiler::with_config(CompilerConfig::new().with_placeholder("nobody"))
            .compile(json!({"nodes": [{"name": "a", "type": "t"}]}))
            .unwrap();
        assert_eq!(output.description.name, "nobody");
        assert_eq!(output.description.user_id, "nobody");
        assert_eq!(output.description.node("a").unwrap().user_id, "nobody");
        assert_eq!(
            output.warnings,
            vec![
                SchemaWarning::MissingUserId,
                SchemaWarning::MissingInfraName,
                SchemaWarning::MissingScaling {
                    node: "a".to_string()
                },
                SchemaWarning::MissingDependencies,
            ]
        );
    }

    #[test]
    fn test_compile_max_nodes() {
        let err = Compiler::with_config(CompilerConfig::new().with_max_nodes(3))
            .compile(DIAMOND)
            .unwrap_err();
        assert!(matches!(err, CompileError::TooManyNodes { count: 4, limit: 3 }));
    }

    #[test]
    fn test_compile_bad_yaml() {
        let err = Compiler::new().compile("nodes: [").unwrap_err();
        assert!(matches!(err, CompileError::Deserialize(_)));
    }

    #[test]
    fn test_compile_shape_error_propagates_unchanged() {
        struct Reject;
        impl ShapeCheck for Reject {
            fn check(&self, _: &Value, _: &mut dyn WarningReporter) -> SchemaResult<()> {
                Err(SchemaError::new("rejected").with_context("in test"))
            }
        }

        let err = Compiler::new()
            .with_shape_check(Arc::new(Reject))
            .compile(DIAMOND)
            .unwrap_err();
        match err {
            CompileError::Schema(e) => {
                assert_eq!(e, SchemaError::new("rejected").with_context("in test"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_carries_suspension_and_strategy() {
        let output = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "s",
                "nodes": [],
                "dependencies": [],
                "init_suspended": true,
                "userinfo_strategy": {"protocol": "basic"},
            }))
            .unwrap();
        assert!(output.description.suspended);
        assert_eq!(
            output.description.userinfo_strategy,
            Some(json!({"protocol": "basic"}))
        );
        assert!(output.description.topological_order.is_empty());
    }

    #[test]
    fn test_compiled_description_serializes() {
        let output = Compiler::new().compile(DIAMOND).unwrap();
        let value = serde_json::to_value(&output.description).unwrap();

        assert_eq!(value["name"], json!("diamond"));
        assert_eq!(value["topological_order"][0], json!(["A"]));
        let b = &value["nodes"]["B"];
        assert_eq!(b["type"], json!("app"));
        assert_eq!(b["infra_id"], json!(output.description.infra_id.to_string()));
        assert_eq!(
            b["mappings"]["inbound"]["A"],
            json!([{"attributes": ["ip", "db_host"], "synch": true}])
        );
        assert!(value.get("userinfo_strategy").is_none());
    }

    #[test]
    fn test_compiled_edge_annotations_cannot_flip_direction() {
        let output = Compiler::new()
            .compile(json!({
                "user_id": "u",
                "infra_name": "ann",
                "nodes": [{"name": "db", "type": "t"}, {"name": "app", "type": "t"}],
                "dependencies": [
                    {"connection": ["app", "db"], "dependent": "db", "dependee": "app", "label": "x"},
                    ["app", "db"],
                ],
            }))
            .unwrap();

        let value = serde_json::to_value(&output.description).unwrap();
        let edge = &value["edges"][0];
        assert_eq!(edge["dependent"], json!("app"));
        assert_eq!(edge["dependee"], json!("db"));
        assert_eq!(
            edge["annotations"],
            json!({"dependent": "db", "dependee": "app", "label": "x"})
        );
        assert!(value["edges"][1].get("annotations").is_none());

        let yaml = serde_yaml::to_string(&output.description).unwrap();
        let reparsed: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed["edges"][0]["dependent"], json!("app"));
        assert_eq!(reparsed["edges"][0]["dependee"], json!("db"));
    }

    #[test]
    fn test_compiler_is_shareable_across_threads() {
        let compiler = Arc::new(Compiler::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let compiler = Arc::clone(&compiler);
                std::thread::spawn(move || compiler.compile(DIAMOND).map(|o| o.description))
            })
            .collect();
        let ids: BTreeSet<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().infra_id)
            .collect();
        assert_eq!(ids.len(), 4);
    }
}
