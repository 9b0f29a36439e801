//! Infrastructure description input model.

use crate::graph::{EdgeSpec, Node};
use crate::mapping::Mapping;
use infragraph_core::{SchemaError, SchemaResult, Variables};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A description as handed to the compiler
#[derive(Debug, Clone, PartialEq)]
pub enum RawDescription {
    /// Already deserialized
    Structured(Value),
    /// YAML (or JSON) text
    Text(String),
}

impl RawDescription {
    /// Deserialize if necessary
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid YAML
    pub fn into_value(self) -> Result<Value, serde_yaml::Error> {
        match self {
            Self::Structured(value) => Ok(value),
            Self::Text(text) => serde_yaml::from_str(&text),
        }
    }
}

impl From<Value> for RawDescription {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for RawDescription {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawDescription {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Typed view of a description that passed the shape check
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfraDescription {
    /// `infra_name` (or its alias `name`)
    pub name: Option<String>,
    /// Requesting user
    pub user_id: Option<String>,
    /// Node records in description order
    pub nodes: Vec<Node>,
    /// Dependencies in description order
    pub dependencies: Vec<EdgeSpec>,
    /// Infrastructure-level variable defaults
    pub variables: Variables,
    /// Start the infrastructure suspended
    pub suspended: bool,
    /// Opaque user-info strategy passed to later stages
    pub userinfo_strategy: Option<Value>,
}

#[derive(Deserialize)]
struct DescriptionRepr {
    user_id: Option<String>,
    #[serde(alias = "name")]
    infra_name: Option<String>,
    nodes: Vec<Map<String, Value>>,
    #[serde(default)]
    dependencies: Vec<Value>,
    #[serde(default)]
    variables: Variables,
    #[serde(default)]
    init_suspended: bool,
    #[serde(default)]
    userinfo_strategy: Option<Value>,
}

/// A dependency is either `[dependent, dependee]` or a mapping with a
/// `connection` pair, optional `mappings`, and free-form annotations.
#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyRepr {
    Pair(String, String),
    Full {
        connection: (String, String),
        #[serde(default)]
        mappings: Vec<Mapping>,
        #[serde(flatten)]
        annotations: Map<String, Value>,
    },
}

impl InfraDescription {
    /// Read the typed view out of a description value
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the offending node or dependency
    pub fn from_value(desc: &Value) -> SchemaResult<Self> {
        let repr = DescriptionRepr::deserialize(desc)
            .map_err(|e| SchemaError::new(format!("malformed description: {}", e)))?;

        let nodes = repr
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, record)| match record.get("name") {
                Some(Value::String(name)) => Ok(Node::with_record(name.clone(), record)),
                Some(_) => Err(SchemaError::invalid_type(
                    "name",
                    &format!("node #{}", i),
                    "a string",
                )),
                None => Err(SchemaError::missing_key("name", &format!("node #{}", i))),
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        let dependencies = repr
            .dependencies
            .iter()
            .enumerate()
            .map(|(i, dep)| parse_dependency(i, dep))
            .collect::<SchemaResult<Vec<_>>>()?;

        Ok(Self {
            name: repr.infra_name,
            user_id: repr.user_id,
            nodes,
            dependencies,
            variables: repr.variables,
            suspended: repr.init_suspended,
            userinfo_strategy: repr.userinfo_strategy,
        })
    }
}

fn parse_dependency(index: usize, dep: &Value) -> SchemaResult<EdgeSpec> {
    let repr = DependencyRepr::deserialize(dep).map_err(|_| {
        SchemaError::new(format!(
            "dependency #{} must name exactly two nodes, either as a pair or as \
             \"connection\", with well-formed \"mappings\"",
            index
        ))
    })?;

    Ok(match repr {
        DependencyRepr::Pair(dependent, dependee) => EdgeSpec::new(dependent, dependee),
        DependencyRepr::Full {
            connection: (dependent, dependee),
            mappings,
            annotations,
        } => EdgeSpec {
            dependent,
            dependee,
            mappings,
            annotations,
        },
    })
}
