//! Deep checks of node definitions, delegated per section.
//!
//! A node definition document maps `node_def:<name>` keys to a list of
//! alternative implementations. Every implementation carries a mandatory
//! `resource` section and optional `config_management`,
//! `contextualisation` and `health_check` sections. Each present section
//! is handed to the checker registered for its category and `type`.

use crate::checker::SectionCategory;
use crate::registry::CheckerRegistry;
use infragraph_core::{SchemaError, SchemaResult};
use serde_json::{Map, Value};

const NODE_DEF_PREFIX: &str = "node_def";

/// Health checks without an explicit type use this one
const DEFAULT_HEALTH_CHECK: &str = "basic";

/// Validate a node definition document.
///
/// # Errors
///
/// Returns the first [`SchemaError`] found. Its context names the node,
/// and for section failures also the section and entry index.
pub fn check_node_definitions(defs: &Value, registry: &CheckerRegistry) -> SchemaResult<()> {
    let defs = defs
        .as_object()
        .ok_or_else(|| SchemaError::new("node definitions must be a mapping"))?;

    for (key, def) in defs {
        let name = node_name(key)?;
        let context = format!("in node {:?}", name);

        let entries = def.as_array().ok_or_else(|| {
            SchemaError::new("node definition has to be a list of mappings")
                .with_context(context.clone())
        })?;

        for (index, entry) in entries.iter().enumerate() {
            let entry = entry.as_object().ok_or_else(|| {
                SchemaError::new("node definition has to be a list of mappings")
                    .with_context(context.clone())
            })?;
            check_entry(name, index, entry, registry)?;
        }

        tracing::debug!(node = name, implementations = entries.len(), "node definition checked");
    }

    Ok(())
}

fn node_name(key: &str) -> SchemaResult<&str> {
    match key.split_once(':') {
        Some((NODE_DEF_PREFIX, name)) if !name.is_empty() => Ok(name),
        _ => Err(
            SchemaError::new("node definition must begin with 'node_def:<nodename>'")
                .with_context(format!("in node {:?}", key)),
        ),
    }
}

fn check_entry(
    name: &str,
    index: usize,
    entry: &Map<String, Value>,
    registry: &CheckerRegistry,
) -> SchemaResult<()> {
    if let Some(key) = entry.keys().find(|k| SectionCategory::from_key(k).is_none()) {
        return Err(SchemaError::new(format!("invalid section {:?}", key))
            .with_context(format!("in node {:?}", name)));
    }

    for category in SectionCategory::ALL {
        let section_context = || {
            format!(
                "in '{}' section of node {:?}[{}]",
                category.key(),
                name,
                index
            )
        };

        let section = match entry.get(category.key()) {
            Some(section) => section,
            None if category == SectionCategory::Resource => {
                return Err(SchemaError::new("missing 'resource' section")
                    .with_context(section_context()));
            }
            None => continue,
        };

        check_section(category, section, registry)
            .map_err(|e| e.with_context(section_context()))?;
    }

    Ok(())
}

fn check_section(
    category: SectionCategory,
    section: &Value,
    registry: &CheckerRegistry,
) -> SchemaResult<()> {
    let section = section
        .as_object()
        .ok_or_else(|| SchemaError::new("section must be a mapping"))?;

    let kind = match (section.get("type"), category) {
        (Some(Value::String(kind)), _) => kind.as_str(),
        (Some(_), _) => return Err(SchemaError::new("key 'type' must be a string")),
        (None, SectionCategory::HealthCheck) => DEFAULT_HEALTH_CHECK,
        (None, _) => return Err(SchemaError::new("missing key 'type'")),
    };

    registry.resolve(category, kind)?.perform_check(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{KeysChecker, SectionChecker};
    use std::sync::Arc;

    fn registry() -> CheckerRegistry {
        let mut registry = CheckerRegistry::new();
        let checkers: Vec<Arc<dyn SectionChecker>> = vec![
            Arc::new(
                KeysChecker::new(SectionCategory::Resource, "ec2")
                    .with_required(["endpoint", "regionname"]),
            ),
            Arc::new(KeysChecker::new(SectionCategory::ConfigManagement, "chef")),
            Arc::new(KeysChecker::new(SectionCategory::Contextualisation, "cloudinit")),
            Arc::new(
                KeysChecker::new(SectionCategory::HealthCheck, "basic")
                    .with_allowed(["ping", "ports"]),
            ),
        ];
        for checker in checkers {
            registry.register(checker).unwrap();
        }
        registry
    }

    fn resource() -> Value {
        serde_json::json!({"type": "ec2", "endpoint": "https://ec2", "regionname": "eu"})
    }

    #[test]
    fn test_valid_definition() {
        let defs = serde_json::json!({
            "node_def:db": [
                {
                    "resource": resource(),
                    "config_management": {"type": "chef"},
                    "contextualisation": {"type": "cloudinit"},
                    "health_check": {"ping": true},
                },
                {"resource": resource()},
            ]
        });
        assert!(check_node_definitions(&defs, &registry()).is_ok());
    }

    #[test]
    fn test_bad_prefix() {
        let defs = serde_json::json!({"nodedef:db": []});
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("node_def:<nodename>"));

        let defs = serde_json::json!({"db": []});
        assert!(check_node_definitions(&defs, &registry()).is_err());
    }

    #[test]
    fn test_definition_must_be_list() {
        let defs = serde_json::json!({"node_def:db": {"resource": resource()}});
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert_eq!(err.context.as_deref(), Some("in node \"db\""));
    }

    #[test]
    fn test_invalid_section() {
        let defs = serde_json::json!({
            "node_def:db": [{"resource": resource(), "network": {}}]
        });
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("network"));
    }

    #[test]
    fn test_missing_resource() {
        let defs = serde_json::json!({"node_def:db": [{"config_management": {"type": "chef"}}]});
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("resource"));
        assert_eq!(
            err.context.as_deref(),
            Some("in 'resource' section of node \"db\"[0]")
        );
    }

    #[test]
    fn test_section_missing_type() {
        let defs = serde_json::json!({
            "node_def:db": [{"resource": resource()}, {"resource": {"endpoint": "x"}}]
        });
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("type"));
        assert_eq!(
            err.context.as_deref(),
            Some("in 'resource' section of node \"db\"[1]")
        );
    }

    #[test]
    fn test_unregistered_type() {
        let defs = serde_json::json!({
            "node_def:db": [{"resource": resource(), "config_management": {"type": "puppet"}}]
        });
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("puppet"));
        assert_eq!(
            err.context.as_deref(),
            Some("in 'config_management' section of node \"db\"[0]")
        );
    }

    #[test]
    fn test_checker_failure_gets_context() {
        let defs = serde_json::json!({
            "node_def:web": [{"resource": {"type": "ec2", "endpoint": "x"}}]
        });
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("regionname"));
        assert_eq!(
            err.context.as_deref(),
            Some("in 'resource' section of node \"web\"[0]")
        );
    }

    #[test]
    fn test_health_check_defaults_to_basic() {
        let defs = serde_json::json!({
            "node_def:db": [{"resource": resource(), "health_check": {"pong": 1}}]
        });
        let err = check_node_definitions(&defs, &registry()).unwrap_err();
        assert!(err.message.contains("pong"));

        let empty = CheckerRegistry::new();
        let defs = serde_json::json!({
            "node_def:db": [{"resource": resource()}]
        });
        let err = check_node_definitions(&defs, &empty).unwrap_err();
        assert!(err.message.contains("ec2"));
    }
}
