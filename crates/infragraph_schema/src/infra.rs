//! Shallow shape check of a whole infrastructure description.

use crate::report::{SchemaWarning, WarningReporter};
use infragraph_core::{SchemaError, SchemaResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Keys accepted at the top level of a description
const INFRA_KEYS: &[&str] = &[
    "user_id",
    "infra_name",
    "name",
    "nodes",
    "dependencies",
    "variables",
    "init_suspended",
    "userinfo_strategy",
];

/// Keys accepted in a node record
const NODE_KEYS: &[&str] = &["name", "type", "scaling", "filter", "variables"];

/// Keys accepted in a node's scaling section
const SCALING_KEYS: &[&str] = &["min", "max"];

static INFRA_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{1,64}$").expect("infra name pattern is valid"));

/// Check whether `name` is a valid infrastructure name.
///
/// ASCII letters, digits and hyphens only, 1 to 64 characters, no dots.
#[must_use]
pub fn is_valid_infra_name(name: &str) -> bool {
    INFRA_NAME.is_match(name)
}

/// Validate the shape of an infrastructure description.
///
/// Deep validation of node sections is not done here; see
/// [`check_node_definitions`](crate::check_node_definitions).
///
/// # Errors
///
/// Returns the first [`SchemaError`] found. Warnings are passed to
/// `reporter` and never fail the check.
pub fn check_infra_shape(desc: &Value, reporter: &mut dyn WarningReporter) -> SchemaResult<()> {
    let desc = desc
        .as_object()
        .ok_or_else(|| SchemaError::new("infrastructure description must be a mapping"))?;

    check_known_keys(desc, INFRA_KEYS, "infrastructure description")?;

    match desc.get("user_id") {
        None => reporter.report(SchemaWarning::MissingUserId),
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(SchemaError::invalid_type(
                "user_id",
                "infrastructure description",
                "a string",
            ))
        }
    }

    check_infra_name(desc, reporter)?;

    let nodes = desc
        .get("nodes")
        .ok_or_else(|| SchemaError::missing_key("nodes", "infrastructure description"))?
        .as_array()
        .ok_or_else(|| {
            SchemaError::invalid_type("nodes", "infrastructure description", "a sequence")
        })?;
    for node in nodes {
        check_node(node, reporter)?;
    }

    match desc.get("dependencies") {
        None => reporter.report(SchemaWarning::MissingDependencies),
        Some(Value::Array(deps)) => {
            for (index, dep) in deps.iter().enumerate() {
                check_dependency(index, dep)?;
            }
        }
        Some(_) => {
            return Err(SchemaError::invalid_type(
                "dependencies",
                "infrastructure description",
                "a sequence",
            ))
        }
    }

    if let Some(vars) = desc.get("variables") {
        if !vars.is_object() {
            return Err(SchemaError::invalid_type(
                "variables",
                "infrastructure description",
                "a mapping",
            ));
        }
    }

    if let Some(suspended) = desc.get("init_suspended") {
        if !suspended.is_boolean() {
            return Err(SchemaError::invalid_type(
                "init_suspended",
                "infrastructure description",
                "a boolean",
            ));
        }
    }

    Ok(())
}

fn check_known_keys(map: &Map<String, Value>, known: &[&str], owner: &str) -> SchemaResult<()> {
    match map.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(SchemaError::unknown_key(key, owner)),
        None => Ok(()),
    }
}

fn check_infra_name(
    desc: &Map<String, Value>,
    reporter: &mut dyn WarningReporter,
) -> SchemaResult<()> {
    let name = match (desc.get("infra_name"), desc.get("name")) {
        (Some(_), Some(_)) => {
            return Err(SchemaError::new(
                "both \"infra_name\" and \"name\" given in infrastructure description",
            ))
        }
        (Some(name), None) | (None, Some(name)) => name,
        (None, None) => {
            reporter.report(SchemaWarning::MissingInfraName);
            return Ok(());
        }
    };

    let name = name.as_str().ok_or_else(|| {
        SchemaError::invalid_type("infra_name", "infrastructure description", "a string")
    })?;
    if !is_valid_infra_name(name) {
        return Err(SchemaError::new(format!(
            "invalid infrastructure name {:?}: must be a hostname-like token \
             (letters, digits and '-', at most 64 characters, no dots)",
            name
        )));
    }
    Ok(())
}

fn check_node(node: &Value, reporter: &mut dyn WarningReporter) -> SchemaResult<()> {
    let node = node
        .as_object()
        .ok_or_else(|| SchemaError::new("node must be a mapping"))?;

    let name = match node.get("name") {
        Some(Value::String(name)) => name.as_str(),
        Some(_) => return Err(SchemaError::invalid_type("name", "node", "a string")),
        None => return Err(SchemaError::missing_key("name", "node")),
    };
    let owner = format!("node {:?}", name);

    check_known_keys(node, NODE_KEYS, &owner)?;

    match node.get("type") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(SchemaError::invalid_type("type", &owner, "a string")),
        None => return Err(SchemaError::missing_key("type", &owner)),
    }

    match node.get("scaling") {
        None => reporter.report(SchemaWarning::MissingScaling {
            node: name.to_string(),
        }),
        Some(Value::Object(scaling)) => {
            check_known_keys(scaling, SCALING_KEYS, &format!("scaling of {}", owner))?;
        }
        Some(_) => return Err(SchemaError::invalid_type("scaling", &owner, "a mapping")),
    }

    if let Some(filter) = node.get("filter") {
        if !filter.is_object() {
            return Err(SchemaError::invalid_type("filter", &owner, "a mapping"));
        }
    }

    if let Some(vars) = node.get("variables") {
        if !vars.is_object() {
            return Err(SchemaError::invalid_type("variables", &owner, "a mapping"));
        }
    }

    Ok(())
}

fn check_dependency(index: usize, dep: &Value) -> SchemaResult<()> {
    let owner = format!("dependency #{}", index);
    match dep {
        Value::Array(_) => Ok(()),
        Value::Object(map) if map.contains_key("connection") => Ok(()),
        Value::Object(_) => Err(SchemaError::missing_key("connection", &owner)),
        _ => Err(SchemaError::new(format!(
            "{} must be a node pair or a mapping",
            owner
        ))),
    }
}
