//! Accessibility tree construction.
//!
//! Engines hand over a flat list of nodes linked by id. This module turns it
//! into an owned tree, dropping layout-only noise on the way:
//!
//! - `InlineTextBox` nodes are removed.
//! - Ignored nodes and unnamed `generic`/`none` wrappers are transparent:
//!   their children take their place.
//! - `StaticText` becomes a `text` leaf, and a text leaf that only repeats
//!   its parent's name is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One accessibility node as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAxNode {
    pub node_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub backend_node_id: Option<i64>,
}

/// Three-valued ARIA state (`aria-checked`, `aria-pressed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    True,
    False,
    Mixed,
}

impl Tristate {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(Tristate::True),
            Value::Bool(false) => Some(Tristate::False),
            Value::String(s) => match s.as_str() {
                "true" => Some(Tristate::True),
                "false" => Some(Tristate::False),
                "mixed" => Some(Tristate::Mixed),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxStates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<Tristate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressed: Option<Tristate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl AxStates {
    pub fn from_properties(properties: &BTreeMap<String, Value>) -> Self {
        let flag = |name: &str| properties.get(name).map(truthy).unwrap_or(false);
        Self {
            checked: properties.get("checked").and_then(Tristate::from_value),
            pressed: properties.get("pressed").and_then(Tristate::from_value),
            expanded: properties.get("expanded").map(truthy),
            level: properties
                .get("level")
                .and_then(Value::as_u64)
                .and_then(|l| u32::try_from(l).ok()),
            disabled: flag("disabled"),
            selected: flag("selected"),
            required: flag("required"),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

/// A node of the cleaned accessibility tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxNode {
    pub role: String,
    pub name: String,
    pub value: Option<String>,
    pub states: AxStates,
    pub backend_node_id: Option<i64>,
    pub hidden: bool,
    pub children: Vec<AxNode>,
}

impl AxNode {
    pub fn is_text(&self) -> bool {
        self.role == "text"
    }
}

const TRANSPARENT_ROLES: &[&str] = &["generic", "none", "presentation"];
const DOCUMENT_ROLES: &[&str] = &["RootWebArea", "WebArea"];

/// Build the cleaned tree from the engine's flat node list.
///
/// Returns the top-level nodes. The document node itself is transparent, so
/// for a normal page these are the children of the root web area.
pub fn build_tree(raw: &[RawAxNode]) -> Vec<AxNode> {
    let by_id: HashMap<&str, &RawAxNode> = raw.iter().map(|n| (n.node_id.as_str(), n)).collect();
    let referenced: HashSet<&str> = raw
        .iter()
        .flat_map(|n| n.child_ids.iter().map(String::as_str))
        .collect();

    let mut visited = HashSet::new();
    let mut roots = Vec::new();
    for node in raw {
        let is_root = match &node.parent_id {
            Some(parent) => !by_id.contains_key(parent.as_str()),
            None => !referenced.contains(node.node_id.as_str()),
        };
        if is_root {
            roots.extend(convert(&node.node_id, &by_id, &mut visited));
        }
    }
    roots
}

fn convert<'a>(
    id: &'a str,
    by_id: &HashMap<&'a str, &'a RawAxNode>,
    visited: &mut HashSet<&'a str>,
) -> Vec<AxNode> {
    let Some(&raw) = by_id.get(id) else {
        return Vec::new();
    };
    if !visited.insert(raw.node_id.as_str()) {
        return Vec::new();
    }

    let role = raw.role.as_str();
    if role == "InlineTextBox" {
        return Vec::new();
    }

    let name = normalize(&raw.name);

    if role == "StaticText" {
        if name.is_empty() {
            return Vec::new();
        }
        return vec![AxNode {
            role: "text".to_string(),
            name,
            hidden: is_hidden(raw),
            backend_node_id: raw.backend_node_id,
            ..AxNode::default()
        }];
    }

    let mut children: Vec<AxNode> = raw
        .child_ids
        .iter()
        .flat_map(|child| convert(child.as_str(), by_id, visited))
        .collect();

    let transparent = raw.ignored
        || DOCUMENT_ROLES.contains(&role)
        || (name.is_empty() && TRANSPARENT_ROLES.contains(&role));
    if transparent {
        return children;
    }

    if !name.is_empty() {
        children.retain(|child| !(child.is_text() && child.name == name));
    }

    vec![AxNode {
        role: role.to_string(),
        name,
        value: raw
            .value
            .as_deref()
            .map(normalize)
            .filter(|v| !v.is_empty()),
        states: AxStates::from_properties(&raw.properties),
        backend_node_id: raw.backend_node_id,
        hidden: is_hidden(raw),
        children,
    }]
}

fn is_hidden(raw: &RawAxNode) -> bool {
    raw.properties.get("hidden").map(truthy).unwrap_or(false)
}

/// Collapse runs of whitespace so names render on one line.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
