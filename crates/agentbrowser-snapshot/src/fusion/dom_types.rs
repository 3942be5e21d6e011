//! DOM fusion types: raw engine sources and the fused node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ax_tree::{AxStates, RawAxNode};

pub const ELEMENT_NODE: u32 = 1;
pub const TEXT_NODE: u32 = 3;
pub const COMMENT_NODE: u32 = 8;
pub const DOCUMENT_NODE: u32 = 9;
pub const DOCUMENT_TYPE_NODE: u32 = 10;
pub const DOCUMENT_FRAGMENT_NODE: u32 = 11;

/// Absolute bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One node of the engine's raw DOM tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDomNode {
    pub backend_node_id: i64,
    pub node_type: u32,
    pub node_name: String,
    #[serde(default)]
    pub node_value: String,
    /// Attribute pairs in document order.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<RawDomNode>,
}

/// Layout and computed style for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub backend_node_id: i64,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub paint_order: Option<i64>,
}

/// Everything the engine reports about a page for fusion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSources {
    pub document: RawDomNode,
    #[serde(default)]
    pub ax_nodes: Vec<RawAxNode>,
    #[serde(default)]
    pub layout: Vec<LayoutRecord>,
}

/// Accessibility facts attached to a fused node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxInfo {
    pub role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub states: AxStates,
}

/// A DOM node joined with its accessibility and layout data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedDomTreeNode {
    pub backend_node_id: i64,
    pub node_type: u32,
    pub node_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ax: Option<AxInfo>,
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EnhancedDomTreeNode>,
}

impl EnhancedDomTreeNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Depth-first search by backend node id.
    pub fn find(&self, backend_node_id: i64) -> Option<&EnhancedDomTreeNode> {
        if self.backend_node_id == backend_node_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(backend_node_id))
    }
}
