//! Join raw DOM, accessibility nodes and layout records on backend node id.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::dom_types::{
    AxInfo, DomSources, EnhancedDomTreeNode, LayoutRecord, RawDomNode, DOCUMENT_FRAGMENT_NODE,
    DOCUMENT_NODE, ELEMENT_NODE, TEXT_NODE,
};
use crate::ax_tree::{AxStates, RawAxNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FusionOptions {
    /// Children of the root are depth 1; nodes at `max_depth` keep no children.
    pub max_depth: Option<usize>,
    /// Keep invisible nodes, flagged with `is_visible = false`.
    pub include_hidden: bool,
    /// Restrict output to the first node (document order) whose backend id
    /// is in the set.
    pub scope: Option<HashSet<i64>>,
}

/// Build the fused tree. Returns `None` when nothing survives filtering
/// (for instance a hidden scope root without `include_hidden`).
pub fn fuse(sources: &DomSources, options: &FusionOptions) -> Option<EnhancedDomTreeNode> {
    let fuser = Fuser {
        ax: index_ax(&sources.ax_nodes),
        layout: sources
            .layout
            .iter()
            .map(|record| (record.backend_node_id, record))
            .collect(),
        options,
    };

    let (root, parent_visible) = match &options.scope {
        Some(scope) => fuser.find_scope(&sources.document, scope, true)?,
        None => (&sources.document, true),
    };

    let fused = fuser.fuse_node(root, 0, parent_visible);
    if let Some(tree) = &fused {
        debug!("Fused DOM tree with {} nodes", tree.node_count());
    }
    fused
}

fn index_ax(nodes: &[RawAxNode]) -> HashMap<i64, AxInfo> {
    nodes
        .iter()
        .filter(|n| !n.ignored && !n.role.is_empty())
        .filter_map(|n| {
            let id = n.backend_node_id?;
            Some((
                id,
                AxInfo {
                    role: n.role.clone(),
                    name: n.name.clone(),
                    states: AxStates::from_properties(&n.properties),
                },
            ))
        })
        .collect()
}

struct Fuser<'a> {
    ax: HashMap<i64, AxInfo>,
    layout: HashMap<i64, &'a LayoutRecord>,
    options: &'a FusionOptions,
}

impl<'a> Fuser<'a> {
    fn find_scope(
        &self,
        node: &'a RawDomNode,
        scope: &HashSet<i64>,
        parent_visible: bool,
    ) -> Option<(&'a RawDomNode, bool)> {
        if scope.contains(&node.backend_node_id) {
            return Some((node, parent_visible));
        }
        let visible = parent_visible && self.is_self_visible(node.backend_node_id);
        node.children
            .iter()
            .find_map(|child| self.find_scope(child, scope, visible))
    }

    fn is_self_visible(&self, backend_node_id: i64) -> bool {
        let Some(record) = self.layout.get(&backend_node_id) else {
            return true;
        };
        if record.display.as_deref() == Some("none") {
            return false;
        }
        if matches!(record.visibility.as_deref(), Some("hidden" | "collapse")) {
            return false;
        }
        record.bounds.is_none_or(|b| b.area() > 0.0)
    }

    fn fuse_node(
        &self,
        node: &RawDomNode,
        depth: usize,
        parent_visible: bool,
    ) -> Option<EnhancedDomTreeNode> {
        match node.node_type {
            ELEMENT_NODE | DOCUMENT_NODE | DOCUMENT_FRAGMENT_NODE => {}
            TEXT_NODE if !node.node_value.trim().is_empty() => {}
            _ => return None,
        }

        let is_visible = parent_visible && self.is_self_visible(node.backend_node_id);
        if !is_visible && !self.options.include_hidden {
            return None;
        }

        let children = if self.options.max_depth.is_some_and(|max| depth >= max) {
            Vec::new()
        } else {
            node.children
                .iter()
                .filter_map(|child| self.fuse_node(child, depth + 1, is_visible))
                .collect()
        };

        let layout = self.layout.get(&node.backend_node_id);
        let node_name = if node.node_type == ELEMENT_NODE {
            node.node_name.to_ascii_lowercase()
        } else {
            node.node_name.clone()
        };

        Some(EnhancedDomTreeNode {
            backend_node_id: node.backend_node_id,
            node_type: node.node_type,
            node_name,
            node_value: node.node_value.clone(),
            attributes: node.attributes.iter().cloned().collect::<BTreeMap<_, _>>(),
            ax: self.ax.get(&node.backend_node_id).cloned(),
            is_visible,
            bounds: layout.and_then(|l| l.bounds),
            paint_order: layout.and_then(|l| l.paint_order),
            children,
        })
    }
}
