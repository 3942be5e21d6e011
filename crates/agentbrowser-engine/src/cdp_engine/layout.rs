//! Conversions from raw protocol payloads into the page-model inputs.

use std::collections::{BTreeMap, HashSet};

use agentbrowser_snapshot::fusion::{BoundingBox, LayoutRecord, RawDomNode, ELEMENT_NODE};
use agentbrowser_snapshot::RawAxNode;

use crate::cdp::{AXNode, DomNode, DomSnapshot, FrameTree};
use crate::types::FrameInfo;

pub(super) fn raw_dom(node: &DomNode) -> RawDomNode {
    let attributes = node
        .attributes
        .as_deref()
        .unwrap_or_default()
        .chunks(2)
        .filter_map(|pair| match pair {
            [name, value] => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect();

    let mut children: Vec<RawDomNode> = Vec::new();
    // Shadow trees render in place of the light children they slot.
    for shadow in node.shadow_roots.iter().flatten() {
        children.push(raw_dom(shadow));
    }
    for child in node.children.iter().flatten() {
        children.push(raw_dom(child));
    }
    if let Some(document) = &node.content_document {
        children.push(raw_dom(document));
    }

    RawDomNode {
        backend_node_id: node.backend_node_id,
        node_type: u32::try_from(node.node_type).unwrap_or_default(),
        node_name: node.node_name.clone(),
        node_value: node.node_value.clone().unwrap_or_default(),
        attributes,
        children,
    }
}

/// The content document of the `<iframe>` hosting `frame_id`.
pub(super) fn frame_document<'a>(node: &'a DomNode, frame_id: &str) -> Option<&'a DomNode> {
    if node.frame_id.as_deref() == Some(frame_id) {
        if let Some(document) = node.content_document.as_deref() {
            return Some(document);
        }
    }
    node.children
        .iter()
        .flatten()
        .chain(node.shadow_roots.iter().flatten())
        .chain(node.content_document.as_deref())
        .find_map(|child| frame_document(child, frame_id))
}

pub(super) fn collect_backend_ids(node: &DomNode, out: &mut Vec<i64>) {
    out.push(node.backend_node_id);
    for child in node
        .children
        .iter()
        .flatten()
        .chain(node.shadow_roots.iter().flatten())
        .chain(node.content_document.as_deref())
    {
        collect_backend_ids(child, out);
    }
}

/// Layout records for every element in the snapshot. Elements without a
/// layout object are not rendered and come back as `display: none`.
pub(super) fn layout_records(snapshot: &DomSnapshot) -> Vec<LayoutRecord> {
    let style = |index: Option<&i64>| {
        index
            .and_then(|&i| usize::try_from(i).ok())
            .and_then(|i| snapshot.strings.get(i))
            .cloned()
    };

    let mut records = Vec::new();
    for document in &snapshot.documents {
        let nodes = &document.nodes;
        let layout = &document.layout;
        let mut laid_out = HashSet::new();

        for (row, &node_index) in layout.node_index.iter().enumerate() {
            let Some(&backend_node_id) = nodes.backend_node_id.get(node_index) else {
                continue;
            };
            if !laid_out.insert(node_index) {
                continue;
            }
            let styles = layout.styles.get(row);
            let bounds = layout.bounds.get(row).and_then(|b| match b.as_slice() {
                [x, y, width, height, ..] => Some(BoundingBox {
                    x: *x,
                    y: *y,
                    width: *width,
                    height: *height,
                }),
                _ => None,
            });
            records.push(LayoutRecord {
                backend_node_id,
                bounds,
                display: style(styles.and_then(|s| s.first())),
                visibility: style(styles.and_then(|s| s.get(1))),
                paint_order: layout.paint_orders.get(row).copied(),
            });
        }

        for (index, &node_type) in nodes.node_type.iter().enumerate() {
            if node_type != i64::from(ELEMENT_NODE) || laid_out.contains(&index) {
                continue;
            }
            if let Some(&backend_node_id) = nodes.backend_node_id.get(index) {
                records.push(LayoutRecord {
                    backend_node_id,
                    display: Some("none".to_string()),
                    ..LayoutRecord::default()
                });
            }
        }
    }
    records
}

pub(super) fn raw_ax_nodes(nodes: Vec<AXNode>) -> Vec<RawAxNode> {
    nodes
        .into_iter()
        .map(|node| {
            let properties: BTreeMap<_, _> = node
                .properties
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| Some((p.name, p.value.value?)))
                .collect();
            RawAxNode {
                node_id: node.node_id,
                parent_id: node.parent_id,
                child_ids: node.child_ids.unwrap_or_default(),
                role: node.role.and_then(|r| r.as_text()).unwrap_or_default(),
                name: node.name.and_then(|n| n.as_text()).unwrap_or_default(),
                value: node.value.and_then(|v| v.as_text()),
                ignored: node.ignored,
                properties,
                backend_node_id: node.backend_dom_node_id,
            }
        })
        .collect()
}

pub(super) fn flatten_frames(tree: &FrameTree, out: &mut Vec<FrameInfo>) {
    out.push(FrameInfo {
        id: tree.frame.id.clone(),
        name: tree.frame.name.clone().unwrap_or_default(),
        url: tree.frame.url.clone(),
        parent_id: tree.frame.parent_id.clone(),
    });
    for child in &tree.child_frames {
        flatten_frames(child, out);
    }
}
