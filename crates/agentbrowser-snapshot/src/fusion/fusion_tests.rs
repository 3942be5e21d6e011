use super::*;
use crate::ax_tree::RawAxNode;
use std::collections::HashSet;

fn element(id: i64, name: &str, children: Vec<RawDomNode>) -> RawDomNode {
    RawDomNode {
        backend_node_id: id,
        node_type: ELEMENT_NODE,
        node_name: name.to_string(),
        children,
        ..RawDomNode::default()
    }
}

fn text(id: i64, value: &str) -> RawDomNode {
    RawDomNode {
        backend_node_id: id,
        node_type: TEXT_NODE,
        node_name: "#text".to_string(),
        node_value: value.to_string(),
        ..RawDomNode::default()
    }
}

fn layout(id: i64, display: &str, width: f64, height: f64) -> LayoutRecord {
    LayoutRecord {
        backend_node_id: id,
        bounds: Some(BoundingBox {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }),
        display: Some(display.to_string()),
        visibility: Some("visible".to_string()),
        paint_order: Some(id),
    }
}

/// document(1) > html(2) > body(3) > [button(4) "Go", div(5, display:none) > span(6), comment(7), "  "(8)]
fn sample() -> DomSources {
    let mut button = element(4, "BUTTON", vec![text(9, "Go")]);
    button.attributes = vec![("id".to_string(), "go".to_string())];
    let hidden = element(5, "DIV", vec![element(6, "SPAN", Vec::new())]);
    let comment = RawDomNode {
        backend_node_id: 7,
        node_type: COMMENT_NODE,
        node_name: "#comment".to_string(),
        node_value: "note".to_string(),
        ..RawDomNode::default()
    };
    let body = element(3, "BODY", vec![button, hidden, comment, text(8, "  \n ")]);
    let document = RawDomNode {
        backend_node_id: 1,
        node_type: DOCUMENT_NODE,
        node_name: "#document".to_string(),
        children: vec![element(2, "HTML", vec![body])],
        ..RawDomNode::default()
    };

    DomSources {
        document,
        ax_nodes: vec![RawAxNode {
            node_id: "ax4".to_string(),
            role: "button".to_string(),
            name: "Go".to_string(),
            backend_node_id: Some(4),
            ..RawAxNode::default()
        }],
        layout: vec![
            layout(3, "block", 800.0, 600.0),
            layout(4, "inline-block", 40.0, 20.0),
            layout(5, "none", 0.0, 0.0),
            layout(6, "inline", 10.0, 10.0),
        ],
    }
}

fn body(tree: &EnhancedDomTreeNode) -> &EnhancedDomTreeNode {
    tree.find(3).unwrap()
}

#[test]
fn test_display_none_pruned_by_default() {
    let tree = fuse(&sample(), &FusionOptions::default()).unwrap();
    assert!(tree.find(5).is_none());
    assert!(tree.find(6).is_none());
    assert!(tree.find(4).is_some());
}

#[test]
fn test_include_hidden_marks_invisible() {
    let options = FusionOptions {
        include_hidden: true,
        ..FusionOptions::default()
    };
    let tree = fuse(&sample(), &options).unwrap();
    assert!(!tree.find(5).unwrap().is_visible);
    // Inherited from the hidden parent even though its own box is fine.
    assert!(!tree.find(6).unwrap().is_visible);
    assert!(tree.find(4).unwrap().is_visible);
}

#[test]
fn test_comments_and_whitespace_text_dropped() {
    let tree = fuse(&sample(), &FusionOptions::default()).unwrap();
    assert!(tree.find(7).is_none());
    assert!(tree.find(8).is_none());
    assert_eq!(tree.find(9).unwrap().node_value, "Go");
    assert_eq!(body(&tree).children.len(), 1);
}

#[test]
fn test_ax_and_layout_joined() {
    let tree = fuse(&sample(), &FusionOptions::default()).unwrap();
    let button = tree.find(4).unwrap();
    assert_eq!(button.node_name, "button");
    assert_eq!(button.attributes.get("id").map(String::as_str), Some("go"));
    let ax = button.ax.as_ref().unwrap();
    assert_eq!(ax.role, "button");
    assert_eq!(ax.name, "Go");
    assert_eq!(button.bounds.unwrap().width, 40.0);
    assert_eq!(button.paint_order, Some(4));
}

#[test]
fn test_missing_layout_counts_as_visible() {
    let tree = fuse(&sample(), &FusionOptions::default()).unwrap();
    let html = tree.find(2).unwrap();
    assert!(html.is_visible);
    assert!(html.bounds.is_none());
}

#[test]
fn test_zero_area_and_visibility_hidden() {
    let mut sources = sample();
    sources.layout[1] = layout(4, "inline-block", 0.0, 20.0);
    let tree = fuse(&sources, &FusionOptions::default()).unwrap();
    assert!(tree.find(4).is_none());

    let mut sources = sample();
    sources.layout[1].visibility = Some("hidden".to_string());
    let tree = fuse(&sources, &FusionOptions::default()).unwrap();
    assert!(tree.find(4).is_none());
}

#[test]
fn test_max_depth() {
    let options = FusionOptions {
        max_depth: Some(2),
        ..FusionOptions::default()
    };
    let tree = fuse(&sample(), &options).unwrap();
    assert!(tree.find(3).is_some());
    assert!(body(&tree).children.is_empty());
}

#[test]
fn test_scope_starts_at_matching_node() {
    let options = FusionOptions {
        scope: Some(HashSet::from([4])),
        ..FusionOptions::default()
    };
    let tree = fuse(&sample(), &options).unwrap();
    assert_eq!(tree.backend_node_id, 4);
    assert_eq!(tree.node_count(), 2);
}

#[test]
fn test_scope_inside_hidden_subtree() {
    let scope = Some(HashSet::from([6]));
    let options = FusionOptions {
        scope: scope.clone(),
        ..FusionOptions::default()
    };
    assert!(fuse(&sample(), &options).is_none());

    let options = FusionOptions {
        scope,
        include_hidden: true,
        ..FusionOptions::default()
    };
    let tree = fuse(&sample(), &options).unwrap();
    assert_eq!(tree.backend_node_id, 6);
    assert!(!tree.is_visible);
}

#[test]
fn test_serialized_shape() {
    let tree = fuse(&sample(), &FusionOptions::default()).unwrap();
    let value = serde_json::to_value(tree.find(4).unwrap()).unwrap();
    assert_eq!(value["backendNodeId"], 4);
    assert_eq!(value["isVisible"], true);
    assert_eq!(value["ax"]["role"], "button");
    assert!(value.get("nodeValue").is_none());
}

#[test]
fn test_bounding_box_helpers() {
    let bbox = BoundingBox {
        x: 10.0,
        y: 20.0,
        width: 100.0,
        height: 50.0,
    };
    assert!(bbox.contains(50.0, 40.0));
    assert!(!bbox.contains(0.0, 0.0));
    assert_eq!(bbox.center(), (60.0, 45.0));
    assert_eq!(bbox.area(), 5000.0);
}
