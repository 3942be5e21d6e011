//! Multi-source DOM fusion.
//!
//! The engine reports a page three ways: the raw DOM tree, the flat
//! accessibility node list and per-node layout records. [`fuse`] joins them
//! on backend node id into one [`EnhancedDomTreeNode`] tree with a computed
//! visibility flag.
//!
//! A node is visible when its computed style is neither `display: none` nor
//! `visibility: hidden`, and its layout box (if one was reported) has a
//! non-zero area. Nodes without a layout record count as visible. An
//! invisible node makes its whole subtree invisible.

mod dom_types;
mod fuse;

pub use dom_types::{
    AxInfo, BoundingBox, DomSources, EnhancedDomTreeNode, LayoutRecord, RawDomNode,
    COMMENT_NODE, DOCUMENT_FRAGMENT_NODE, DOCUMENT_NODE, DOCUMENT_TYPE_NODE, ELEMENT_NODE,
    TEXT_NODE,
};
pub use fuse::{fuse, FusionOptions};

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;
