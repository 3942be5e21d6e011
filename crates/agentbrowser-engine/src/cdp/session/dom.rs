//! DOM and accessibility reads for CDP page session.

use serde_json::json;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{AXNode, DomNode, DomSnapshot, RemoteObject};

use super::core::PageSession;

impl PageSession {
    /// Whole document, piercing shadow roots and same-process frames.
    pub async fn get_document(&self) -> Result<DomNode, CdpError> {
        let result = self
            .call(
                "DOM.getDocument",
                Some(json!({"depth": -1, "pierce": true})),
            )
            .await?;

        let root: DomNode = serde_json::from_value(result["root"].clone())?;
        Ok(root)
    }

    /// Describe the node behind a remote object, with its subtree when
    /// `depth` is -1.
    pub async fn describe_node(&self, object_id: &str, depth: i64) -> Result<DomNode, CdpError> {
        let result = self
            .call(
                "DOM.describeNode",
                Some(json!({
                    "objectId": object_id,
                    "depth": depth,
                    "pierce": true,
                })),
            )
            .await?;
        let node: DomNode = serde_json::from_value(result["node"].clone())?;
        Ok(node)
    }

    /// Runtime handle for a backend node id.
    pub async fn resolve_backend_node(&self, backend_node_id: i64) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "DOM.resolveNode",
                Some(json!({"backendNodeId": backend_node_id})),
            )
            .await?;

        let obj: RemoteObject = serde_json::from_value(result["object"].clone())?;
        Ok(obj)
    }

    /// Full accessibility tree of the page, or of one frame.
    pub async fn get_accessibility_tree(
        &self,
        frame_id: Option<&str>,
    ) -> Result<Vec<AXNode>, CdpError> {
        self.call("Accessibility.enable", None).await?;
        let params = frame_id.map(|id| json!({ "frameId": id }));
        let result = self.call("Accessibility.getFullAXTree", params).await?;
        let nodes: Vec<AXNode> = serde_json::from_value(result["nodes"].clone())?;
        Ok(nodes)
    }

    /// Layout tree with the computed styles that decide visibility.
    pub async fn capture_layout(&self) -> Result<DomSnapshot, CdpError> {
        let result = self
            .call(
                "DOMSnapshot.captureSnapshot",
                Some(json!({
                    "computedStyles": ["display", "visibility"],
                    "includePaintOrder": true,
                })),
            )
            .await?;
        let snapshot: DomSnapshot = serde_json::from_value(result)?;
        Ok(snapshot)
    }
}
