//! Wire types for the DevTools protocol.
//!
//! Only the fields the engine reads are declared; serde ignores the rest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing command. `session_id` routes it to an attached target.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Anything the browser sends: a reply carries `id`, an event `method`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpMessage {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpFault>,
    pub method: Option<String>,
    pub params: Option<Value>,
    pub session_id: Option<String>,
}

impl CdpMessage {
    pub fn is_event(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdpFault {
    pub code: i64,
    pub message: String,
}

/// Entry of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub url: String,
}

/// `/json/version`. Chrome mixes PascalCase and camelCase here.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// `DOM.Node`, as returned by `getDocument` and `describeNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub node_id: i64,
    pub backend_node_id: i64,
    pub node_type: i64,
    pub node_name: String,
    pub node_value: Option<String>,
    pub children: Option<Vec<DomNode>>,
    /// Flat `[name, value, name, value, ...]` list.
    pub attributes: Option<Vec<String>>,
    pub frame_id: Option<String>,
    pub content_document: Option<Box<DomNode>>,
    pub shadow_roots: Option<Vec<DomNode>>,
}

/// `DOMSnapshot.captureSnapshot`, reduced to what layout needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DomSnapshot {
    pub documents: Vec<DocumentSnapshot>,
    pub strings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSnapshot {
    pub nodes: NodeTreeSnapshot,
    pub layout: LayoutTreeSnapshot,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTreeSnapshot {
    #[serde(default)]
    pub node_type: Vec<i64>,
    #[serde(default)]
    pub backend_node_id: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTreeSnapshot {
    #[serde(default)]
    pub node_index: Vec<usize>,
    /// One list of string-table indices per layout node, in the order of
    /// the requested computed styles.
    #[serde(default)]
    pub styles: Vec<Vec<i64>>,
    #[serde(default)]
    pub bounds: Vec<Vec<f64>>,
    #[serde(default)]
    pub paint_orders: Vec<i64>,
}

/// `Runtime.RemoteObject`. `object_id` is set for handles, `value` for
/// results returned by value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub value: Option<Value>,
    pub description: Option<String>,
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    pub text: String,
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// First line of the thrown error (`Error: boom`), else the generic
    /// exception text (`Uncaught`).
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .and_then(|d| d.lines().next())
            .map(str::to_string)
            .unwrap_or_else(|| self.text.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
    #[serde(default)]
    pub child_frames: Vec<FrameTree>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

/// `Input.dispatchMouseEvent` button. `None` is used for plain moves.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

impl From<agentbrowser_protocol::MouseButton> for MouseButton {
    fn from(button: agentbrowser_protocol::MouseButton) -> Self {
        use agentbrowser_protocol::MouseButton as Wire;
        match button {
            Wire::Left => Self::Left,
            Wire::Middle => Self::Middle,
            Wire::Right => Self::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MousePressed,
    MouseReleased,
    MouseMoved,
    MouseWheel,
}

/// `keyDown` for keys that produce text, `rawKeyDown` for the rest.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
    RawKeyDown,
}

/// `Accessibility.AXNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AXNode {
    pub node_id: String,
    #[serde(default)]
    pub ignored: bool,
    pub role: Option<AXValue>,
    pub name: Option<AXValue>,
    pub value: Option<AXValue>,
    pub properties: Option<Vec<AXProperty>>,
    pub parent_id: Option<String>,
    pub child_ids: Option<Vec<String>>,
    #[serde(rename = "backendDOMNodeId")]
    pub backend_dom_node_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AXValue {
    pub value: Option<Value>,
}

impl AXValue {
    /// Value rendered as text; numbers and booleans are stringified.
    pub fn as_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AXProperty {
    pub name: String,
    pub value: AXValue,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    Jpeg,
    Png,
}

impl From<agentbrowser_protocol::ImageFormat> for ScreenshotFormat {
    fn from(format: agentbrowser_protocol::ImageFormat) -> Self {
        use agentbrowser_protocol::ImageFormat;
        match format {
            ImageFormat::Png => Self::Png,
            ImageFormat::Jpeg => Self::Jpeg,
        }
    }
}

/// Capture rectangle in CSS pixels.
#[derive(Debug, Clone, Serialize)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
