//! A flat DevTools session bound to one page target.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cdp::client::Transport;
use crate::cdp::error::CdpError;
use crate::cdp::protocol::{CdpMessage, Clip, ScreenshotFormat};

/// Domains every page needs before the engine can drive it.
const DOMAINS: [&str; 4] = ["Page.enable", "DOM.enable", "Runtime.enable", "Network.enable"];

pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    pub(super) transport: Arc<Transport>,
    /// Events for this target; the engine takes them once to run its
    /// listener.
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpMessage>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        transport: Arc<Transport>,
        events: mpsc::UnboundedReceiver<CdpMessage>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            transport,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The page's event stream. `None` once it has been taken.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpMessage>> {
        self.events.lock().take()
    }

    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport
            .call(method, params, Some(&self.session_id))
            .await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        for method in DOMAINS {
            self.call(method, None).await?;
        }
        self.call(
            "Page.setLifecycleEventsEnabled",
            Some(json!({ "enabled": true })),
        )
        .await?;
        debug!("Session {} ready", self.session_id);
        Ok(())
    }

    /// Base64 image of the viewport, the whole page, or `clip`.
    pub async fn screenshot(
        &self,
        format: ScreenshotFormat,
        quality: Option<u32>,
        full_page: bool,
        clip: Option<Clip>,
    ) -> Result<String, CdpError> {
        let mut params = json!({ "format": format, "captureBeyondViewport": full_page });
        if let Some(quality) = quality {
            params["quality"] = quality.into();
        }
        if let Some(clip) = clip {
            params["clip"] = serde_json::to_value(clip)?;
        }
        let reply = self.call("Page.captureScreenshot", Some(params)).await?;
        base64_data(reply)
    }

    /// Base64 PDF of the page, backgrounds included.
    pub async fn print_to_pdf(&self) -> Result<String, CdpError> {
        let reply = self
            .call("Page.printToPDF", Some(json!({ "printBackground": true })))
            .await?;
        base64_data(reply)
    }

    /// Scrollable size of the document in CSS pixels.
    pub async fn content_size(&self) -> Result<(f64, f64), CdpError> {
        let metrics = self.call("Page.getLayoutMetrics", None).await?;
        let size = &metrics["cssContentSize"];
        Ok((
            size["width"].as_f64().unwrap_or_default(),
            size["height"].as_f64().unwrap_or_default(),
        ))
    }

    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        let metrics = json!({
            "width": width,
            "height": height,
            "deviceScaleFactor": 1,
            "mobile": false,
        });
        self.call("Emulation.setDeviceMetricsOverride", Some(metrics))
            .await
            .map(drop)
    }

    pub async fn bring_to_front(&self) -> Result<(), CdpError> {
        self.call("Page.bringToFront", None).await.map(drop)
    }
}

fn base64_data(mut reply: Value) -> Result<String, CdpError> {
    match reply["data"].take() {
        Value::String(data) => Ok(data),
        _ => Err(CdpError::InvalidResponse("no data in capture reply".to_string())),
    }
}
