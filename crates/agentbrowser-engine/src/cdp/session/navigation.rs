//! `Page` domain: navigation, history and frames.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::FrameTree;

use super::core::PageSession;

const READY_POLL: Duration = Duration::from_millis(100);

/// What `Page.navigate` reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStart {
    pub frame_id: String,
    /// Absent for same-document navigations (fragment changes).
    pub loader_id: Option<String>,
}

impl PageSession {
    /// Start a navigation without waiting for the new document.
    pub async fn navigate(&self, url: &str) -> Result<NavigationStart, CdpError> {
        let reply = self.call("Page.navigate", Some(json!({ "url": url }))).await?;
        if let Some(reason) = reply["errorText"].as_str() {
            return Err(CdpError::NavigationFailed(format!("{} at {}", reason, url)));
        }
        debug!("Navigating to {}", url);
        Ok(NavigationStart {
            frame_id: reply["frameId"].as_str().unwrap_or_default().to_string(),
            loader_id: reply["loaderId"].as_str().map(str::to_string),
        })
    }

    /// Resolve once `document.readyState` is one of `accepted`.
    pub async fn wait_for_ready_state(
        &self,
        accepted: &[&str],
        timeout: Duration,
    ) -> Result<(), CdpError> {
        let poll = async {
            loop {
                // Evaluation fails while the old context is torn down.
                let state = self.evaluate("document.readyState", None).await;
                if let Ok(Value::String(state)) = state {
                    if accepted.contains(&state.as_str()) {
                        return;
                    }
                }
                tokio::time::sleep(READY_POLL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| CdpError::Timeout("document.readyState".to_string()))
    }

    pub async fn reload(&self) -> Result<(), CdpError> {
        self.call("Page.reload", None).await.map(drop)
    }

    /// Move `offset` entries through session history. `Ok(false)` when no
    /// entry exists there.
    pub async fn navigate_history(&self, offset: i64) -> Result<bool, CdpError> {
        let history = self.call("Page.getNavigationHistory", None).await?;
        let index = history["currentIndex"].as_i64().unwrap_or(0) + offset;
        let entry_id = usize::try_from(index)
            .ok()
            .and_then(|i| history["entries"].get(i))
            .and_then(|entry| entry["id"].as_i64());

        match entry_id {
            Some(entry_id) => {
                self.call(
                    "Page.navigateToHistoryEntry",
                    Some(json!({ "entryId": entry_id })),
                )
                .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn get_url(&self) -> Result<String, CdpError> {
        self.eval_string("location.href").await
    }

    pub async fn get_title(&self) -> Result<String, CdpError> {
        self.eval_string("document.title").await
    }

    pub async fn frame_tree(&self) -> Result<FrameTree, CdpError> {
        let mut reply = self.call("Page.getFrameTree", None).await?;
        Ok(serde_json::from_value(reply["frameTree"].take())?)
    }

    async fn eval_string(&self, expression: &str) -> Result<String, CdpError> {
        let value = self.evaluate(expression, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
