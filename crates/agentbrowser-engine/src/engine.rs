//! The browser capability boundary.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use agentbrowser_snapshot::fusion::DomSources;
use agentbrowser_snapshot::RawAxNode;

use crate::error::EngineError;
use crate::locator::Locator;
use crate::types::{
    ClickOptions, ElementQuery, EngineEvent, Focus, FrameInfo, LaunchOptions, NavigateOutcome,
    PageInfo, ScreenshotOptions, WaitState, WaitUntil,
};

/// Everything the session layer needs from a browser.
///
/// Element operations take a [`Focus`] and a [`Locator`]. Actions
/// (`click`, `fill`, ...) wait up to `timeout` for the element to become
/// actionable and fail with [`EngineError::Timeout`] carrying the last
/// observed obstacle. A locator matching several elements without an `nth`
/// fails immediately with [`EngineError::StrictMode`].
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    // Lifecycle

    /// Start or connect to a browser. Calling it again while running is a
    /// no-op.
    async fn launch(&self, options: &LaunchOptions) -> Result<(), EngineError>;

    async fn close(&self) -> Result<(), EngineError>;

    fn is_running(&self) -> bool;

    // Pages, in creation order

    async fn pages(&self) -> Result<Vec<PageInfo>, EngineError>;

    async fn new_page(&self, url: Option<&str>) -> Result<PageInfo, EngineError>;

    async fn close_page(&self, page_id: &str) -> Result<(), EngineError>;

    async fn activate_page(&self, page_id: &str) -> Result<(), EngineError>;

    // Navigation

    async fn navigate(
        &self,
        page_id: &str,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<NavigateOutcome, EngineError>;

    async fn go_back(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError>;

    async fn go_forward(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError>;

    async fn reload(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError>;

    async fn wait_for_load(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError>;

    async fn url(&self, page_id: &str) -> Result<String, EngineError>;

    async fn title(&self, page_id: &str) -> Result<String, EngineError>;

    // Frames

    async fn frames(&self, page_id: &str) -> Result<Vec<FrameInfo>, EngineError>;

    /// The frame owned by the `<iframe>` element at `locator`.
    async fn frame_of_element(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<FrameInfo, EngineError>;

    // Element actions

    async fn click(
        &self,
        focus: &Focus,
        locator: &Locator,
        options: &ClickOptions,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    async fn hover(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    async fn focus_element(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Replace the element's value.
    async fn fill(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Type `text` key by key into the element, pausing `delay` between keys.
    async fn type_text(
        &self,
        focus: &Focus,
        locator: &Locator,
        text: &str,
        delay: Duration,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Press a key or chord (`Enter`, `Control+a`), on the element if given.
    async fn press(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        key: &str,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Returns the checked state after the operation.
    async fn set_checked(
        &self,
        focus: &Focus,
        locator: &Locator,
        checked: bool,
        timeout: Duration,
    ) -> Result<bool, EngineError>;

    /// Select the `<option>` whose value or label is `value`; returns the
    /// selected values.
    async fn select_option(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, EngineError>;

    /// Scroll the element (or the page) by the given delta in pixels.
    async fn scroll(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        delta_x: f64,
        delta_y: f64,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    async fn mouse_move(&self, page_id: &str, x: f64, y: f64) -> Result<(), EngineError>;

    async fn mouse_click(
        &self,
        page_id: &str,
        x: f64,
        y: f64,
        options: &ClickOptions,
    ) -> Result<(), EngineError>;

    // Queries

    async fn query(
        &self,
        focus: &Focus,
        locator: &Locator,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Value, EngineError>;

    async fn count(&self, focus: &Focus, locator: &Locator) -> Result<usize, EngineError>;

    async fn wait_for(
        &self,
        focus: &Focus,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Outer HTML of the focused document.
    async fn html(&self, focus: &Focus) -> Result<String, EngineError>;

    async fn evaluate(&self, focus: &Focus, script: &str) -> Result<Value, EngineError>;

    // Page model

    async fn accessibility_tree(&self, focus: &Focus) -> Result<Vec<RawAxNode>, EngineError>;

    /// Backend node ids of the matched element and all of its descendants.
    async fn backend_node_ids(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<Vec<i64>, EngineError>;

    async fn dom_sources(&self, focus: &Focus) -> Result<DomSources, EngineError>;

    // Capture, storage, emulation

    async fn screenshot(
        &self,
        focus: &Focus,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>, EngineError>;

    async fn pdf(&self, page_id: &str) -> Result<Vec<u8>, EngineError>;

    async fn cookies(&self, page_id: &str) -> Result<Vec<Value>, EngineError>;

    async fn clear_cookies(&self, page_id: &str) -> Result<(), EngineError>;

    async fn local_storage(&self, focus: &Focus) -> Result<BTreeMap<String, String>, EngineError>;

    async fn clear_local_storage(&self, focus: &Focus) -> Result<(), EngineError>;

    async fn set_viewport(&self, page_id: &str, width: u32, height: u32)
    -> Result<(), EngineError>;

    /// Take every console, error and request event seen since the last call.
    fn drain_events(&self) -> Vec<EngineEvent>;
}
