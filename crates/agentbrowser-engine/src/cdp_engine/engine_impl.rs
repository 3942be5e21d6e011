//! [`BrowserEngine`] implementation for [`CdpEngine`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, info};

use agentbrowser_snapshot::fusion::DomSources;
use agentbrowser_snapshot::{count_role, RawAxNode};

use crate::cdp::{CdpError, Clip, KeyDefinition, MouseButton as CdpMouseButton, PageSession};
use crate::engine::BrowserEngine;
use crate::error::EngineError;
use crate::locator::{Locator, LocatorKind};
use crate::types::{
    ClickOptions, ElementQuery, EngineEvent, Focus, FrameInfo, ImageFormat, LaunchOptions,
    NavigateOutcome, PageInfo, ScreenshotOptions, WaitState, WaitUntil,
};

use super::engine_core::CdpEngine;
use super::engine_elements::{helper_call, timeout_ms, Check};
use super::layout::{
    collect_backend_ids, flatten_frames, frame_document, layout_records, raw_ax_nodes, raw_dom,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long an element screenshot waits for its target to show up.
const ELEMENT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

fn lifecycle_event(wait_until: WaitUntil) -> Option<&'static str> {
    match wait_until {
        WaitUntil::Load => Some("load"),
        WaitUntil::DomContentLoaded => Some("DOMContentLoaded"),
        WaitUntil::NoWait => None,
    }
}

fn wait_state_name(state: WaitState) -> &'static str {
    match state {
        WaitState::Attached => "attached",
        WaitState::Detached => "detached",
        WaitState::Visible => "visible",
        WaitState::Hidden => "hidden",
    }
}

fn decode(data: &str, what: &str) -> Result<Vec<u8>, EngineError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| EngineError::Other(format!("Invalid {} data: {}", what, e)))
}

impl CdpEngine {
    async fn wait_lifecycle(
        &self,
        loader_id: &str,
        event: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        while !self.events.reached(loader_id, event) {
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout {
                    ms: timeout_ms(timeout),
                    waiting_for: format!("navigation to {} ({})", url, event),
                    reason: None,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn wait_loaded(&self, page: &PageSession, timeout: Duration) -> Result<(), EngineError> {
        page.wait_for_ready_state(&["complete"], timeout)
            .await
            .map_err(|e| match e {
                CdpError::Timeout(_) => EngineError::Timeout {
                    ms: timeout_ms(timeout),
                    waiting_for: "the page to load".to_string(),
                    reason: None,
                },
                other => other.into(),
            })
    }

    async fn history_step(
        &self,
        page_id: &str,
        offset: i64,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let page = self.page(page_id)?;
        if page.navigate_history(offset).await? {
            self.wait_loaded(&page, timeout).await?;
        } else {
            debug!("No history entry at offset {}", offset);
        }
        Ok(())
    }

    async fn read(
        &self,
        focus: &Focus,
        locator: &Locator,
        query: &str,
        arg: Value,
        timeout: Duration,
    ) -> Result<Value, EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Attached, timeout)
            .await?;
        self.call_helper(&ctx, &element.object_id, "read", vec![json!(query), arg])
            .await
    }
}

#[async_trait]
impl BrowserEngine for CdpEngine {
    async fn launch(&self, options: &LaunchOptions) -> Result<(), EngineError> {
        self.start(options).await
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.shutdown().await
    }

    fn is_running(&self) -> bool {
        self.browser().is_ok()
    }

    async fn pages(&self) -> Result<Vec<PageInfo>, EngineError> {
        let mut pages = Vec::new();
        for id in self.page_ids()? {
            let page = self.page(&id)?;
            pages.push(self.page_info(&page).await);
        }
        Ok(pages)
    }

    async fn new_page(&self, url: Option<&str>) -> Result<PageInfo, EngineError> {
        let browser = self.browser()?;
        let target_id = browser
            .client
            .create_target(url.unwrap_or("about:blank"))
            .await?;
        let page = self.attach(&browser, &target_id).await?;
        info!("Opened page {}", target_id);
        Ok(self.page_info(&page).await)
    }

    async fn close_page(&self, page_id: &str) -> Result<(), EngineError> {
        let browser = self.browser()?;
        let page = self.detach(page_id)?;
        browser
            .client
            .close_target(page.target_id(), page.session_id())
            .await?;
        info!("Closed page {}", page_id);
        Ok(())
    }

    async fn activate_page(&self, page_id: &str) -> Result<(), EngineError> {
        Ok(self.page(page_id)?.bring_to_front().await?)
    }

    async fn navigate(
        &self,
        page_id: &str,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<NavigateOutcome, EngineError> {
        let page = self.page(page_id)?;
        let start = page.navigate(url).await?;

        let status = match (start.loader_id.as_deref(), lifecycle_event(wait_until)) {
            (Some(loader), Some(event)) => {
                self.wait_lifecycle(loader, event, url, timeout).await?;
                self.events.status(loader)
            }
            (Some(loader), None) => self.events.status(loader),
            // Same-document navigation: nothing to wait for.
            (None, _) => None,
        };

        let final_url = page.get_url().await.unwrap_or_else(|_| url.to_string());
        Ok(NavigateOutcome {
            url: final_url,
            status,
        })
    }

    async fn go_back(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError> {
        self.history_step(page_id, -1, timeout).await
    }

    async fn go_forward(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError> {
        self.history_step(page_id, 1, timeout).await
    }

    async fn reload(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError> {
        let page = self.page(page_id)?;
        page.reload().await?;
        self.wait_loaded(&page, timeout).await
    }

    async fn wait_for_load(&self, page_id: &str, timeout: Duration) -> Result<(), EngineError> {
        let page = self.page(page_id)?;
        self.wait_loaded(&page, timeout).await
    }

    async fn url(&self, page_id: &str) -> Result<String, EngineError> {
        Ok(self.page(page_id)?.get_url().await?)
    }

    async fn title(&self, page_id: &str) -> Result<String, EngineError> {
        Ok(self.page(page_id)?.get_title().await?)
    }

    async fn frames(&self, page_id: &str) -> Result<Vec<FrameInfo>, EngineError> {
        let tree = self.page(page_id)?.frame_tree().await?;
        let mut frames = Vec::new();
        flatten_frames(&tree, &mut frames);
        Ok(frames)
    }

    async fn frame_of_element(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<FrameInfo, EngineError> {
        let ctx = self.context(focus).await?;
        let object_id = self.resolve(&ctx, locator).await?;
        let node = ctx.page.describe_node(&object_id, 0).await?;
        let frame_id = node
            .frame_id
            .ok_or_else(|| EngineError::FrameNotFound(format!("{} is not a frame", locator)))?;

        let frames = self.frames(&focus.page_id).await?;
        frames
            .into_iter()
            .find(|f| f.id == frame_id)
            .ok_or(EngineError::FrameNotFound(frame_id))
    }

    async fn click(
        &self,
        focus: &Focus,
        locator: &Locator,
        options: &ClickOptions,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Pointer { needs_enabled: true }, timeout)
            .await?;
        let (x, y) = element.point()?;
        ctx.page
            .click(x, y, options.button.into(), options.click_count)
            .await?;
        Ok(())
    }

    async fn hover(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Pointer { needs_enabled: false }, timeout)
            .await?;
        let (x, y) = element.point()?;
        Ok(ctx.page.mouse_move(x, y).await?)
    }

    async fn focus_element(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Attached, timeout)
            .await?;
        self.call_helper(&ctx, &element.object_id, "focus", Vec::new())
            .await?;
        Ok(())
    }

    async fn fill(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Editable, timeout)
            .await?;
        self.call_helper(&ctx, &element.object_id, "fill", vec![json!(value)])
            .await?;
        Ok(())
    }

    async fn type_text(
        &self,
        focus: &Focus,
        locator: &Locator,
        text: &str,
        delay: Duration,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Editable, timeout)
            .await?;
        self.call_helper(&ctx, &element.object_id, "focus", Vec::new())
            .await?;

        for c in text.chars() {
            let key = match c {
                '\n' | '\r' => KeyDefinition::lookup("Enter"),
                c => KeyDefinition::lookup(&c.to_string()),
            };
            match key {
                Some(key) => ctx.page.press_key(0, &key).await?,
                None => ctx.page.insert_text(&c.to_string()).await?,
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn press(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        key: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (modifiers, definition) = KeyDefinition::parse_combo(key)
            .ok_or_else(|| EngineError::Other(format!("Unknown key: {}", key)))?;

        let page = match locator {
            Some(locator) => {
                let (ctx, element) = self
                    .wait_element(focus, locator, Check::Attached, timeout)
                    .await?;
                self.call_helper(&ctx, &element.object_id, "focus", Vec::new())
                    .await?;
                ctx.page
            }
            None => self.page(&focus.page_id)?,
        };
        Ok(page.press_key(modifiers, &definition).await?)
    }

    async fn set_checked(
        &self,
        focus: &Focus,
        locator: &Locator,
        checked: bool,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Pointer { needs_enabled: true }, timeout)
            .await?;
        let current = self
            .call_helper(&ctx, &element.object_id, "checked", Vec::new())
            .await?;
        if current.as_bool() == Some(checked) {
            return Ok(checked);
        }

        let (x, y) = element.point()?;
        ctx.page.click(x, y, CdpMouseButton::Left, 1).await?;

        let after = self
            .call_helper(&ctx, &element.object_id, "checked", Vec::new())
            .await?;
        if after.as_bool() != Some(checked) {
            return Err(EngineError::NotActionable {
                selector: locator.to_string(),
                reason: "clicking did not change its checked state".to_string(),
            });
        }
        Ok(checked)
    }

    async fn select_option(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, EngineError> {
        let (ctx, element) = self
            .wait_element(focus, locator, Check::Visible, timeout)
            .await?;
        let selected = self
            .call_helper(&ctx, &element.object_id, "selectOption", vec![json!(value)])
            .await?;
        serde_json::from_value(selected).map_err(|e| EngineError::Other(e.to_string()))
    }

    async fn scroll(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        delta_x: f64,
        delta_y: f64,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        if let Some(locator) = locator {
            let (ctx, element) = self
                .wait_element(focus, locator, Check::Attached, timeout)
                .await?;
            self.call_helper(
                &ctx,
                &element.object_id,
                "scrollBy",
                vec![json!(delta_x), json!(delta_y)],
            )
            .await?;
            return Ok(());
        }

        let ctx = self.context(focus).await?;
        if ctx.frame_id.is_some() {
            ctx.page
                .evaluate(
                    &format!("window.scrollBy({}, {})", delta_x, delta_y),
                    ctx.context_id,
                )
                .await?;
            return Ok(());
        }

        let size = ctx
            .page
            .evaluate("({ w: window.innerWidth, h: window.innerHeight })", None)
            .await?;
        let x = size["w"].as_f64().unwrap_or(0.0) / 2.0;
        let y = size["h"].as_f64().unwrap_or(0.0) / 2.0;
        Ok(ctx.page.scroll(x, y, delta_x, delta_y).await?)
    }

    async fn mouse_move(&self, page_id: &str, x: f64, y: f64) -> Result<(), EngineError> {
        Ok(self.page(page_id)?.mouse_move(x, y).await?)
    }

    async fn mouse_click(
        &self,
        page_id: &str,
        x: f64,
        y: f64,
        options: &ClickOptions,
    ) -> Result<(), EngineError> {
        Ok(self
            .page(page_id)?
            .click(x, y, options.button.into(), options.click_count)
            .await?)
    }

    async fn query(
        &self,
        focus: &Focus,
        locator: &Locator,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Value, EngineError> {
        match query {
            ElementQuery::Visible => {
                let ctx = self.context(focus).await?;
                match self.resolve(&ctx, locator).await {
                    Ok(object_id) => {
                        self.call_helper(&ctx, &object_id, "read", vec![json!("visible")])
                            .await
                    }
                    Err(EngineError::ElementNotFound(_)) => Ok(json!(false)),
                    Err(e) => Err(e),
                }
            }
            ElementQuery::Text => self.read(focus, locator, "text", Value::Null, timeout).await,
            ElementQuery::OuterHtml => self.read(focus, locator, "html", Value::Null, timeout).await,
            ElementQuery::Value => self.read(focus, locator, "value", Value::Null, timeout).await,
            ElementQuery::Attribute(name) => {
                self.read(focus, locator, "attribute", json!(name), timeout)
                    .await
            }
            ElementQuery::BoundingBox => self.read(focus, locator, "box", Value::Null, timeout).await,
            ElementQuery::Enabled => {
                self.read(focus, locator, "enabled", Value::Null, timeout)
                    .await
            }
            ElementQuery::Checked => {
                self.read(focus, locator, "checked", Value::Null, timeout)
                    .await
            }
        }
    }

    async fn count(&self, focus: &Focus, locator: &Locator) -> Result<usize, EngineError> {
        let ctx = self.context(focus).await?;
        if let LocatorKind::Role { role, name } = &locator.kind {
            let roots = self.ax_roots(&ctx).await?;
            return Ok(count_role(&roots, role, name.as_deref()));
        }

        let (kind, value) = locator.script_args();
        let expression = format!(
            "{}.length",
            helper_call("queryAll", &[json!(kind), json!(value)])
        );
        let count = ctx
            .page
            .evaluate(&expression, ctx.context_id)
            .await
            .map_err(|e| match e {
                CdpError::JavaScript(msg) => {
                    EngineError::InvalidSelector(format!("{}: {}", locator, msg))
                }
                other => other.into(),
            })?;
        Ok(count
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0))
    }

    async fn wait_for(
        &self,
        focus: &Focus,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        let index = locator.nth.unwrap_or(0);

        loop {
            let ctx = self.context(focus).await?;
            match self.probe(&ctx, locator).await {
                Ok((count, visible)) => {
                    let done = match state {
                        WaitState::Attached => count > index,
                        WaitState::Detached => count <= index,
                        WaitState::Visible => visible,
                        WaitState::Hidden => !visible,
                    };
                    if done {
                        return Ok(());
                    }
                }
                // The document may be mid-navigation.
                Err(EngineError::Cdp(e)) => debug!("Probe failed: {}", e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(EngineError::Timeout {
                    ms: timeout_ms(timeout),
                    waiting_for: format!("{} to be {}", locator, wait_state_name(state)),
                    reason: None,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn html(&self, focus: &Focus) -> Result<String, EngineError> {
        let ctx = self.context(focus).await?;
        let html = ctx
            .page
            .evaluate(
                "document.documentElement ? document.documentElement.outerHTML : ''",
                ctx.context_id,
            )
            .await?;
        Ok(html.as_str().unwrap_or_default().to_string())
    }

    async fn evaluate(&self, focus: &Focus, script: &str) -> Result<Value, EngineError> {
        let ctx = self.context(focus).await?;
        Ok(ctx.page.evaluate(script, ctx.context_id).await?)
    }

    async fn accessibility_tree(&self, focus: &Focus) -> Result<Vec<RawAxNode>, EngineError> {
        let ctx = self.context(focus).await?;
        let nodes = ctx
            .page
            .get_accessibility_tree(ctx.frame_id.as_deref())
            .await?;
        Ok(raw_ax_nodes(nodes))
    }

    async fn backend_node_ids(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<Vec<i64>, EngineError> {
        let ctx = self.context(focus).await?;
        let object_id = self.resolve(&ctx, locator).await?;
        let node = ctx.page.describe_node(&object_id, -1).await?;
        let mut ids = Vec::new();
        collect_backend_ids(&node, &mut ids);
        Ok(ids)
    }

    async fn dom_sources(&self, focus: &Focus) -> Result<DomSources, EngineError> {
        let ctx = self.context(focus).await?;
        let document = ctx.page.get_document().await?;
        let root = match ctx.frame_id.as_deref() {
            Some(frame_id) => frame_document(&document, frame_id)
                .ok_or_else(|| EngineError::FrameNotFound(frame_id.to_string()))?,
            None => &document,
        };
        let layout = ctx.page.capture_layout().await?;
        let ax_nodes = ctx
            .page
            .get_accessibility_tree(ctx.frame_id.as_deref())
            .await?;

        Ok(DomSources {
            document: raw_dom(root),
            ax_nodes: raw_ax_nodes(ax_nodes),
            layout: layout_records(&layout),
        })
    }

    async fn screenshot(
        &self,
        focus: &Focus,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let quality = match options.format {
            ImageFormat::Jpeg => options.quality,
            ImageFormat::Png => None,
        };
        let format = options.format.into();

        let data = if let Some(locator) = &options.element {
            let (ctx, element) = self
                .wait_element(focus, locator, Check::Visible, ELEMENT_CAPTURE_TIMEOUT)
                .await?;
            let rect = self
                .call_helper(&ctx, &element.object_id, "read", vec![json!("box")])
                .await?;
            if rect.is_null() {
                return Err(EngineError::NotVisible(locator.to_string()));
            }
            let scroll = ctx
                .page
                .evaluate("({ x: window.scrollX, y: window.scrollY })", None)
                .await?;
            let clip = Clip {
                x: rect["x"].as_f64().unwrap_or(0.0) + scroll["x"].as_f64().unwrap_or(0.0),
                y: rect["y"].as_f64().unwrap_or(0.0) + scroll["y"].as_f64().unwrap_or(0.0),
                width: rect["width"].as_f64().unwrap_or(0.0),
                height: rect["height"].as_f64().unwrap_or(0.0),
                scale: 1.0,
            };
            ctx.page.screenshot(format, quality, false, Some(clip)).await?
        } else {
            let page = self.page(&focus.page_id)?;
            if options.full_page {
                let (width, height) = page.content_size().await?;
                let clip = Clip {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                    scale: 1.0,
                };
                page.screenshot(format, quality, true, Some(clip)).await?
            } else {
                page.screenshot(format, quality, false, None).await?
            }
        };

        decode(&data, "image")
    }

    async fn pdf(&self, page_id: &str) -> Result<Vec<u8>, EngineError> {
        let data = self.page(page_id)?.print_to_pdf().await?;
        decode(&data, "PDF")
    }

    async fn cookies(&self, page_id: &str) -> Result<Vec<Value>, EngineError> {
        let result = self.page(page_id)?.call("Network.getCookies", None).await?;
        Ok(result["cookies"].as_array().cloned().unwrap_or_default())
    }

    async fn clear_cookies(&self, page_id: &str) -> Result<(), EngineError> {
        self.page(page_id)?
            .call("Network.clearBrowserCookies", None)
            .await?;
        Ok(())
    }

    async fn local_storage(&self, focus: &Focus) -> Result<BTreeMap<String, String>, EngineError> {
        let entries = self
            .evaluate(
                focus,
                "Object.fromEntries(Object.keys(localStorage).map((k) => [k, localStorage.getItem(k)]))",
            )
            .await?;
        serde_json::from_value(entries).map_err(|e| EngineError::Other(e.to_string()))
    }

    async fn clear_local_storage(&self, focus: &Focus) -> Result<(), EngineError> {
        self.evaluate(focus, "localStorage.clear()").await?;
        Ok(())
    }

    async fn set_viewport(
        &self,
        page_id: &str,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        Ok(self.page(page_id)?.set_viewport(width, height).await?)
    }

    fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.drain()
    }
}
