//! [`BrowserEngine`] implementation for [`MockEngine`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use agentbrowser_snapshot::fusion::{
    BoundingBox, DomSources, LayoutRecord, RawDomNode, DOCUMENT_NODE, ELEMENT_NODE, TEXT_NODE,
};
use agentbrowser_snapshot::RawAxNode;

use crate::engine::BrowserEngine;
use crate::error::EngineError;
use crate::locator::{Locator, LocatorKind};
use crate::types::{
    ClickOptions, ElementQuery, EngineEvent, Focus, FrameInfo, LaunchOptions, NavigateOutcome,
    PageInfo, ScreenshotOptions, WaitState, WaitUntil,
};

use super::{MockDocument, MockElement, MockEngine, MockState, BLANK_URL};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const PDF_HEADER: &[u8] = b"%PDF-1.4\n";

#[derive(Debug, Clone, Copy)]
enum Need {
    Attached,
    Visible,
    Pointer,
    Hover,
    Editable,
}

impl Need {
    fn describe(self) -> &'static str {
        match self {
            Need::Attached => "attached",
            Need::Visible => "visible",
            Need::Pointer | Need::Hover => "actionable",
            Need::Editable => "editable",
        }
    }
}

fn matches(element: &MockElement, locator: &Locator) -> bool {
    match &locator.kind {
        LocatorKind::Css(selector) | LocatorKind::XPath(selector) => element.selector == *selector,
        LocatorKind::Text(text) => element
            .text
            .to_lowercase()
            .contains(&text.trim().to_lowercase()),
        LocatorKind::Role { role, name } => {
            element.role == *role && name.as_ref().is_none_or(|n| element.name == *n)
        }
    }
}

fn check(element: &MockElement, need: Need, selector: String) -> Result<(), EngineError> {
    if matches!(need, Need::Attached) {
        return Ok(());
    }
    if !element.visible {
        return Err(EngineError::NotVisible(selector));
    }
    match need {
        Need::Pointer | Need::Hover => {
            if let Some(by) = &element.covered_by {
                return Err(EngineError::Intercepted {
                    selector,
                    by: by.clone(),
                });
            }
            if matches!(need, Need::Pointer) && !element.enabled {
                return Err(EngineError::NotActionable {
                    selector,
                    reason: "element is disabled".to_string(),
                });
            }
        }
        Need::Editable => {
            if !element.editable {
                return Err(EngineError::NotActionable {
                    selector,
                    reason: "element is not editable".to_string(),
                });
            }
            if !element.enabled {
                return Err(EngineError::NotActionable {
                    selector,
                    reason: "element is disabled".to_string(),
                });
            }
        }
        Need::Attached | Need::Visible => {}
    }
    Ok(())
}

fn render(element: &MockElement) -> String {
    let attributes: String = element
        .attributes
        .iter()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect();
    format!(
        "<{tag}{attributes}>{text}</{tag}>",
        tag = element.tag,
        attributes = attributes,
        text = element.text
    )
}

fn ax_nodes(document: &MockDocument, elements: &[&MockElement]) -> Vec<RawAxNode> {
    let mut nodes = vec![RawAxNode {
        node_id: "ax-root".to_string(),
        role: "RootWebArea".to_string(),
        name: document.title.clone(),
        child_ids: elements
            .iter()
            .map(|e| format!("ax-{}", e.backend_node_id))
            .collect(),
        backend_node_id: Some(1),
        ..RawAxNode::default()
    }];

    for element in elements {
        let mut properties = BTreeMap::new();
        if matches!(element.role.as_str(), "checkbox" | "radio" | "switch") {
            properties.insert("checked".to_string(), json!(element.checked));
        }
        if !element.enabled {
            properties.insert("disabled".to_string(), json!(true));
        }
        if !element.visible {
            properties.insert("hidden".to_string(), json!(true));
        }
        nodes.push(RawAxNode {
            node_id: format!("ax-{}", element.backend_node_id),
            parent_id: Some("ax-root".to_string()),
            role: element.role.clone(),
            name: element.name.clone(),
            value: (!element.value.is_empty()).then(|| element.value.clone()),
            properties,
            backend_node_id: Some(element.backend_node_id),
            ..RawAxNode::default()
        });
    }
    nodes
}

fn dom_tree(elements: &[&MockElement]) -> RawDomNode {
    let body_children = elements
        .iter()
        .map(|e| RawDomNode {
            backend_node_id: e.backend_node_id,
            node_type: ELEMENT_NODE,
            node_name: e.tag.to_uppercase(),
            attributes: e
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            children: if e.text.is_empty() {
                Vec::new()
            } else {
                vec![RawDomNode {
                    backend_node_id: e.backend_node_id + 100_000,
                    node_type: TEXT_NODE,
                    node_name: "#text".to_string(),
                    node_value: e.text.clone(),
                    ..RawDomNode::default()
                }]
            },
            ..RawDomNode::default()
        })
        .collect();

    let body = RawDomNode {
        backend_node_id: 3,
        node_type: ELEMENT_NODE,
        node_name: "BODY".to_string(),
        children: body_children,
        ..RawDomNode::default()
    };
    let html = RawDomNode {
        backend_node_id: 2,
        node_type: ELEMENT_NODE,
        node_name: "HTML".to_string(),
        children: vec![body],
        ..RawDomNode::default()
    };
    RawDomNode {
        backend_node_id: 1,
        node_type: DOCUMENT_NODE,
        node_name: "#document".to_string(),
        children: vec![html],
        ..RawDomNode::default()
    }
}

fn layout(elements: &[&MockElement]) -> Vec<LayoutRecord> {
    elements
        .iter()
        .enumerate()
        .map(|(i, e)| {
            if e.visible {
                LayoutRecord {
                    backend_node_id: e.backend_node_id,
                    bounds: Some(BoundingBox {
                        x: 0.0,
                        y: i as f64 * 20.0,
                        width: 100.0,
                        height: 20.0,
                    }),
                    display: Some("block".to_string()),
                    visibility: Some("visible".to_string()),
                    paint_order: i64::try_from(i).ok(),
                }
            } else {
                LayoutRecord {
                    backend_node_id: e.backend_node_id,
                    display: Some("none".to_string()),
                    ..LayoutRecord::default()
                }
            }
        })
        .collect()
}

impl MockState {
    fn begin(&mut self, operation: &str, detail: String) -> Result<(), EngineError> {
        self.record(if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{} {}", operation, detail)
        });
        self.take_failure(operation)
    }

    fn focused_url(&self, focus: &Focus) -> Result<String, EngineError> {
        let url = self.page(&focus.page_id)?.url().to_string();
        if let Some(frame_id) = &focus.frame_id {
            let known = self
                .documents
                .get(&url)
                .is_some_and(|d| d.frames.iter().any(|f| &f.id == frame_id));
            if !known {
                return Err(EngineError::FrameNotFound(frame_id.clone()));
            }
        }
        Ok(url)
    }

    fn focused_elements(&self, focus: &Focus) -> Result<(MockDocument, Vec<MockElement>), EngineError> {
        let url = self.focused_url(focus)?;
        let document = self.documents.get(&url).cloned().unwrap_or_default();
        let elements = document
            .elements
            .iter()
            .filter(|e| e.frame == focus.frame_id)
            .cloned()
            .collect();
        Ok((document, elements))
    }

    /// URL and index of the single element `locator` designates.
    fn resolve(&self, focus: &Focus, locator: &Locator) -> Result<(String, usize), EngineError> {
        let url = self.focused_url(focus)?;
        let hits: Vec<usize> = self
            .documents
            .get(&url)
            .map(|d| {
                d.elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.frame == focus.frame_id && matches(e, locator))
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default();

        let index = match locator.nth {
            Some(n) => hits.get(n).copied(),
            None if hits.len() > 1 => {
                return Err(EngineError::StrictMode {
                    selector: locator.to_string(),
                    count: hits.len(),
                });
            }
            None => hits.first().copied(),
        };
        index
            .map(|i| (url, i))
            .ok_or_else(|| EngineError::ElementNotFound(locator.to_string()))
    }

    /// Resolve and check, failing the way an expired actionability wait does.
    fn acquire(
        &mut self,
        focus: &Focus,
        locator: &Locator,
        need: Need,
        timeout: Duration,
    ) -> Result<&mut MockElement, EngineError> {
        let timed_out = |e: EngineError| EngineError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waiting_for: format!("{} to be {}", locator, need.describe()),
            reason: Some(e.to_string()),
        };

        let (url, index) = match self.resolve(focus, locator) {
            Ok(found) => found,
            Err(e) if e.is_retryable() => return Err(timed_out(e)),
            Err(e) => return Err(e),
        };
        let element = self
            .documents
            .get_mut(&url)
            .and_then(|d| d.elements.get_mut(index))
            .ok_or_else(|| EngineError::Detached(locator.to_string()))?;
        check(element, need, locator.to_string()).map_err(timed_out)?;
        Ok(element)
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn launch(&self, options: &LaunchOptions) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("launch", String::new())?;
        if state.running {
            return Ok(());
        }
        state.running = true;
        state.launches += 1;
        state.launch_options = Some(options.clone());
        state.open_page(BLANK_URL);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("close", String::new())?;
        state.running = false;
        state.pages.clear();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    async fn pages(&self) -> Result<Vec<PageInfo>, EngineError> {
        let state = self.state.lock();
        state.ensure_running()?;
        Ok(state
            .pages
            .iter()
            .map(|p| PageInfo {
                id: p.id.clone(),
                url: p.url().to_string(),
                title: state
                    .documents
                    .get(p.url())
                    .map(|d| d.title.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn new_page(&self, url: Option<&str>) -> Result<PageInfo, EngineError> {
        let mut state = self.state.lock();
        state.ensure_running()?;
        let url = url.unwrap_or(BLANK_URL);
        state.begin("new_page", url.to_string())?;
        let id = state.open_page(url);
        let title = state.document(&id)?.title;
        Ok(PageInfo {
            id,
            url: url.to_string(),
            title,
        })
    }

    async fn close_page(&self, page_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("close_page", page_id.to_string())?;
        state.page(page_id)?;
        state.pages.retain(|p| p.id != page_id);
        Ok(())
    }

    async fn activate_page(&self, page_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("activate_page", page_id.to_string())?;
        state.page(page_id).map(|_| ())
    }

    async fn navigate(
        &self,
        page_id: &str,
        url: &str,
        _wait_until: WaitUntil,
        _timeout: Duration,
    ) -> Result<NavigateOutcome, EngineError> {
        let mut state = self.state.lock();
        state.begin("navigate", url.to_string())?;
        let page = state.page_mut(page_id)?;
        page.history.truncate(page.index + 1);
        page.history.push(url.to_string());
        page.index = page.history.len() - 1;

        let status = state
            .documents
            .get(url)
            .map(|d| d.status.unwrap_or(200))
            .unwrap_or(200);
        Ok(NavigateOutcome {
            url: url.to_string(),
            status: Some(status),
        })
    }

    async fn go_back(&self, page_id: &str, _timeout: Duration) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("go_back", String::new())?;
        let page = state.page_mut(page_id)?;
        page.index = page.index.saturating_sub(1);
        Ok(())
    }

    async fn go_forward(&self, page_id: &str, _timeout: Duration) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("go_forward", String::new())?;
        let page = state.page_mut(page_id)?;
        if page.index + 1 < page.history.len() {
            page.index += 1;
        }
        Ok(())
    }

    async fn reload(&self, page_id: &str, _timeout: Duration) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("reload", String::new())?;
        state.page(page_id).map(|_| ())
    }

    async fn wait_for_load(&self, page_id: &str, _timeout: Duration) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("wait_for_load", String::new())?;
        state.page(page_id).map(|_| ())
    }

    async fn url(&self, page_id: &str) -> Result<String, EngineError> {
        let state = self.state.lock();
        Ok(state.page(page_id)?.url().to_string())
    }

    async fn title(&self, page_id: &str) -> Result<String, EngineError> {
        let state = self.state.lock();
        Ok(state.document(page_id)?.title)
    }

    async fn frames(&self, page_id: &str) -> Result<Vec<FrameInfo>, EngineError> {
        let state = self.state.lock();
        let page = state.page(page_id)?;
        let mut frames = vec![FrameInfo {
            id: page.id.clone(),
            name: String::new(),
            url: page.url().to_string(),
            parent_id: None,
        }];
        frames.extend(state.document(page_id)?.frames);
        Ok(frames)
    }

    async fn frame_of_element(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<FrameInfo, EngineError> {
        let state = self.state.lock();
        let (url, index) = state.resolve(focus, locator)?;
        let document = state.documents.get(&url).cloned().unwrap_or_default();
        let frame_id = document.elements[index]
            .child_frame
            .clone()
            .ok_or_else(|| EngineError::FrameNotFound(format!("{} is not a frame", locator)))?;
        document
            .frames
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
        let mut state = self.state.lock();
        let detail = if options.click_count > 1 {
            format!("{} x{}", locator, options.click_count)
        } else {
            locator.to_string()
        };
        state.begin("click", detail)?;
        let element = state.acquire(focus, locator, Need::Pointer, timeout)?;
        if matches!(element.role.as_str(), "checkbox" | "switch") {
            element.checked = !element.checked;
        } else if element.role == "radio" {
            element.checked = true;
        }
        Ok(())
    }

    async fn hover(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("hover", locator.to_string())?;
        state.acquire(focus, locator, Need::Hover, timeout).map(|_| ())
    }

    async fn focus_element(
        &self,
        focus: &Focus,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("focus", locator.to_string())?;
        state.acquire(focus, locator, Need::Attached, timeout).map(|_| ())
    }

    async fn fill(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("fill", format!("{}={}", locator, value))?;
        let element = state.acquire(focus, locator, Need::Editable, timeout)?;
        element.value = value.to_string();
        Ok(())
    }

    async fn type_text(
        &self,
        focus: &Focus,
        locator: &Locator,
        text: &str,
        _delay: Duration,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("type", format!("{}={}", locator, text))?;
        let element = state.acquire(focus, locator, Need::Editable, timeout)?;
        element.value.push_str(text);
        Ok(())
    }

    async fn press(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        key: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("press", key.to_string())?;
        match locator {
            Some(locator) => state
                .acquire(focus, locator, Need::Attached, timeout)
                .map(|_| ()),
            None => state.page(&focus.page_id).map(|_| ()),
        }
    }

    async fn set_checked(
        &self,
        focus: &Focus,
        locator: &Locator,
        checked: bool,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock();
        let operation = if checked { "check" } else { "uncheck" };
        state.begin(operation, locator.to_string())?;
        let element = state.acquire(focus, locator, Need::Pointer, timeout)?;
        if element.role == "radio" && element.checked && !checked {
            return Err(EngineError::NotActionable {
                selector: locator.to_string(),
                reason: "clicking did not change its checked state".to_string(),
            });
        }
        element.checked = checked;
        Ok(checked)
    }

    async fn select_option(
        &self,
        focus: &Focus,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, EngineError> {
        let mut state = self.state.lock();
        state.begin("select", format!("{}={}", locator, value))?;
        let element = state.acquire(focus, locator, Need::Visible, timeout)?;
        if !element.options.iter().any(|o| o == value) {
            return Err(EngineError::Script(format!(
                "Error: No option with value or label \"{}\"",
                value
            )));
        }
        element.value = value.to_string();
        Ok(vec![value.to_string()])
    }

    async fn scroll(
        &self,
        focus: &Focus,
        locator: Option<&Locator>,
        delta_x: f64,
        delta_y: f64,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let target = locator.map(|l| l.to_string()).unwrap_or_else(|| "page".to_string());
        state.begin("scroll", format!("{} {},{}", target, delta_x, delta_y))?;
        match locator {
            Some(locator) => state
                .acquire(focus, locator, Need::Attached, timeout)
                .map(|_| ()),
            None => state.page(&focus.page_id).map(|_| ()),
        }
    }

    async fn mouse_move(&self, page_id: &str, x: f64, y: f64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("mouse_move", format!("{},{}", x, y))?;
        state.page(page_id).map(|_| ())
    }

    async fn mouse_click(
        &self,
        page_id: &str,
        x: f64,
        y: f64,
        options: &ClickOptions,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin(
            "mouse_click",
            format!("{},{} {:?} x{}", x, y, options.button, options.click_count),
        )?;
        state.page(page_id).map(|_| ())
    }

    async fn query(
        &self,
        focus: &Focus,
        locator: &Locator,
        query: &ElementQuery,
        timeout: Duration,
    ) -> Result<Value, EngineError> {
        let mut state = self.state.lock();
        state.take_failure("query")?;
        if *query == ElementQuery::Visible {
            return match state.resolve(focus, locator) {
                Ok((url, index)) => Ok(json!(state.documents[&url].elements[index].visible)),
                Err(EngineError::ElementNotFound(_)) => Ok(json!(false)),
                Err(e) => Err(e),
            };
        }

        let element = state.acquire(focus, locator, Need::Attached, timeout)?;
        Ok(match query {
            ElementQuery::Text => json!(element.text),
            ElementQuery::OuterHtml => json!(render(element)),
            ElementQuery::Value => json!(element.value),
            ElementQuery::Attribute(name) => json!(element.attributes.get(name)),
            ElementQuery::BoundingBox if element.visible => {
                json!({"x": 0.0, "y": 0.0, "width": 100.0, "height": 20.0})
            }
            ElementQuery::BoundingBox => Value::Null,
            ElementQuery::Enabled => json!(element.enabled),
            ElementQuery::Checked => json!(element.checked),
            ElementQuery::Visible => json!(element.visible),
        })
    }

    async fn count(&self, focus: &Focus, locator: &Locator) -> Result<usize, EngineError> {
        let state = self.state.lock();
        let (_, elements) = state.focused_elements(focus)?;
        Ok(elements.iter().filter(|e| matches(e, locator)).count())
    }

    async fn wait_for(
        &self,
        focus: &Focus,
        locator: &Locator,
        wait_state: WaitState,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("wait_for", locator.to_string())?;
        let (_, elements) = state.focused_elements(focus)?;
        let hits: Vec<&MockElement> = elements.iter().filter(|e| matches(e, locator)).collect();
        let target = hits.get(locator.nth.unwrap_or(0));
        let done = match wait_state {
            WaitState::Attached => target.is_some(),
            WaitState::Detached => target.is_none(),
            WaitState::Visible => target.is_some_and(|e| e.visible),
            WaitState::Hidden => !target.is_some_and(|e| e.visible),
        };
        if done {
            return Ok(());
        }
        let name = serde_json::to_value(wait_state)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Err(EngineError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waiting_for: format!("{} to be {}", locator, name),
            reason: None,
        })
    }

    async fn html(&self, focus: &Focus) -> Result<String, EngineError> {
        let state = self.state.lock();
        let (document, elements) = state.focused_elements(focus)?;
        let body: String = elements.iter().map(render).collect();
        Ok(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            document.title, body
        ))
    }

    async fn evaluate(&self, focus: &Focus, script: &str) -> Result<Value, EngineError> {
        let mut state = self.state.lock();
        state.begin("evaluate", script.to_string())?;
        state.focused_url(focus)?;
        Ok(state.eval_results.get(script).cloned().unwrap_or(Value::Null))
    }

    async fn accessibility_tree(&self, focus: &Focus) -> Result<Vec<RawAxNode>, EngineError> {
        let mut state = self.state.lock();
        state.take_failure("accessibility_tree")?;
        let (document, elements) = state.focused_elements(focus)?;
        let refs: Vec<&MockElement> = elements.iter().collect();
        Ok(ax_nodes(&document, &refs))
    }

    async fn backend_node_ids(
        &self,
        focus: &Focus,
        locator: &Locator,
    ) -> Result<Vec<i64>, EngineError> {
        let state = self.state.lock();
        let (url, index) = state.resolve(focus, locator)?;
        Ok(vec![state.documents[&url].elements[index].backend_node_id])
    }

    async fn dom_sources(&self, focus: &Focus) -> Result<DomSources, EngineError> {
        let mut state = self.state.lock();
        state.take_failure("dom_sources")?;
        let (document, elements) = state.focused_elements(focus)?;
        let refs: Vec<&MockElement> = elements.iter().collect();
        Ok(DomSources {
            document: dom_tree(&refs),
            ax_nodes: ax_nodes(&document, &refs),
            layout: layout(&refs),
        })
    }

    async fn screenshot(
        &self,
        focus: &Focus,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let mut state = self.state.lock();
        let target = options
            .element
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| if options.full_page { "full" } else { "viewport" }.to_string());
        state.begin("screenshot", target)?;
        if let Some(locator) = &options.element {
            state.acquire(focus, locator, Need::Visible, Duration::from_secs(5))?;
        } else {
            state.page(&focus.page_id)?;
        }
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn pdf(&self, page_id: &str) -> Result<Vec<u8>, EngineError> {
        let mut state = self.state.lock();
        state.begin("pdf", String::new())?;
        state.page(page_id)?;
        Ok(PDF_HEADER.to_vec())
    }

    async fn cookies(&self, page_id: &str) -> Result<Vec<Value>, EngineError> {
        let state = self.state.lock();
        state.page(page_id)?;
        Ok(state.cookies.clone())
    }

    async fn clear_cookies(&self, page_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("clear_cookies", String::new())?;
        state.page(page_id)?;
        state.cookies.clear();
        Ok(())
    }

    async fn local_storage(&self, focus: &Focus) -> Result<BTreeMap<String, String>, EngineError> {
        let state = self.state.lock();
        state.focused_url(focus)?;
        Ok(state.local_storage.clone())
    }

    async fn clear_local_storage(&self, focus: &Focus) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("clear_local_storage", String::new())?;
        state.focused_url(focus)?;
        state.local_storage.clear();
        Ok(())
    }

    async fn set_viewport(
        &self,
        page_id: &str,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.begin("set_viewport", format!("{}x{}", width, height))?;
        state.page_mut(page_id)?.viewport = Some((width, height));
        Ok(())
    }

    fn drain_events(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.state.lock().events)
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
