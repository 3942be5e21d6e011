//! In-memory browser engine for testing the layers above the engine.
//!
//! A [`MockEngine`] holds one document per URL. Navigating a page to a URL
//! shows that document's elements; mutations (`fill`, `check`, ...) change
//! the document, so every page on the same URL sees them.
//!
//! Element checks mirror the CDP engine's failure shapes: ambiguous
//! locators fail with [`EngineError::StrictMode`] right away, and elements
//! that are hidden, disabled or covered fail with [`EngineError::Timeout`]
//! carrying the obstacle as the last state.

mod mock_engine;

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::error::EngineError;
use crate::types::{EngineEvent, FrameInfo, LaunchOptions};

pub const BLANK_URL: &str = "about:blank";

/// One element of a mock document.
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    /// CSS or XPath selector the element answers to, verbatim.
    pub selector: String,
    pub tag: String,
    pub role: String,
    pub name: String,
    pub text: String,
    pub value: String,
    pub checked: bool,
    pub visible: bool,
    pub enabled: bool,
    pub editable: bool,
    /// Description of an element covering this one.
    pub covered_by: Option<String>,
    pub attributes: BTreeMap<String, String>,
    /// Values a `<select>` accepts.
    pub options: Vec<String>,
    /// Child frame this element hosts.
    pub child_frame: Option<String>,
    /// Frame the element lives in; `None` is the main frame.
    pub frame: Option<String>,
    pub backend_node_id: i64,
}

impl MockElement {
    pub fn new(selector: &str, role: &str, name: &str) -> Self {
        let editable = matches!(role, "textbox" | "searchbox" | "combobox" | "spinbutton");
        Self {
            selector: selector.to_string(),
            tag: if editable { "input" } else { "div" }.to_string(),
            role: role.to_string(),
            name: name.to_string(),
            text: name.to_string(),
            value: String::new(),
            checked: false,
            visible: true,
            enabled: true,
            editable,
            covered_by: None,
            attributes: BTreeMap::new(),
            options: Vec::new(),
            child_frame: None,
            frame: None,
            backend_node_id: 0,
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn covered_by(mut self, by: &str) -> Self {
        self.covered_by = Some(by.to_string());
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn hosts_frame(mut self, frame_id: &str) -> Self {
        self.child_frame = Some(frame_id.to_string());
        self.tag = "iframe".to_string();
        self
    }

    pub fn in_frame(mut self, frame_id: &str) -> Self {
        self.frame = Some(frame_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
struct MockDocument {
    title: String,
    status: Option<u16>,
    elements: Vec<MockElement>,
    frames: Vec<FrameInfo>,
}

#[derive(Debug, Clone)]
struct MockPage {
    id: String,
    history: Vec<String>,
    index: usize,
    viewport: Option<(u32, u32)>,
}

impl MockPage {
    fn url(&self) -> &str {
        self.history.get(self.index).map(String::as_str).unwrap_or(BLANK_URL)
    }
}

#[derive(Default)]
struct MockState {
    running: bool,
    launches: usize,
    launch_options: Option<LaunchOptions>,
    documents: HashMap<String, MockDocument>,
    pages: Vec<MockPage>,
    next_page: u32,
    next_backend_node_id: i64,
    calls: Vec<String>,
    events: Vec<EngineEvent>,
    /// Operation name -> message of the next failure.
    failures: HashMap<String, String>,
    eval_results: HashMap<String, serde_json::Value>,
    cookies: Vec<serde_json::Value>,
    local_storage: BTreeMap<String, String>,
}

/// Scriptable [`BrowserEngine`](crate::BrowserEngine) without a browser.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define what a URL shows. Elements get fresh backend node ids.
    pub fn set_document(&self, url: &str, title: &str, elements: Vec<MockElement>) {
        let mut state = self.state.lock();
        let mut numbered = Vec::with_capacity(elements.len());
        for mut element in elements {
            state.next_backend_node_id += 1;
            // Ids below 10 belong to the document skeleton.
            element.backend_node_id = state.next_backend_node_id + 10;
            numbered.push(element);
        }
        let document = state.documents.entry(url.to_string()).or_default();
        document.title = title.to_string();
        document.elements = numbered;
    }

    /// HTTP status reported for navigations to `url`.
    pub fn set_status(&self, url: &str, status: u16) {
        let mut state = self.state.lock();
        state.documents.entry(url.to_string()).or_default().status = Some(status);
    }

    /// Declare a child frame of the document at `url`.
    pub fn add_frame(&self, url: &str, frame: FrameInfo) {
        let mut state = self.state.lock();
        state
            .documents
            .entry(url.to_string())
            .or_default()
            .frames
            .push(frame);
    }

    /// Make the next call of `operation` (a trait method name) fail with
    /// `message`.
    pub fn fail_next(&self, operation: &str, message: &str) {
        self.state
            .lock()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    pub fn set_eval_result(&self, script: &str, value: serde_json::Value) {
        self.state
            .lock()
            .eval_results
            .insert(script.to_string(), value);
    }

    pub fn push_event(&self, event: EngineEvent) {
        self.state.lock().events.push(event);
    }

    pub fn set_cookies(&self, cookies: Vec<serde_json::Value>) {
        self.state.lock().cookies = cookies;
    }

    pub fn set_local_storage(&self, key: &str, value: &str) {
        self.state
            .lock()
            .local_storage
            .insert(key.to_string(), value.to_string());
    }

    /// Operations performed so far, one line each (`click #go`).
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn launches(&self) -> usize {
        self.state.lock().launches
    }

    pub fn launch_options(&self) -> Option<LaunchOptions> {
        self.state.lock().launch_options.clone()
    }

    /// Current state of the element matching `selector` on `url`.
    pub fn element(&self, url: &str, selector: &str) -> Option<MockElement> {
        self.state
            .lock()
            .documents
            .get(url)?
            .elements
            .iter()
            .find(|e| e.selector == selector)
            .cloned()
    }

    pub fn viewport(&self, page_id: &str) -> Option<(u32, u32)> {
        self.state
            .lock()
            .pages
            .iter()
            .find(|p| p.id == page_id)
            .and_then(|p| p.viewport)
    }
}

impl MockState {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn take_failure(&mut self, operation: &str) -> Result<(), EngineError> {
        match self.failures.remove(operation) {
            Some(message) => Err(EngineError::Other(message)),
            None => Ok(()),
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.running {
            Ok(())
        } else {
            Err(EngineError::NotLaunched)
        }
    }

    fn open_page(&mut self, url: &str) -> String {
        self.next_page += 1;
        let id = format!("P{}", self.next_page);
        self.pages.push(MockPage {
            id: id.clone(),
            history: vec![url.to_string()],
            index: 0,
            viewport: self.launch_options.as_ref().and_then(|o| o.viewport),
        });
        id
    }

    fn page(&self, page_id: &str) -> Result<&MockPage, EngineError> {
        self.ensure_running()?;
        self.pages
            .iter()
            .find(|p| p.id == page_id)
            .ok_or_else(|| EngineError::PageNotFound(page_id.to_string()))
    }

    fn page_mut(&mut self, page_id: &str) -> Result<&mut MockPage, EngineError> {
        self.ensure_running()?;
        self.pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or_else(|| EngineError::PageNotFound(page_id.to_string()))
    }

    fn document(&self, page_id: &str) -> Result<MockDocument, EngineError> {
        let url = self.page(page_id)?.url().to_string();
        Ok(self.documents.get(&url).cloned().unwrap_or_default())
    }
}
