//! Per-daemon session state.
//!
//! One [`SessionStore`] is shared by every connection of a daemon. Its lock
//! is only taken for short reads and writes; callers copy what they need out
//! before awaiting the engine.

use parking_lot::Mutex;

use agentbrowser_engine::{EngineEvent, Focus};
use agentbrowser_snapshot::{RefEntry, RefMap};

use crate::logs::{ConsoleMessage, PageErrorEntry, RequestEntry, SessionLogs};

#[derive(Debug)]
struct SessionState {
    launched: bool,
    refs: RefMap,
    page_id: Option<String>,
    frame_id: Option<String>,
    logs: SessionLogs,
}

/// Ref table, page/frame focus and logs of one session.
#[derive(Debug)]
pub struct SessionStore {
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            state: Mutex::new(SessionState {
                launched: false,
                refs: RefMap::new(),
                page_id: None,
                frame_id: None,
                logs: SessionLogs::new(log_capacity),
            }),
        }
    }

    pub fn is_launched(&self) -> bool {
        self.state.lock().launched
    }

    /// Record a successful launch with `page_id` as the active page.
    pub fn mark_launched(&self, page_id: Option<String>) {
        let mut state = self.state.lock();
        state.launched = true;
        if state.page_id.is_none() {
            state.page_id = page_id;
        }
    }

    /// Forget everything tied to the browser. Logs survive until cleared.
    pub fn mark_closed(&self) {
        let mut state = self.state.lock();
        state.launched = false;
        state.refs = RefMap::new();
        state.page_id = None;
        state.frame_id = None;
    }

    /// Install the refs of a new snapshot, dropping all previous ones.
    pub fn replace_refs(&self, refs: RefMap) {
        self.state.lock().refs = refs;
    }

    pub fn ref_entry(&self, reference: &str) -> Option<RefEntry> {
        self.state.lock().refs.get(reference).cloned()
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().refs.len()
    }

    pub fn active_page(&self) -> Option<String> {
        self.state.lock().page_id.clone()
    }

    /// Make `page_id` active. Frame focus resets to the main frame.
    pub fn set_active_page(&self, page_id: Option<String>) {
        let mut state = self.state.lock();
        state.page_id = page_id;
        state.frame_id = None;
    }

    pub fn active_frame(&self) -> Option<String> {
        self.state.lock().frame_id.clone()
    }

    pub fn set_frame(&self, frame_id: Option<String>) {
        self.state.lock().frame_id = frame_id;
    }

    pub fn focus(&self) -> Option<Focus> {
        let state = self.state.lock();
        state.page_id.as_ref().map(|page_id| Focus {
            page_id: page_id.clone(),
            frame_id: state.frame_id.clone(),
        })
    }

    pub fn record_events(&self, events: Vec<EngineEvent>) {
        if events.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for event in events {
            state.logs.record(event);
        }
    }

    pub fn console(&self, clear: bool) -> Vec<ConsoleMessage> {
        let mut state = self.state.lock();
        let messages = state.logs.console.snapshot();
        if clear {
            state.logs.console.clear();
        }
        messages
    }

    pub fn errors(&self, clear: bool) -> Vec<PageErrorEntry> {
        let mut state = self.state.lock();
        let errors = state.logs.errors.snapshot();
        if clear {
            state.logs.errors.clear();
        }
        errors
    }

    /// Requests whose URL contains `filter`. Clearing drops the whole log.
    pub fn requests(&self, filter: Option<&str>, clear: bool) -> Vec<RequestEntry> {
        let mut state = self.state.lock();
        let requests = state
            .logs
            .requests
            .snapshot()
            .into_iter()
            .filter(|r| filter.is_none_or(|f| r.url.contains(f)))
            .collect();
        if clear {
            state.logs.requests.clear();
        }
        requests
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(crate::logs::DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
