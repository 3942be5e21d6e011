//! Page event pump: console output, page errors, requests, and the
//! lifecycle signals navigation waits on.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::cdp::{CdpMessage, ExceptionDetails};
use crate::types::EngineEvent;

/// Oldest events are dropped beyond this many undrained ones.
const MAX_PENDING_EVENTS: usize = 10_000;
const MAX_LIFECYCLE_MARKS: usize = 4_096;

/// State fed by every attached page's event stream.
#[derive(Default)]
pub(super) struct EventState {
    pending: Mutex<VecDeque<EngineEvent>>,
    /// `(loaderId, lifecycle event name)` pairs seen so far.
    lifecycle: Mutex<HashSet<(String, String)>>,
    /// Main-document HTTP status per loader.
    statuses: Mutex<HashMap<String, u16>>,
    /// Default execution context per frame, with the owning session.
    contexts: Mutex<HashMap<String, (String, i64)>>,
}

impl EventState {
    pub(super) fn apply(&self, session_id: &str, method: &str, params: &Value) {
        match method {
            "Runtime.consoleAPICalled" => {
                let text = params["args"]
                    .as_array()
                    .map(|args| args.iter().map(remote_text).collect::<Vec<_>>().join(" "))
                    .unwrap_or_default();
                self.push(EngineEvent::Console {
                    level: params["type"].as_str().unwrap_or("log").to_string(),
                    text,
                    timestamp: Utc::now(),
                });
            }
            "Runtime.exceptionThrown" => {
                let message =
                    serde_json::from_value::<ExceptionDetails>(params["exceptionDetails"].clone())
                        .map(|details| details.message())
                        .unwrap_or_else(|_| "Uncaught exception".to_string());
                self.push(EngineEvent::PageError {
                    message,
                    timestamp: Utc::now(),
                });
            }
            "Network.requestWillBeSent" => {
                let request = &params["request"];
                self.push(EngineEvent::Request {
                    method: request["method"].as_str().unwrap_or("GET").to_string(),
                    url: request["url"].as_str().unwrap_or_default().to_string(),
                    resource_type: params["type"].as_str().unwrap_or("Other").to_string(),
                    timestamp: Utc::now(),
                });
            }
            "Network.responseReceived" => {
                if params["type"].as_str() != Some("Document") {
                    return;
                }
                let status = params["response"]["status"]
                    .as_u64()
                    .and_then(|s| u16::try_from(s).ok());
                if let (Some(loader), Some(status)) = (params["loaderId"].as_str(), status) {
                    self.statuses.lock().insert(loader.to_string(), status);
                }
            }
            "Page.lifecycleEvent" => {
                if let (Some(loader), Some(name)) =
                    (params["loaderId"].as_str(), params["name"].as_str())
                {
                    let mut marks = self.lifecycle.lock();
                    if marks.len() >= MAX_LIFECYCLE_MARKS {
                        marks.clear();
                    }
                    marks.insert((loader.to_string(), name.to_string()));
                }
            }
            "Runtime.executionContextCreated" => {
                let context = &params["context"];
                let aux = &context["auxData"];
                if aux["isDefault"].as_bool() != Some(true) {
                    return;
                }
                if let (Some(frame), Some(id)) = (aux["frameId"].as_str(), context["id"].as_i64()) {
                    trace!("Context {} for frame {}", id, frame);
                    self.contexts
                        .lock()
                        .insert(frame.to_string(), (session_id.to_string(), id));
                }
            }
            "Runtime.executionContextDestroyed" => {
                if let Some(id) = params["executionContextId"].as_i64() {
                    self.contexts
                        .lock()
                        .retain(|_, (session, ctx)| !(session == session_id && *ctx == id));
                }
            }
            _ => {}
        }
    }

    fn push(&self, event: EngineEvent) {
        let mut pending = self.pending.lock();
        if pending.len() >= MAX_PENDING_EVENTS {
            pending.pop_front();
        }
        pending.push_back(event);
    }

    pub(super) fn drain(&self) -> Vec<EngineEvent> {
        self.pending.lock().drain(..).collect()
    }

    pub(super) fn reached(&self, loader_id: &str, name: &str) -> bool {
        self.lifecycle
            .lock()
            .contains(&(loader_id.to_string(), name.to_string()))
    }

    pub(super) fn status(&self, loader_id: &str) -> Option<u16> {
        self.statuses.lock().get(loader_id).copied()
    }

    pub(super) fn context_for(&self, frame_id: &str) -> Option<i64> {
        self.contexts.lock().get(frame_id).map(|(_, id)| *id)
    }

    pub(super) fn reset(&self) {
        self.pending.lock().clear();
        self.lifecycle.lock().clear();
        self.statuses.lock().clear();
        self.contexts.lock().clear();
    }
}

/// Console arguments as text: primitives by value, objects by description.
fn remote_text(arg: &Value) -> String {
    match arg.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(v) if !v.is_null() => v.to_string(),
        _ => arg
            .get("unserializableValue")
            .or_else(|| arg.get("description"))
            .and_then(Value::as_str)
            .or_else(|| arg["type"].as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

pub(super) async fn pump_events(
    session_id: String,
    mut events: mpsc::UnboundedReceiver<CdpMessage>,
    state: Arc<EventState>,
) {
    while let Some(event) = events.recv().await {
        if let (Some(method), Some(params)) = (event.method.as_deref(), event.params.as_ref()) {
            state.apply(&session_id, method, params);
        }
    }
    trace!("Event stream for session {} ended", session_id);
}
