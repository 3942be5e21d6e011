//! Bounded console, error and request logs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentbrowser_engine::EngineEvent;

pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// FIFO buffer that drops its oldest entry when full.
#[derive(Debug, Clone)]
pub struct LogBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> LogBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    #[serde(rename = "type")]
    pub level: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageErrorEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntry {
    pub method: String,
    pub url: String,
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
}

/// The three logs a session keeps.
#[derive(Debug, Clone)]
pub struct SessionLogs {
    pub console: LogBuffer<ConsoleMessage>,
    pub errors: LogBuffer<PageErrorEntry>,
    pub requests: LogBuffer<RequestEntry>,
}

impl SessionLogs {
    pub fn new(capacity: usize) -> Self {
        Self {
            console: LogBuffer::new(capacity),
            errors: LogBuffer::new(capacity),
            requests: LogBuffer::new(capacity),
        }
    }

    pub fn record(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Console {
                level,
                text,
                timestamp,
            } => self.console.push(ConsoleMessage {
                level,
                text,
                timestamp,
            }),
            EngineEvent::PageError { message, timestamp } => {
                self.errors.push(PageErrorEntry { message, timestamp })
            }
            EngineEvent::Request {
                method,
                url,
                resource_type,
                timestamp,
            } => self.requests.push(RequestEntry {
                method,
                url,
                resource_type,
                timestamp,
            }),
        }
    }
}

impl Default for SessionLogs {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_drops_oldest() {
        let mut buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(i);
        }
        assert_eq!(buffer.snapshot(), vec![2, 3, 4]);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut buffer = LogBuffer::new(0);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.snapshot(), vec!["b"]);
    }

    #[test]
    fn test_events_are_routed() {
        let mut logs = SessionLogs::new(10);
        let now = Utc::now();
        logs.record(EngineEvent::Console {
            level: "log".into(),
            text: "ready".into(),
            timestamp: now,
        });
        logs.record(EngineEvent::PageError {
            message: "boom".into(),
            timestamp: now,
        });
        logs.record(EngineEvent::Request {
            method: "GET".into(),
            url: "https://a.test/app.js".into(),
            resource_type: "Script".into(),
            timestamp: now,
        });

        assert_eq!(logs.console.len(), 1);
        assert_eq!(logs.errors.snapshot()[0].message, "boom");

        let value = serde_json::to_value(&logs.console.snapshot()[0]).unwrap();
        assert_eq!(value["type"], "log");
        let value = serde_json::to_value(&logs.requests.snapshot()[0]).unwrap();
        assert_eq!(value["resourceType"], "Script");
    }
}
