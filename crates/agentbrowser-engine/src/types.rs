//! Value types exchanged with a [`BrowserEngine`](crate::BrowserEngine).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use agentbrowser_protocol::{ImageFormat, MouseButton, WaitState, WaitUntil};

use crate::locator::Locator;

/// Options for starting or connecting to a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable_path: Option<PathBuf>,
    /// Connect to a running browser instead of launching one.
    pub cdp_url: Option<String>,
    pub viewport: Option<(u32, u32)>,
    pub profile_dir: Option<PathBuf>,
    pub args: Vec<String>,
    /// Unpacked extension directories to load.
    pub extensions: Vec<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable_path: None,
            cdp_url: None,
            viewport: Some((1280, 720)),
            profile_dir: None,
            args: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

/// Where element operations run: a page, and optionally a child frame of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Focus {
    pub page_id: String,
    pub frame_id: Option<String>,
}

impl Focus {
    pub fn page(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            frame_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateOutcome {
    pub url: String,
    /// HTTP status of the main document, when the navigation produced one.
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    pub button: MouseButton,
    pub click_count: u32,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            click_count: 1,
        }
    }
}

/// Single-element reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementQuery {
    Text,
    OuterHtml,
    Value,
    Attribute(String),
    BoundingBox,
    Visible,
    Enabled,
    Checked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotOptions {
    pub format: ImageFormat,
    pub quality: Option<u32>,
    pub full_page: bool,
    /// Capture only this element's box.
    pub element: Option<Locator>,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: None,
            full_page: false,
            element: None,
        }
    }
}

/// Something the page reported asynchronously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineEvent {
    Console {
        level: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    PageError {
        message: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Request {
        method: String,
        url: String,
        resource_type: String,
        timestamp: DateTime<Utc>,
    },
}
