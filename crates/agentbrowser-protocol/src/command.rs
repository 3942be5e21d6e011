//! Command shapes.

use serde::{Deserialize, Serialize};

/// A single request from a client.
///
/// The `action` tag and the action's own fields sit next to `id` in one flat
/// JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(flatten)]
    pub action: Action,
}

impl Command {
    pub fn new(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            action,
        }
    }
}

/// Every operation the daemon understands.
///
/// Arguments named `selector` accept either a ref from the latest snapshot
/// (`@e3`, `ref=e3`, `e3`) or a structural selector (CSS by default,
/// `role=`, `text=` and `xpath=` prefixes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    // Lifecycle
    Launch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headless: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        executable_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cdp_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewport: Option<Viewport>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Vec<String>>,
    },
    Close,

    // Navigation
    Navigate {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wait_until: Option<WaitUntil>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Back,
    Forward,
    Reload,

    // Element interaction
    Click {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button: Option<MouseButton>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        click_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Dblclick {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Type {
        selector: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Fill {
        selector: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Clear {
        selector: String,
    },
    Check {
        selector: String,
    },
    Uncheck {
        selector: String,
    },
    Select {
        selector: String,
        value: String,
    },
    Hover {
        selector: String,
    },
    Focus {
        selector: String,
    },
    Press {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Scroll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<ScrollDirection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<u32>,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
    MouseClick {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button: Option<MouseButton>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        click_count: Option<u32>,
    },

    // Page model
    Snapshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interactive: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        compact: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        include_hidden: Option<bool>,
    },
    GetDom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        include_hidden: Option<bool>,
    },

    // Capture
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        full_page: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ImageFormat>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality: Option<u32>,
    },
    Pdf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    // Queries
    GetTitle,
    GetUrl,
    GetText {
        selector: String,
    },
    GetHtml {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    GetValue {
        selector: String,
    },
    GetAttribute {
        selector: String,
        name: String,
    },
    GetCount {
        selector: String,
    },
    BoundingBox {
        selector: String,
    },
    IsVisible {
        selector: String,
    },
    IsEnabled {
        selector: String,
    },
    IsChecked {
        selector: String,
    },

    // Waiting
    Wait {
        timeout: u64,
    },
    WaitForSelector {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WaitState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    WaitForLoad {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },

    // Frames
    GetFrames,
    SwitchToFrame {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    SwitchToMainFrame,

    // Pages
    GetPages,
    NewPage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    SwitchPage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    ClosePage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    // Scripting and storage
    Evaluate {
        script: String,
    },
    GetCookies,
    ClearCookies,
    GetLocalStorage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    ClearLocalStorage,
    SetViewport {
        width: u32,
        height: u32,
    },

    // Logs
    Console {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear: Option<bool>,
    },
    Errors {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear: Option<bool>,
    },
    Requests {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear: Option<bool>,
    },
}

impl Action {
    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Launch { .. } => "launch",
            Action::Close => "close",
            Action::Navigate { .. } => "navigate",
            Action::Back => "back",
            Action::Forward => "forward",
            Action::Reload => "reload",
            Action::Click { .. } => "click",
            Action::Dblclick { .. } => "dblclick",
            Action::Type { .. } => "type",
            Action::Fill { .. } => "fill",
            Action::Clear { .. } => "clear",
            Action::Check { .. } => "check",
            Action::Uncheck { .. } => "uncheck",
            Action::Select { .. } => "select",
            Action::Hover { .. } => "hover",
            Action::Focus { .. } => "focus",
            Action::Press { .. } => "press",
            Action::Scroll { .. } => "scroll",
            Action::MouseMove { .. } => "mouseMove",
            Action::MouseClick { .. } => "mouseClick",
            Action::Snapshot { .. } => "snapshot",
            Action::GetDom { .. } => "getDom",
            Action::Screenshot { .. } => "screenshot",
            Action::Pdf { .. } => "pdf",
            Action::GetTitle => "getTitle",
            Action::GetUrl => "getUrl",
            Action::GetText { .. } => "getText",
            Action::GetHtml { .. } => "getHtml",
            Action::GetValue { .. } => "getValue",
            Action::GetAttribute { .. } => "getAttribute",
            Action::GetCount { .. } => "getCount",
            Action::BoundingBox { .. } => "boundingBox",
            Action::IsVisible { .. } => "isVisible",
            Action::IsEnabled { .. } => "isEnabled",
            Action::IsChecked { .. } => "isChecked",
            Action::Wait { .. } => "wait",
            Action::WaitForSelector { .. } => "waitForSelector",
            Action::WaitForLoad { .. } => "waitForLoad",
            Action::GetFrames => "getFrames",
            Action::SwitchToFrame { .. } => "switchToFrame",
            Action::SwitchToMainFrame => "switchToMainFrame",
            Action::GetPages => "getPages",
            Action::NewPage { .. } => "newPage",
            Action::SwitchPage { .. } => "switchPage",
            Action::ClosePage { .. } => "closePage",
            Action::Evaluate { .. } => "evaluate",
            Action::GetCookies => "getCookies",
            Action::ClearCookies => "clearCookies",
            Action::GetLocalStorage { .. } => "getLocalStorage",
            Action::ClearLocalStorage => "clearLocalStorage",
            Action::SetViewport { .. } => "setViewport",
            Action::Console { .. } => "console",
            Action::Errors { .. } => "errors",
            Action::Requests { .. } => "requests",
        }
    }

    /// Lifecycle actions manage the browser itself and never trigger an
    /// implicit launch.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Action::Launch { .. } | Action::Close)
    }

    /// Actions that only read session-local state and can be answered
    /// without a browser.
    pub fn is_log_query(&self) -> bool {
        matches!(
            self,
            Action::Console { .. } | Action::Errors { .. } | Action::Requests { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Attached,
    Detached,
    #[default]
    Visible,
    Hidden,
}

/// How long `navigate` waits after the navigation is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    #[serde(rename = "none")]
    NoWait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
