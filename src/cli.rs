//! CLI definitions for agentbrowser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// agentbrowser CLI.
#[derive(Parser, Debug)]
#[command(name = "agentbrowser")]
#[command(about = "Drive a headless browser from the shell, one command at a time")]
#[command(version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GlobalArgs {
    /// Print the raw response as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Session name; each session has its own daemon and browser
    #[arg(
        long,
        env = "AGENT_BROWSER_SESSION",
        default_value = agentbrowser_daemon::DEFAULT_SESSION,
        global = true
    )]
    pub session: String,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Browser executable to launch
    #[arg(long, global = true)]
    pub executable_path: Option<String>,

    /// Extension directories to load (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub extensions: Vec<String>,

    /// Timeout in milliseconds for commands that wait
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Configuration file path (default: ~/.agentbrowser/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Navigate to a URL
    #[command(visible_aliases = ["navigate", "goto"])]
    Open {
        url: String,
        /// When navigation counts as finished
        #[arg(long, value_enum)]
        wait_until: Option<LoadState>,
    },

    /// Go back in history
    Back,

    /// Go forward in history
    Forward,

    /// Reload the page
    #[command(visible_alias = "refresh")]
    Reload,

    /// Click an element
    Click {
        selector: String,
        #[arg(long, value_enum)]
        button: Option<Button>,
    },

    /// Double-click an element
    #[command(visible_alias = "doubleclick")]
    Dblclick { selector: String },

    /// Type text into an element, key by key
    Type {
        selector: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Delay between keystrokes in milliseconds
        #[arg(long)]
        delay: Option<u64>,
        /// Clear the field first
        #[arg(long)]
        clear: bool,
    },

    /// Replace the value of an input
    Fill {
        selector: String,
        #[arg(required = true, num_args = 1..)]
        value: Vec<String>,
    },

    /// Clear an input
    Clear { selector: String },

    /// Check a checkbox
    Check { selector: String },

    /// Uncheck a checkbox
    Uncheck { selector: String },

    /// Select an option in a <select>
    Select { selector: String, value: String },

    /// Hover over an element
    Hover { selector: String },

    /// Focus an element
    Focus { selector: String },

    /// Press a key, optionally on an element
    Press { key: String, selector: Option<String> },

    /// Scroll the page or an element
    Scroll {
        selector: Option<String>,
        #[arg(long, value_enum)]
        direction: Option<Direction>,
        /// Distance in pixels
        #[arg(long)]
        amount: Option<u32>,
    },

    /// Move the mouse to page coordinates
    #[command(name = "mousemove")]
    MouseMove { x: f64, y: f64 },

    /// Click at page coordinates
    #[command(name = "mouseclick")]
    MouseClick {
        x: f64,
        y: f64,
        #[arg(long, value_enum)]
        button: Option<Button>,
    },

    /// Accessibility snapshot with element refs
    Snapshot {
        /// Limit the snapshot to this subtree
        selector: Option<String>,
        /// Include non-interactive nodes
        #[arg(long)]
        all: bool,
        #[arg(long)]
        depth: Option<usize>,
        /// Drop structural nodes without a name
        #[arg(long)]
        compact: bool,
        /// Include hidden elements
        #[arg(long)]
        hidden: bool,
    },

    /// Simplified DOM tree
    Dom {
        selector: Option<String>,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        hidden: bool,
    },

    /// Take a screenshot
    Screenshot {
        /// Output file; base64 data is returned when omitted
        path: Option<String>,
        #[arg(long)]
        full_page: bool,
        /// Capture only this element
        #[arg(long)]
        selector: Option<String>,
        #[arg(long, value_enum)]
        format: Option<Format>,
        /// JPEG quality (0-100)
        #[arg(long)]
        quality: Option<u32>,
    },

    /// Print the page to PDF
    Pdf { path: Option<String> },

    /// Page title
    #[command(visible_alias = "gettitle")]
    Title,

    /// Page URL
    #[command(visible_alias = "geturl")]
    Url,

    /// Text content of an element
    #[command(visible_alias = "gettext")]
    Text { selector: String },

    /// Outer HTML of an element or the page
    #[command(visible_alias = "gethtml")]
    Html { selector: Option<String> },

    /// Value of an input
    #[command(visible_alias = "getvalue")]
    Value { selector: String },

    /// Attribute of an element
    #[command(visible_alias = "getattribute")]
    Attr { selector: String, name: String },

    /// Number of matching elements
    #[command(visible_alias = "getcount")]
    Count { selector: String },

    /// Bounding box of an element
    #[command(name = "box", visible_alias = "boundingbox")]
    BoundingBox { selector: String },

    /// Whether an element is visible
    #[command(visible_alias = "isvisible")]
    Visible { selector: String },

    /// Whether an element is enabled
    #[command(visible_alias = "isenabled")]
    Enabled { selector: String },

    /// Whether a checkbox is checked
    #[command(visible_alias = "ischecked")]
    Checked { selector: String },

    /// Wait for a number of milliseconds or for a selector
    Wait {
        /// Milliseconds, or a selector to wait for
        target: String,
        #[arg(long, value_enum)]
        state: Option<ElementState>,
    },

    /// Wait for the page load event
    #[command(name = "waitload", visible_alias = "waitforload")]
    WaitForLoad,

    /// List frames of the current page
    Frames,

    /// Switch into a frame
    Frame {
        /// Selector of the <iframe> element
        selector: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Switch back to the main frame
    Mainframe,

    /// List open pages
    Pages,

    /// Open a new page
    Newpage { url: Option<String> },

    /// Switch to a page by index
    Switchpage { index: usize },

    /// Close a page (the active one by default)
    Closepage { index: Option<usize> },

    /// Evaluate JavaScript in the page
    Eval {
        #[arg(required = true, num_args = 1..)]
        script: Vec<String>,
    },

    /// List cookies
    Cookies,

    /// Clear cookies
    Clearcookies,

    /// Read localStorage (one key or all)
    Localstorage { key: Option<String> },

    /// Clear localStorage
    Clearlocalstorage,

    /// Resize the viewport
    Viewport { width: u32, height: u32 },

    /// Console messages captured so far
    Console {
        #[arg(long)]
        clear: bool,
    },

    /// Page errors captured so far
    Errors {
        #[arg(long)]
        clear: bool,
    },

    /// Network requests captured so far
    Requests {
        /// Only URLs containing this text
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        clear: bool,
    },

    /// Launch the browser now instead of on first use
    Launch {
        /// Connect to a running browser instead of launching one
        #[arg(long)]
        cdp_url: Option<String>,
    },

    /// Close the browser and stop the session daemon
    Close,

    /// Daemon management commands
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum DaemonAction {
    /// Start the session daemon
    Start {
        /// Serve in this process instead of detaching
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the session daemon
    Stop {
        /// Kill instead of asking it to shut down
        #[arg(long)]
        force: bool,
    },

    /// Get daemon status
    Status,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Button {
    Left,
    Middle,
    Right,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Png,
    Jpeg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadState {
    Load,
    Domcontentloaded,
    #[value(name = "none")]
    NoWait,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementState {
    Attached,
    Detached,
    Visible,
    Hidden,
}
