//! # agentbrowser engine
//!
//! The browser capability boundary used by the session layer.
//!
//! [`BrowserEngine`] is the only thing the dispatcher talks to. Two
//! implementations ship with the crate:
//!
//! - [`CdpEngine`] drives Chrome (or any Chromium build) over the Chrome
//!   DevTools Protocol, either launching it or connecting to a running one.
//! - [`MockEngine`] keeps a scripted page model in memory so that the
//!   layers above can be tested without a browser.
//!
//! Elements are addressed with a [`Locator`]: a CSS selector, an XPath, a
//! text match or an accessibility role and name, optionally narrowed with
//! `>> nth=N`.

pub mod cdp;
mod cdp_engine;
mod chrome;
mod engine;
mod error;
mod locator;
mod mock;
mod types;

pub use cdp_engine::CdpEngine;
pub use chrome::find_chrome;
pub use engine::BrowserEngine;
pub use error::EngineError;
pub use locator::{Locator, LocatorKind};
pub use mock::{MockElement, MockEngine, BLANK_URL};
pub use types::{
    ClickOptions, ElementQuery, EngineEvent, Focus, FrameInfo, ImageFormat, LaunchOptions,
    MouseButton, NavigateOutcome, PageInfo, ScreenshotOptions, WaitState, WaitUntil,
};
