//! [`BrowserEngine`](crate::BrowserEngine) over the Chrome DevTools Protocol.
//!
//! One [`CdpEngine`] owns one browser connection. Every attached page feeds
//! a shared event state (console, errors, requests, lifecycle marks and
//! frame execution contexts) from its own pump task.

mod engine_core;
mod engine_elements;
mod engine_events;
mod engine_impl;
mod layout;

pub use engine_core::CdpEngine;

#[cfg(test)]
#[path = "cdp_engine_tests.rs"]
mod tests;
