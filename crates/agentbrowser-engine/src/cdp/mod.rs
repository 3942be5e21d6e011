//! Chrome DevTools Protocol client.
//!
//! [`CdpClient`] owns one browser-level WebSocket. Pages are attached with
//! flattened sessions, so every [`PageSession`] shares the same socket and
//! request id space.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://127.0.0.1:9222").await?;
//! let target = client.create_target("about:blank").await?;
//! let page = client.attach_page(&target).await?;
//! page.navigate("https://example.com").await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::{KeyDefinition, NavigationStart, PageSession};
