//! # agentbrowser protocol
//!
//! The closed set of commands a client can send to a session daemon, the
//! response envelope that comes back, and the pure functions that move them
//! across the wire.
//!
//! Every message is a single JSON object on its own line:
//!
//! ```text
//! -> {"id":"1","action":"navigate","url":"https://example.com"}
//! <- {"id":"1","success":true,"result":{"url":"https://example.com/","status":200}}
//! ```
//!
//! Parsing happens in two phases. The raw text is decoded into a generic
//! JSON value first, then checked against the command shapes. A failure in
//! the second phase still carries the request id so the caller can
//! correlate the error.

mod command;
mod error;
mod parse;
mod response;
mod validate;

pub use command::{
    Action, Command, ImageFormat, MouseButton, ScrollDirection, Viewport, WaitState, WaitUntil,
};
pub use error::ProtocolError;
pub use parse::{parse, parse_response, serialize_command, serialize_response};
pub use response::{Response, UNKNOWN_ID};
pub use validate::MAX_TIMEOUT_MS;
