//! Response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Id echoed when the request id could not be recovered.
pub const UNKNOWN_ID: &str = "unknown";

/// The reply to a single command.
///
/// A successful response carries `result` and never `error`; a failed one
/// carries `error` and never `result`. The fields are private so that the
/// only way to build one is through [`Response::ok`] and [`Response::err`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    id: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Failure response for a payload that was rejected before dispatch.
    pub fn from_protocol_error(error: &ProtocolError) -> Self {
        let id = error.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string());
        Self::err(id, error.message.clone())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_default())
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        if self.success {
            self.error.is_none()
        } else {
            self.result.is_none() && self.error.is_some()
        }
    }
}
