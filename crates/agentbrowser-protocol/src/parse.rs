//! Parsing and serialization.

use serde_json::{Map, Value};

use crate::command::Command;
use crate::error::ProtocolError;
use crate::response::Response;
use crate::validate::validate;

/// Parse one raw request line into a [`Command`].
///
/// Unknown extra fields are ignored. Values are never coerced: `"5"` is not
/// a number, and an out-of-range value is an error rather than a default.
pub fn parse(raw: &str) -> Result<Command, ProtocolError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(ProtocolError::invalid_json)?;

    let Value::Object(object) = value else {
        return Err(ProtocolError::new(
            None,
            "Invalid command: expected a JSON object",
        ));
    };

    let id = match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(_) => {
            return Err(ProtocolError::new(
                None,
                "Invalid 'id': expected a string",
            ));
        }
        None => return Err(ProtocolError::new(None, "Missing required field 'id'")),
    };

    let action = match object.get("action") {
        Some(Value::String(action)) => action.clone(),
        Some(_) => {
            return Err(ProtocolError::new(
                Some(id),
                "Invalid 'action': expected a string",
            ));
        }
        None => {
            return Err(ProtocolError::new(
                Some(id),
                "Missing required field 'action'",
            ));
        }
    };

    let command: Command = serde_json::from_value(Value::Object(object.clone()))
        .map_err(|e| ProtocolError::new(Some(id.clone()), describe(&object, &action, &e)))?;

    validate(&command.action).map_err(|issue| {
        ProtocolError::new(
            Some(id.clone()),
            format!("Invalid '{}' for {}: {}", issue.field, action, issue.message),
        )
    })?;

    Ok(command)
}

/// Turn a serde failure into a message that names the offending field.
///
/// serde reports missing fields by name but type mismatches inside a
/// flattened tagged enum lose their path, so each field is tested by
/// removing it and checking whether the failure moves.
fn describe(object: &Map<String, Value>, action: &str, error: &serde_json::Error) -> String {
    let message = error.to_string();

    // Enum-valued fields report unknown values the same way, so only treat
    // it as an unknown action when the rejected variant is the tag itself.
    if message.starts_with(&format!("unknown variant `{}`", action))
        && message.contains("`navigate`")
    {
        return format!("Unknown action: {}", action);
    }
    if let Some(field) = backticked(&message, "missing field ") {
        return format!("Missing required field '{}' for {}", field, action);
    }

    for key in object.keys() {
        if key == "id" || key == "action" {
            continue;
        }
        let mut trial = object.clone();
        trial.remove(key);
        let moved = match serde_json::from_value::<Command>(Value::Object(trial)) {
            Ok(_) => true,
            Err(e) => backticked(&e.to_string(), "missing field ") == Some(key.as_str()),
        };
        if moved {
            return format!("Invalid '{}' for {}: {}", key, action, message);
        }
    }

    format!("Invalid command for {}: {}", action, message)
}

fn backticked<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = message.strip_prefix(prefix)?.strip_prefix('`')?;
    let end = rest.find('`')?;
    Some(&rest[..end])
}

/// Serialize a command to a single line of JSON (no trailing newline).
pub fn serialize_command(command: &Command) -> Result<String, ProtocolError> {
    serde_json::to_string(command)
        .map_err(|e| ProtocolError::new(Some(command.id.clone()), e.to_string()))
}

/// Serialize a response to a single line of JSON (no trailing newline).
pub fn serialize_response(response: &Response) -> Result<String, ProtocolError> {
    serde_json::to_string(response)
        .map_err(|e| ProtocolError::new(Some(response.id().to_string()), e.to_string()))
}

/// Parse a response line received from a daemon.
pub fn parse_response(raw: &str) -> Result<Response, ProtocolError> {
    let response: Response =
        serde_json::from_str(raw.trim()).map_err(ProtocolError::invalid_json)?;
    if !response.is_well_formed() {
        return Err(ProtocolError::new(
            Some(response.id().to_string()),
            "Malformed response: success must match the presence of result/error",
        ));
    }
    Ok(response)
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
