//! Terminal rendering of daemon responses.

use serde_json::Value;

use agentbrowser_protocol::Response;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Result keys that only acknowledge that something happened.
const ACK_KEYS: &[&str] = &[
    "clicked", "typed", "filled", "unchecked", "selected", "hovered", "focused", "pressed",
    "scrolled", "moved", "cleared", "set", "launched", "closed", "switched", "created", "waited",
    "loaded", "found",
];

/// Text to print for `response`. Failures are rendered as an error line.
pub(crate) fn render(response: &Response, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(response).unwrap_or_default();
    }
    match response.error() {
        Some(error) => render_error(error),
        None => render_result(response.result().unwrap_or(&Value::Null)),
    }
}

pub(crate) fn render_error(message: &str) -> String {
    format!("{RED}✗{RESET} {message}")
}

/// Same shape as a daemon failure, for errors raised before a response exists.
pub(crate) fn render_json_error(message: &str) -> String {
    serde_json::json!({"success": false, "error": message}).to_string()
}

fn render_result(result: &Value) -> String {
    if let Some(tree) = result.get("tree").and_then(Value::as_str) {
        let mut out = format!("{tree}\n");
        if let Some(url) = result.get("url").and_then(Value::as_str) {
            out.push_str(&format!("\n{GRAY}URL:{RESET} {url}"));
        }
        if let Some(title) = result.get("title").and_then(Value::as_str) {
            out.push_str(&format!("\n{GRAY}Title:{RESET} {title}"));
        }
        return out;
    }
    if let Some(dom) = result.get("dom") {
        return pretty(dom);
    }
    if let Some(path) = result.get("path").and_then(Value::as_str) {
        return format!("{GREEN}✓{RESET} Saved to: {path}");
    }
    if result.get("data").is_some() {
        return format!("{GREEN}✓{RESET} Captured (base64 data available)");
    }

    for key in ["url", "title", "text", "html"] {
        if let Some(s) = result.get(key).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    if let Some(value) = result.get("value").or_else(|| result.get("result")) {
        return scalar(value);
    }
    for key in ["visible", "enabled", "checked"] {
        if let Some(flag) = result.get(key).and_then(Value::as_bool) {
            return flag.to_string();
        }
    }
    if let Some(count) = result.get("count").and_then(Value::as_u64) {
        return count.to_string();
    }

    if let Some(cookies) = result.get("cookies").and_then(Value::as_array) {
        return lines(cookies.iter().filter_map(|cookie| {
            let name = cookie.get("name").and_then(Value::as_str)?;
            let value = cookie.get("value").and_then(Value::as_str).unwrap_or("");
            Some(format!("{name}: {value}"))
        }));
    }
    if let Some(pages) = result.get("pages").and_then(Value::as_array) {
        return lines(pages.iter().enumerate().map(|(i, page)| {
            let url = str_field(page, "url");
            let title = str_field(page, "title");
            let marker = if page.get("active").and_then(Value::as_bool) == Some(true) {
                " *"
            } else {
                ""
            };
            format!("[{i}] {title} - {url}{marker}")
        }));
    }
    if let Some(frames) = result.get("frames").and_then(Value::as_array) {
        return lines(frames.iter().map(|frame| {
            let name = frame
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .unwrap_or("(unnamed)");
            format!("{name}: {}", str_field(frame, "url"))
        }));
    }
    if let Some(storage) = result.get("storage").and_then(Value::as_object) {
        return lines(storage.iter().map(|(key, value)| format!("{key}: {}", scalar(value))));
    }
    if let Some(messages) = result.get("messages").and_then(Value::as_array) {
        return lines(messages.iter().map(|message| {
            format!("[{}] {}", str_field(message, "type"), str_field(message, "text"))
        }));
    }
    if let Some(errors) = result.get("errors").and_then(Value::as_array) {
        return lines(errors.iter().map(|error| str_field(error, "message").to_string()));
    }
    if let Some(requests) = result.get("requests").and_then(Value::as_array) {
        return lines(requests.iter().map(|request| {
            format!(
                "{} {} ({})",
                str_field(request, "method"),
                str_field(request, "url"),
                str_field(request, "resourceType")
            )
        }));
    }

    if ACK_KEYS.iter().any(|key| result.get(key).is_some()) {
        return format!("{GREEN}✓{RESET} Success");
    }
    pretty(result)
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}
