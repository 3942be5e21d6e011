//! Rewrites engine failures into messages that say what to do next.
//!
//! Classification works on the rendered message rather than the variant:
//! an expired actionability wait reports its last obstacle inside the
//! timeout text, and the obstacle is the more useful thing to tell the
//! caller. Obstacles are therefore checked before the timeout itself.

use agentbrowser_engine::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    Ambiguous(Option<usize>),
    Covered(Option<String>),
    NotVisible,
    Missing,
    Timeout,
    FrameNotFound,
    PageNotFound,
    Other,
}

fn classify(message: &str) -> Failure {
    if message.contains("strict mode violation") {
        Failure::Ambiguous(match_count(message))
    } else if message.contains("intercepts pointer events") {
        Failure::Covered(covering_element(message))
    } else if message.contains("is not visible") {
        Failure::NotVisible
    } else if message.contains("detached from the DOM") || message.contains("Element not found") {
        Failure::Missing
    } else if message.starts_with("Timeout ") {
        Failure::Timeout
    } else if message.starts_with("Frame not found") {
        Failure::FrameNotFound
    } else if message.starts_with("Page not found") {
        Failure::PageNotFound
    } else {
        Failure::Other
    }
}

/// `... resolved to 3 elements` -> 3
fn match_count(message: &str) -> Option<usize> {
    let (_, rest) = message.split_once("resolved to ")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// `Element #buy is covered: <div#overlay> intercepts pointer events`
/// -> `<div#overlay>`
fn covering_element(message: &str) -> Option<String> {
    let (head, _) = message.split_once(" intercepts pointer events")?;
    let (_, by) = head.rsplit_once(" is covered: ")?;
    Some(by.to_string())
}

/// User-facing message for `error`, raised while acting on `target`.
pub fn translate(error: &EngineError, target: Option<&str>) -> String {
    let message = error.to_string();
    let subject = match target {
        Some(target) => format!("\"{}\"", target),
        None => "The element".to_string(),
    };

    match classify(&message) {
        Failure::Ambiguous(count) => {
            let count = count.map_or_else(|| "several".to_string(), |n| n.to_string());
            format!(
                "{} matched {} elements. Run 'snapshot' and use the ref of the one you \
                 want, or add '>> nth=N' to the selector.",
                subject, count
            )
        }
        Failure::Covered(by) => format!(
            "{} is covered by {}, which intercepts pointer events. Dismiss the overlay \
             (dialog, banner, cookie notice) or scroll the element into view, then retry.",
            subject,
            by.as_deref().unwrap_or("another element")
        ),
        Failure::NotVisible => format!(
            "{} is not visible. Scroll it into view or wait for it with \
             'waitForSelector', then retry.",
            subject
        ),
        Failure::Missing => format!(
            "{} was not found or is no longer attached to the page. Run 'snapshot' to \
             get fresh refs.",
            subject
        ),
        Failure::Timeout => format!(
            "{}. The page may still be loading: retry with a longer timeout, or check \
             the target with 'snapshot'.",
            message
        ),
        Failure::FrameNotFound => format!(
            "{}. Run 'getFrames' to list frames, or 'switchToMainFrame' to return to the page.",
            message
        ),
        Failure::PageNotFound => format!("{}. Run 'getPages' to list open pages.", message),
        Failure::Other => message,
    }
}

#[cfg(test)]
#[path = "translate_tests.rs"]
mod tests;
