//! Semantic checks that serde's type checks do not cover.

use crate::command::{Action, ImageFormat, Viewport};

/// Upper bound for every timeout field, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// A field that decoded fine but holds a value outside its allowed range.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

type Check = Result<(), FieldIssue>;

pub(crate) fn validate(action: &Action) -> Check {
    match action {
        Action::Launch { viewport, .. } => viewport_bounds(viewport.as_ref()),
        Action::Navigate { url, timeout, .. } => {
            not_empty("url", url)?;
            timeout_bounds(*timeout)
        }
        Action::Click {
            selector,
            click_count,
            timeout,
            ..
        } => {
            not_empty("selector", selector)?;
            click_count_bounds(*click_count)?;
            timeout_bounds(*timeout)
        }
        Action::Dblclick { selector, timeout }
        | Action::Fill {
            selector, timeout, ..
        }
        | Action::Type {
            selector, timeout, ..
        } => {
            not_empty("selector", selector)?;
            timeout_bounds(*timeout)
        }
        Action::Clear { selector }
        | Action::Check { selector }
        | Action::Uncheck { selector }
        | Action::Select { selector, .. }
        | Action::Hover { selector }
        | Action::Focus { selector }
        | Action::GetText { selector }
        | Action::GetValue { selector }
        | Action::GetAttribute { selector, .. }
        | Action::GetCount { selector }
        | Action::BoundingBox { selector }
        | Action::IsVisible { selector }
        | Action::IsEnabled { selector }
        | Action::IsChecked { selector } => not_empty("selector", selector),
        Action::Press { key, .. } => not_empty("key", key),
        Action::MouseMove { x, y } => coordinates(*x, *y),
        Action::MouseClick {
            x, y, click_count, ..
        } => {
            coordinates(*x, *y)?;
            click_count_bounds(*click_count)
        }
        Action::Screenshot {
            format, quality, ..
        } => screenshot_quality(format.unwrap_or_default(), *quality),
        Action::Wait { timeout } => timeout_bounds(Some(*timeout)),
        Action::WaitForSelector {
            selector, timeout, ..
        } => {
            not_empty("selector", selector)?;
            timeout_bounds(*timeout)
        }
        Action::WaitForLoad { timeout } => timeout_bounds(*timeout),
        Action::SwitchToFrame {
            selector,
            name,
            url,
        } => {
            let given = [selector.is_some(), name.is_some(), url.is_some()]
                .iter()
                .filter(|set| **set)
                .count();
            if given != 1 {
                return Err(FieldIssue::new(
                    "selector",
                    "exactly one of selector, name or url is required",
                ));
            }
            Ok(())
        }
        Action::SwitchPage { index, url } => match (index, url) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(FieldIssue::new(
                "index",
                "exactly one of index or url is required",
            )),
        },
        Action::Evaluate { script } => not_empty("script", script),
        Action::SetViewport { width, height } => viewport_bounds(Some(&Viewport {
            width: *width,
            height: *height,
        })),
        Action::Close
        | Action::Back
        | Action::Forward
        | Action::Reload
        | Action::Scroll { .. }
        | Action::Snapshot { .. }
        | Action::GetDom { .. }
        | Action::Pdf { .. }
        | Action::GetTitle
        | Action::GetUrl
        | Action::GetHtml { .. }
        | Action::GetFrames
        | Action::SwitchToMainFrame
        | Action::GetPages
        | Action::NewPage { .. }
        | Action::ClosePage { .. }
        | Action::GetCookies
        | Action::ClearCookies
        | Action::GetLocalStorage { .. }
        | Action::ClearLocalStorage
        | Action::Console { .. }
        | Action::Errors { .. }
        | Action::Requests { .. } => Ok(()),
    }
}

fn not_empty(field: &'static str, value: &str) -> Check {
    if value.trim().is_empty() {
        return Err(FieldIssue::new(field, "must not be empty"));
    }
    Ok(())
}

fn timeout_bounds(timeout: Option<u64>) -> Check {
    match timeout {
        Some(ms) if ms > MAX_TIMEOUT_MS => Err(FieldIssue::new(
            "timeout",
            format!("must be at most {} ms, got {}", MAX_TIMEOUT_MS, ms),
        )),
        _ => Ok(()),
    }
}

fn click_count_bounds(count: Option<u32>) -> Check {
    match count {
        Some(n) if !(1..=3).contains(&n) => Err(FieldIssue::new(
            "clickCount",
            format!("must be between 1 and 3, got {}", n),
        )),
        _ => Ok(()),
    }
}

fn coordinates(x: f64, y: f64) -> Check {
    if !x.is_finite() || x < 0.0 {
        return Err(FieldIssue::new("x", format!("must be >= 0, got {}", x)));
    }
    if !y.is_finite() || y < 0.0 {
        return Err(FieldIssue::new("y", format!("must be >= 0, got {}", y)));
    }
    Ok(())
}

fn screenshot_quality(format: ImageFormat, quality: Option<u32>) -> Check {
    let Some(q) = quality else {
        return Ok(());
    };
    if q > 100 {
        return Err(FieldIssue::new(
            "quality",
            format!("must be between 0 and 100, got {}", q),
        ));
    }
    if format != ImageFormat::Jpeg {
        return Err(FieldIssue::new(
            "quality",
            "is only supported for jpeg screenshots",
        ));
    }
    Ok(())
}

fn viewport_bounds(viewport: Option<&Viewport>) -> Check {
    if let Some(v) = viewport {
        if v.width == 0 {
            return Err(FieldIssue::new("width", "must be greater than 0"));
        }
        if v.height == 0 {
            return Err(FieldIssue::new("height", "must be greater than 0"));
        }
    }
    Ok(())
}
