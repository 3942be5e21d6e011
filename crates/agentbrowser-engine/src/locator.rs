//! Structural element selectors.
//!
//! A selector string is CSS unless it carries a prefix:
//!
//! - `role=button[name="Submit"]` matches by accessibility role and name
//! - `text=Sign in` matches the smallest element containing the text
//! - `xpath=//form/input` (or any string starting with `//`) is XPath
//!
//! Any form may end with ` >> nth=N` to pick the N-th match (zero-based)
//! instead of requiring a unique one.

use std::fmt;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorKind {
    Css(String),
    XPath(String),
    Text(String),
    Role { role: String, name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub kind: LocatorKind,
    pub nth: Option<usize>,
}

const NTH_SEPARATOR: &str = " >> nth=";

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::Css(selector.into()),
            nth: None,
        }
    }

    pub fn role(role: impl Into<String>, name: Option<String>, nth: Option<usize>) -> Self {
        Self {
            kind: LocatorKind::Role {
                role: role.into(),
                name,
            },
            nth,
        }
    }

    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EngineError::InvalidSelector("empty selector".to_string()));
        }

        let (body, nth) = match input.rsplit_once(NTH_SEPARATOR) {
            Some((body, index)) => {
                let index = index.trim().parse::<usize>().map_err(|_| {
                    EngineError::InvalidSelector(format!("bad nth index in {}", input))
                })?;
                (body.trim(), Some(index))
            }
            None => (input, None),
        };

        let kind = if let Some(rest) = body.strip_prefix("role=") {
            parse_role(rest).ok_or_else(|| EngineError::InvalidSelector(input.to_string()))?
        } else if let Some(text) = body.strip_prefix("text=") {
            LocatorKind::Text(unquote(text).to_string())
        } else if let Some(xpath) = body.strip_prefix("xpath=") {
            LocatorKind::XPath(xpath.to_string())
        } else if body.starts_with("//") {
            LocatorKind::XPath(body.to_string())
        } else if let Some(css) = body.strip_prefix("css=") {
            LocatorKind::Css(css.to_string())
        } else {
            LocatorKind::Css(body.to_string())
        };

        Ok(Self { kind, nth })
    }

    /// `(kind, value)` pair handed to the in-page resolver script.
    pub(crate) fn script_args(&self) -> (&'static str, &str) {
        match &self.kind {
            LocatorKind::Css(s) => ("css", s),
            LocatorKind::XPath(s) => ("xpath", s),
            LocatorKind::Text(s) => ("text", s),
            LocatorKind::Role { role, .. } => ("role", role),
        }
    }
}

/// `button[name="Save \"all\""]` -> role `button`, name `Save "all"`.
fn parse_role(rest: &str) -> Option<LocatorKind> {
    let Some(open) = rest.find('[') else {
        return valid_role(rest).then(|| LocatorKind::Role {
            role: rest.to_string(),
            name: None,
        });
    };
    let role = &rest[..open];
    let attr = rest[open + 1..].strip_suffix(']')?;
    let quoted = attr.strip_prefix("name=")?;
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    valid_role(role).then(|| LocatorKind::Role {
        role: role.to_string(),
        name: Some(unescape(inner)),
    })
}

fn valid_role(role: &str) -> bool {
    !role.is_empty() && role.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LocatorKind::Css(s) => write!(f, "{}", s)?,
            LocatorKind::XPath(s) => write!(f, "xpath={}", s)?,
            LocatorKind::Text(s) => write!(f, "text={}", s)?,
            LocatorKind::Role { role, name } => {
                write!(f, "role={}", role)?;
                if let Some(name) = name {
                    write!(f, "[name=\"{}\"]", name.replace('\\', "\\\\").replace('"', "\\\""))?;
                }
            }
        }
        if let Some(nth) = self.nth {
            write!(f, "{}{}", NTH_SEPARATOR, nth)?;
        }
        Ok(())
    }
}
