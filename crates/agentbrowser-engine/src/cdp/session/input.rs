//! Input (mouse and keyboard) operations for CDP page session.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

/// What `Input.dispatchKeyEvent` needs to know about one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    /// Character the key inserts, if any.
    pub text: Option<String>,
}

const NAMED_KEYS: &[(&str, &str, u32, Option<&str>)] = &[
    ("Enter", "Enter", 13, Some("\r")),
    ("Tab", "Tab", 9, None),
    ("Escape", "Escape", 27, None),
    ("Backspace", "Backspace", 8, None),
    ("Delete", "Delete", 46, None),
    ("ArrowUp", "ArrowUp", 38, None),
    ("ArrowDown", "ArrowDown", 40, None),
    ("ArrowLeft", "ArrowLeft", 37, None),
    ("ArrowRight", "ArrowRight", 39, None),
    ("Home", "Home", 36, None),
    ("End", "End", 35, None),
    ("PageUp", "PageUp", 33, None),
    ("PageDown", "PageDown", 34, None),
    ("Space", "Space", 32, Some(" ")),
    ("Insert", "Insert", 45, None),
    ("Shift", "ShiftLeft", 16, None),
    ("Control", "ControlLeft", 17, None),
    ("Alt", "AltLeft", 18, None),
    ("Meta", "MetaLeft", 91, None),
];

impl KeyDefinition {
    /// Look up a key by its DOM name (`Enter`, `ArrowUp`) or a single
    /// character.
    pub fn lookup(name: &str) -> Option<Self> {
        let alias = match name.to_ascii_lowercase().as_str() {
            "esc" => "Escape",
            "return" => "Enter",
            "up" => "ArrowUp",
            "down" => "ArrowDown",
            "left" => "ArrowLeft",
            "right" => "ArrowRight",
            " " => "Space",
            _ => name,
        };

        if let Some(&(key, code, key_code, text)) =
            NAMED_KEYS.iter().find(|(k, ..)| k.eq_ignore_ascii_case(alias))
        {
            return Some(Self {
                key: if key == "Space" { " ".to_string() } else { key.to_string() },
                code: code.to_string(),
                key_code,
                text: text.map(str::to_string),
            });
        }

        let mut chars = name.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let upper = c.to_ascii_uppercase();
        let code = if upper.is_ascii_alphabetic() {
            format!("Key{}", upper)
        } else if c.is_ascii_digit() {
            format!("Digit{}", c)
        } else {
            String::new()
        };
        Some(Self {
            key: c.to_string(),
            code,
            key_code: if c.is_ascii() { upper as u32 } else { 0 },
            text: Some(c.to_string()),
        })
    }
}

impl KeyDefinition {
    /// Split `Control+Shift+a` into modifier flags and the final key.
    pub fn parse_combo(combo: &str) -> Option<(i32, Self)> {
        // A trailing "++" means the plus key itself.
        let (modifier_part, key_name) = match combo.strip_suffix("++") {
            Some(rest) => (rest, "+"),
            None => combo.rsplit_once('+').unwrap_or(("", combo)),
        };
        let names: Vec<&str> = modifier_part.split('+').filter(|m| !m.is_empty()).collect();
        let key = Self::lookup(key_name)?;
        Some((PageSession::get_modifiers(&names), key))
    }
}

impl PageSession {
    async fn mouse_event(
        &self,
        event_type: MouseEventType,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": event_type,
                "x": x,
                "y": y,
                "button": button,
                "clickCount": click_count,
            })),
        )
        .await?;
        Ok(())
    }

    /// Move, then press and release `click_count` times at coordinates.
    pub async fn click(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), CdpError> {
        self.mouse_move(x, y).await?;
        for count in 1..=click_count.max(1) {
            self.mouse_event(MouseEventType::MousePressed, x, y, button, count)
                .await?;
            self.mouse_event(MouseEventType::MouseReleased, x, y, button, count)
                .await?;
        }
        debug!("Clicked at ({}, {}) x{}", x, y, click_count);
        Ok(())
    }

    /// Move mouse to coordinates.
    pub async fn mouse_move(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.mouse_event(MouseEventType::MouseMoved, x, y, MouseButton::None, 0)
            .await
    }

    /// Wheel-scroll at a point.
    pub async fn scroll(&self, x: f64, y: f64, delta_x: f64, delta_y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseWheel,
                "x": x,
                "y": y,
                "deltaX": delta_x,
                "deltaY": delta_y,
            })),
        )
        .await?;
        Ok(())
    }

    /// Insert text as if typed, without key events.
    pub async fn insert_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    /// Press one key with modifier flags held, as parsed by
    /// [`KeyDefinition::parse_combo`].
    pub async fn press_key(&self, modifiers: i32, key: &KeyDefinition) -> Result<(), CdpError> {
        // Chords with Control/Alt/Meta do not insert text.
        let text = if modifiers & 0b0111 == 0 {
            key.text.clone()
        } else {
            None
        };
        let down_type = if text.is_some() {
            KeyEventType::KeyDown
        } else {
            KeyEventType::RawKeyDown
        };

        let mut down = json!({
            "type": down_type,
            "key": key.key,
            "code": key.code,
            "windowsVirtualKeyCode": key.key_code,
            "modifiers": modifiers,
        });
        if let Some(text) = &text {
            down["text"] = json!(text);
        }
        self.call("Input.dispatchKeyEvent", Some(down)).await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key.key,
                "code": key.code,
                "windowsVirtualKeyCode": key.key_code,
                "modifiers": modifiers,
            })),
        )
        .await?;

        Ok(())
    }

    /// Get modifier flags from modifier names.
    pub(super) fn get_modifiers(modifiers: &[&str]) -> i32 {
        let mut flags = 0;
        for m in modifiers {
            match m.to_lowercase().as_str() {
                "alt" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "command" | "cmd" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        flags
    }
}
