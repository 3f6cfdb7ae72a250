#![forbid(unsafe_code)]

//! Canonical keyboard input and focus types.
//!
//! The shell never reads a platform event loop directly. Hosts translate
//! their native key events into [`KeyEvent`] and report where keyboard focus
//! currently sits as a [`FocusTarget`], so shortcut dispatch can stay out of
//! the way while the user is typing.
//!
//! # Design Notes
//!
//! - `KeyEventKind` defaults to `Press` when the host cannot distinguish it
//! - `Modifiers` use bitflags for easy combination
//! - Combos parse from the `alt+2` / `ctrl+shift+k` notation used in scripts

use bitflags::bitflags;

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if this event is a key press (not a repeat or release).
    #[must_use]
    pub const fn is_press(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press)
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt modifier is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }

    /// Parse a combo such as `alt+2`, `Ctrl+Shift+k`, or `enter`.
    ///
    /// Modifier names are case-insensitive. The final segment is the key.
    pub fn parse_combo(combo: &str) -> Result<Self, KeyParseError> {
        let trimmed = combo.trim();
        if trimmed.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut modifiers = Modifiers::NONE;
        let mut parts: Vec<&str> = trimmed.split('+').collect();
        // "alt++" names the plus key itself.
        if trimmed.ends_with("++") {
            parts.truncate(parts.len() - 2);
            parts.push("+");
        }
        let Some((key, mods)) = parts.split_last() else {
            return Err(KeyParseError::Empty);
        };

        for name in mods {
            let flag = match name.trim().to_ascii_lowercase().as_str() {
                "alt" | "option" | "opt" => Modifiers::ALT,
                "ctrl" | "control" => Modifiers::CTRL,
                "shift" => Modifiers::SHIFT,
                "super" | "meta" | "cmd" => Modifiers::SUPER,
                other => return Err(KeyParseError::UnknownModifier(other.to_string())),
            };
            modifiers |= flag;
        }

        let code = KeyCode::parse(key.trim())?;
        Ok(Self::new(code).with_modifiers(modifiers))
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Backspace key.
    Backspace,

    /// Tab key.
    Tab,

    /// Function key (F1-F24).
    F(u8),
}

impl KeyCode {
    fn parse(name: &str) -> Result<Self, KeyParseError> {
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            return Ok(Self::Char(ch));
        }
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "" => Err(KeyParseError::Empty),
            "enter" | "return" => Ok(Self::Enter),
            "esc" | "escape" => Ok(Self::Escape),
            "backspace" => Ok(Self::Backspace),
            "tab" => Ok(Self::Tab),
            "space" => Ok(Self::Char(' ')),
            _ => lower
                .strip_prefix('f')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=24).contains(n))
                .map(Self::F)
                .ok_or_else(|| KeyParseError::UnknownKey(name.to_string())),
        }
    }
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Where keyboard focus sits when a key event arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    /// Nothing focused, or the page body.
    #[default]
    Document,
    /// A button or other activatable control.
    Button,
    /// A hyperlink.
    Link,
    /// Single-line text input.
    TextInput,
    /// Multi-line text area.
    TextArea,
    /// Drop-down selection control.
    Select,
}

impl FocusTarget {
    /// Whether the focused control consumes typed characters.
    #[must_use]
    pub const fn is_text_entry(self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea | Self::Select)
    }

    /// Parse a host-supplied focus name (`input`, `textarea`, `select`, ...).
    ///
    /// Unrecognized names map to [`FocusTarget::Document`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "input" | "text" => Self::TextInput,
            "textarea" => Self::TextArea,
            "select" => Self::Select,
            "button" => Self::Button,
            "a" | "link" => Self::Link,
            _ => Self::Document,
        }
    }
}

/// Errors from [`KeyEvent::parse_combo`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    /// The combo string was empty.
    #[error("empty key combo")]
    Empty,
    /// A modifier segment was not recognized.
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    /// The key segment was not recognized.
    #[error("unknown key `{0}`")]
    UnknownKey(String),
}
