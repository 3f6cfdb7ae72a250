#![forbid(unsafe_code)]

//! Global view shortcuts: Alt+1 through Alt+8.

use portal_core::event::{FocusTarget, KeyCode, KeyEvent, Modifiers};

use crate::view::ViewId;

/// What the shortcut layer did with a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDispatch {
    /// The event selects a view.
    Navigate(ViewId),
    /// The event is not a shortcut, or shortcuts are suspended.
    Ignored,
}

/// Map a key event to a view shortcut.
///
/// Only presses count. Alt must be the sole modifier: Alt+Shift+1 types
/// `!` and is not a shortcut. While focus is in a text-entry control the
/// event belongs to that control, so nothing is dispatched.
#[must_use]
pub fn dispatch(event: &KeyEvent, focus: FocusTarget) -> KeyDispatch {
    if !event.is_press() || focus.is_text_entry() {
        return KeyDispatch::Ignored;
    }
    if !event.alt()
        || event
            .modifiers
            .intersects(Modifiers::CTRL | Modifiers::SUPER | Modifiers::SHIFT)
    {
        return KeyDispatch::Ignored;
    }
    match event.code {
        KeyCode::Char(ch) => {
            ViewId::from_digit(ch).map_or(KeyDispatch::Ignored, KeyDispatch::Navigate)
        }
        _ => KeyDispatch::Ignored,
    }
}
