//! Property-based tests for key combo parsing.
//!
//! 1. Parsing never panics, whatever the input.
//! 2. Any modifier set spelled in any case and order parses to the same flags.
//! 3. Focus names outside the known set never suspend shortcuts.

use portal_core::event::{FocusTarget, KeyCode, KeyEvent, Modifiers};
use proptest::prelude::*;

fn modifier_names() -> impl Strategy<Value = Vec<(&'static str, Modifiers)>> {
    prop::sample::subsequence(
        vec![
            ("alt", Modifiers::ALT),
            ("ctrl", Modifiers::CTRL),
            ("shift", Modifiers::SHIFT),
            ("meta", Modifiers::SUPER),
        ],
        0..=4,
    )
    .prop_shuffle()
}

proptest! {
    #[test]
    fn parse_never_panics(input in ".{0,24}") {
        let _ = KeyEvent::parse_combo(&input);
    }

    #[test]
    fn modifiers_parse_in_any_order(
        mods in modifier_names(),
        upper in any::<bool>(),
        digit in 0u32..10,
    ) {
        let key = char::from_digit(digit, 10).unwrap();
        let mut parts: Vec<String> = mods
            .iter()
            .map(|(name, _)| if upper { name.to_ascii_uppercase() } else { (*name).to_string() })
            .collect();
        parts.push(key.to_string());

        let event = KeyEvent::parse_combo(&parts.join("+")).unwrap();
        let expected = mods.iter().fold(Modifiers::NONE, |acc, (_, flag)| acc | *flag);
        prop_assert_eq!(event.modifiers, expected);
        prop_assert_eq!(event.code, KeyCode::Char(key));
        prop_assert!(event.is_press());
    }

    #[test]
    fn unknown_focus_names_are_document(tag in "[a-z]{1,12}") {
        prop_assume!(!["input", "text", "textarea", "select", "button", "a", "link"].contains(&tag.as_str()));
        prop_assert_eq!(FocusTarget::from_tag(&tag), FocusTarget::Document);
        prop_assert!(!FocusTarget::from_tag(&tag).is_text_entry());
    }
}
