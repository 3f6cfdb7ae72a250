#![forbid(unsafe_code)]

//! Alt+1..8 view shortcuts routed through the shell.

use std::sync::Arc;

use portal_core::event::{FocusTarget, KeyCode, KeyEvent, KeyEventKind, Modifiers};
use portal_runtime::{Clock, ManualClock, Store, StoreTier};
use portal_shell::keymap::KeyDispatch;
use portal_shell::{EventKind, Identity, PortalShell, ViewId};

fn press_mod(code: KeyCode, modifiers: Modifiers) -> KeyEvent {
    KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
    }
}

fn alt(ch: char) -> KeyEvent {
    press_mod(KeyCode::Char(ch), Modifiers::ALT)
}

fn shell() -> PortalShell {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(chrono::Utc::now()));
    let mut shell = PortalShell::new(
        Store::in_memory(StoreTier::Durable).shared(),
        Store::in_memory(StoreTier::Session).shared(),
        clock,
    );
    shell.bootstrap();
    shell
}

#[test]
fn every_digit_reaches_its_view() {
    let mut shell = shell();
    shell.set_identity(Identity::new("Ada", "S-100"));

    for (i, &view) in ViewId::ALL.iter().enumerate() {
        let digit = char::from_digit(i as u32 + 1, 10).unwrap();
        assert_eq!(
            shell.handle_key(&alt(digit), FocusTarget::Document),
            KeyDispatch::Navigate(view)
        );
        assert_eq!(shell.current_view(), view, "Alt+{digit}");
    }
}

#[test]
fn shortcuts_are_gated_like_clicks() {
    let mut shell = shell();
    shell.handle_key(&alt('4'), FocusTarget::Document);
    assert_eq!(shell.current_view(), ViewId::Profile);

    let last = shell.events().pop().unwrap();
    assert_eq!(last.kind, EventKind::FeatureUse);
    assert_eq!(last.name, "profile_redirect_from_news");
}

#[test]
fn typing_in_a_field_does_not_navigate() {
    let mut shell = shell();
    let before = shell.events().len();

    for focus in [FocusTarget::TextInput, FocusTarget::TextArea, FocusTarget::Select] {
        assert_eq!(shell.handle_key(&alt('6'), focus), KeyDispatch::Ignored);
    }
    assert_eq!(shell.current_view(), ViewId::Home);
    assert_eq!(shell.events().len(), before);
}

#[test]
fn plain_digits_and_releases_are_ignored() {
    let mut shell = shell();
    let plain = press_mod(KeyCode::Char('6'), Modifiers::NONE);
    assert_eq!(shell.handle_key(&plain, FocusTarget::Document), KeyDispatch::Ignored);

    let release = alt('6').with_kind(KeyEventKind::Release);
    assert_eq!(shell.handle_key(&release, FocusTarget::Document), KeyDispatch::Ignored);
    assert_eq!(shell.current_view(), ViewId::Home);
}

#[test]
fn parsed_combos_match_constructed_events() {
    let mut shell = shell();
    let event = KeyEvent::parse_combo("Alt+6").unwrap();
    assert_eq!(event, alt('6'));
    shell.handle_key(&event, FocusTarget::from_tag("button"));
    assert_eq!(shell.current_view(), ViewId::About);
}
