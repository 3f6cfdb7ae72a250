#![forbid(unsafe_code)]

//! Startup reconciliation across simulated reloads, backed by real files.
//!
//! A "reload" drops the shell and its stores and opens them again from the
//! same files. A "new session" also points the session tier at a fresh
//! file.
//!
//! # Running Tests
//!
//! ```sh
//! cargo test -p portal-shell --test startup_e2e
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use portal_runtime::{Clock, FileStorage, ManualClock, Store, StoreTier};
use portal_shell::config::session_path;
use portal_shell::keys;
use portal_shell::{EventKind, Identity, ReconcileOutcome, RosterChange, Theme, ViewId};
use portal_shell::PortalShell;
use tempfile::TempDir;

fn open(dir: &Path, session: &str, clock: &Arc<ManualClock>) -> PortalShell {
    let durable = Store::open(
        StoreTier::Durable,
        Box::new(FileStorage::new(dir.join("durable.json"))),
    );
    let session = Store::open(
        StoreTier::Session,
        Box::new(FileStorage::new(session_path(dir, session))),
    );
    let clock: Arc<dyn Clock> = clock.clone();
    PortalShell::new(durable.shared(), session.shared(), clock)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 15, 7, 30, 0).unwrap(),
    ))
}

#[test]
fn login_is_counted_once_per_session() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    {
        let mut shell = open(dir.path(), "s1", &clock);
        assert_eq!(shell.bootstrap(), ReconcileOutcome::NoIdentity);
        assert_eq!(
            shell.set_identity(Identity::new("Ada", "S-100")),
            RosterChange::Inserted
        );
    }

    // Reload within the same session: the stored identity is counted once.
    clock.advance(Duration::minutes(1));
    {
        let mut shell = open(dir.path(), "s1", &clock);
        let ReconcileOutcome::Reconciled { identity, roster } = shell.bootstrap() else {
            panic!("expected the first load to count a login");
        };
        assert_eq!(identity.login_count, 1);
        assert_eq!(roster, RosterChange::Replaced);
        assert_eq!(shell.roster().find("S-100").unwrap().login_count, 1);
    }

    clock.advance(Duration::minutes(1));
    {
        let mut shell = open(dir.path(), "s1", &clock);
        assert!(matches!(
            shell.bootstrap(),
            ReconcileOutcome::SessionAlreadyCounted(_)
        ));
        assert_eq!(shell.identity().login_count, 1);
    }

    // A new session counts again.
    clock.advance(Duration::hours(8));
    {
        let mut shell = open(dir.path(), "s2", &clock);
        let ReconcileOutcome::Reconciled { identity, .. } = shell.bootstrap() else {
            panic!("expected a new session to count a login");
        };
        assert_eq!(identity.login_count, 2);
        assert_eq!(
            identity.last_login,
            Some(Utc.with_ymd_and_hms(2026, 10, 15, 15, 32, 0).unwrap())
        );
    }
}

#[test]
fn initial_page_view_follows_reconciliation() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let mut shell = open(dir.path(), "s1", &clock);
        shell.bootstrap();
        shell.set_identity(Identity::new("Grace", "S-200"));
    }

    let mut shell = open(dir.path(), "s2", &clock);
    shell.bootstrap();
    let last = shell.events().pop().unwrap();
    assert_eq!(last.kind, EventKind::PageView);
    assert_eq!(last.name, ViewId::Home.key());
    assert_eq!(last.user_name, "Grace");
}

#[test]
fn theme_and_marker_survive_reload() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let mut shell = open(dir.path(), "s1", &clock);
        shell.bootstrap();
        shell.set_identity(Identity::new("Ada", "S-100"));
        shell.toggle_theme();
        shell.update_content_ids([4, 8]);
        shell.navigate(ViewId::News);
    }

    let mut shell = open(dir.path(), "s1", &clock);
    shell.bootstrap();
    assert_eq!(shell.theme(), Theme::Dark);
    assert!(!shell.update_content_ids([4, 8]));
    assert!(shell.update_content_ids([4, 8, 9]));
}

#[test]
fn admin_flag_is_per_session() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    {
        let mut shell = open(dir.path(), "s1", &clock);
        shell.bootstrap();
        assert!(shell.admin_login(true));
    }
    {
        let mut shell = open(dir.path(), "s1", &clock);
        shell.bootstrap();
        assert!(shell.is_admin_authenticated());
    }
    let mut shell = open(dir.path(), "s2", &clock);
    shell.bootstrap();
    assert!(!shell.is_admin_authenticated());
}

#[test]
fn corrupt_durable_file_starts_fresh() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("durable.json"), "{ not json").unwrap();
    let clock = clock();

    let mut shell = open(dir.path(), "s1", &clock);
    assert_eq!(shell.bootstrap(), ReconcileOutcome::NoIdentity);
    assert!(shell.identity().is_guest());
    assert_eq!(shell.theme(), Theme::Light);

    // The first successful write replaces the corrupt file.
    shell.toggle_theme();
    let reopened = Store::with_file(StoreTier::Durable, dir.path().join("durable.json"));
    assert_eq!(reopened.get_raw(keys::THEME).as_deref(), Some("dark"));
}
