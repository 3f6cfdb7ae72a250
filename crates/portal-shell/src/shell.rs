#![forbid(unsafe_code)]

//! The portal's client-state container.
//!
//! [`PortalShell`] owns every piece of cross-view state: the active view and
//! coding selection, theme, identity, admin flag, and new-content indicator.
//! Views read it and call back into it; nothing else writes the stored keys.
//!
//! # Startup
//!
//! [`PortalShell::bootstrap`] runs the startup steps in a fixed order:
//!
//! 1. restore the theme,
//! 2. reconcile the persisted identity (login count and roster),
//! 3. record the initial `home` page view,
//! 4. recompute the new-content indicator.
//!
//! The page view is recorded after reconciliation so it is attributed to
//! the reconciled identity.

use std::sync::Arc;

use portal_core::event::{FocusTarget, KeyEvent};
use portal_runtime::{Clock, Store};
use serde::Serialize;

use crate::admin::AdminSession;
use crate::analytics::{AnalyticsEvent, AnalyticsLogger, EventKind, Payload};
use crate::identity::{Identity, IdentityManager, ReconcileOutcome, Roster, RosterChange};
use crate::keymap::{self, KeyDispatch};
use crate::navigation::{self, Effect, NavContext, NavState, TopicSelection, Transition};
use crate::notifications::{FreshnessTracker, latest_content_id};
use crate::theme::Theme;
use crate::view::ViewId;

/// Read-only summary of shell state for collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellSnapshot {
    /// Active view.
    pub view: ViewId,
    /// Title of the active view.
    pub view_title: &'static str,
    /// Coding topic selection, if any.
    pub selection: Option<TopicSelection>,
    /// Active theme.
    pub theme: Theme,
    /// Display name of the active identity.
    pub user_name: String,
    /// Whether the active identity is the guest.
    pub is_guest: bool,
    /// Counted logins of the active identity.
    pub login_count: u32,
    /// Whether the admin credential check passed this session.
    pub admin_authenticated: bool,
    /// Largest known content id.
    pub latest_content_id: u64,
    /// Whether unacknowledged content exists.
    pub has_new_content: bool,
    /// Stored analytics events.
    pub event_count: usize,
    /// Known users.
    pub roster_size: usize,
}

/// Single owner of client-state mutation.
#[derive(Debug)]
pub struct PortalShell {
    session: Arc<Store>,
    identity: IdentityManager,
    analytics: AnalyticsLogger,
    freshness: FreshnessTracker,
    admin: AdminSession,
    durable: Arc<Store>,
    nav: NavState,
    theme: Theme,
    latest_content_id: u64,
    has_new_content: bool,
    booted: bool,
}

impl PortalShell {
    /// Create a shell over the two store tiers. Call
    /// [`bootstrap`](Self::bootstrap) before use.
    #[must_use]
    pub fn new(durable: Arc<Store>, session: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity: IdentityManager::new(
                Arc::clone(&durable),
                Arc::clone(&session),
                Arc::clone(&clock),
            ),
            analytics: AnalyticsLogger::new(Arc::clone(&durable), clock),
            freshness: FreshnessTracker::new(Arc::clone(&durable)),
            admin: AdminSession::new(Arc::clone(&session)),
            durable,
            session,
            nav: NavState::default(),
            theme: Theme::default(),
            latest_content_id: 0,
            has_new_content: false,
            booted: false,
        }
    }

    /// Run the startup steps. Later calls do nothing and report
    /// [`ReconcileOutcome::AlreadyReconciled`].
    pub fn bootstrap(&mut self) -> ReconcileOutcome {
        if self.booted {
            return ReconcileOutcome::AlreadyReconciled;
        }
        self.booted = true;

        self.theme = Theme::load(&self.durable);
        let outcome = self.identity.reconcile_startup();
        self.analytics.record(EventKind::PageView, ViewId::Home.key(), None);
        self.refresh_freshness();

        tracing::debug!(
            theme = %self.theme,
            outcome = ?outcome,
            has_new_content = self.has_new_content,
            "shell bootstrapped"
        );
        outcome
    }

    // --- navigation ---------------------------------------------------------

    /// Request a view. Guests asking for a restricted view land on the
    /// profile view instead.
    pub fn navigate(&mut self, requested: ViewId) -> Transition {
        let ctx = NavContext {
            is_guest: self.identity.current().is_guest(),
            notifications_fresh: self.has_new_content,
            latest_id: self.latest_content_id,
        };
        let transition = navigation::transition(&self.nav, &ctx, requested);
        for effect in &transition.effects {
            self.apply(effect);
        }
        tracing::debug!(
            requested = %requested,
            destination = %transition.destination,
            "navigated"
        );
        transition
    }

    /// Request a view by name; unknown names go home.
    pub fn navigate_key(&mut self, key: &str) -> Transition {
        self.navigate(ViewId::parse_lossy(key))
    }

    /// Route a key event through the global shortcuts.
    pub fn handle_key(&mut self, event: &KeyEvent, focus: FocusTarget) -> KeyDispatch {
        let dispatch = keymap::dispatch(event, focus);
        if let KeyDispatch::Navigate(view) = dispatch {
            self.navigate(view);
        }
        dispatch
    }

    fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ClearSelection => self.nav.selection = None,
            Effect::AcknowledgeNotifications(latest) => {
                self.freshness.acknowledge(*latest);
                self.refresh_freshness();
            }
            Effect::SetView(view) => self.nav.current = *view,
            Effect::Record {
                kind,
                name,
                payload,
            } => {
                self.analytics.record(*kind, name.as_str(), payload.clone());
            }
        }
    }

    /// The active view.
    #[must_use]
    pub fn current_view(&self) -> ViewId {
        self.nav.current
    }

    /// Whether guests are redirected away from `view`.
    #[must_use]
    pub fn is_restricted(&self, view: ViewId) -> bool {
        view.is_restricted()
    }

    /// Drill into a coding topic.
    pub fn select_topic(&mut self, topic: TopicSelection) {
        self.nav.selection = Some(topic);
    }

    /// Leave the drilled-into topic.
    pub fn clear_selection(&mut self) {
        self.nav.selection = None;
    }

    /// The coding topic selection.
    #[must_use]
    pub fn selection(&self) -> Option<&TopicSelection> {
        self.nav.selection.as_ref()
    }

    // --- analytics ----------------------------------------------------------

    /// Record an analytics event attributed to the active identity.
    pub fn record_event(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        payload: Option<Payload>,
    ) -> AnalyticsEvent {
        self.analytics.record(kind, name, payload)
    }

    /// Stored analytics events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.analytics.events()
    }

    // --- identity -----------------------------------------------------------

    /// The active identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity.current()
    }

    /// Known users.
    #[must_use]
    pub fn roster(&self) -> Roster {
        self.identity.roster()
    }

    /// Replace the active identity, as produced by the identity-entry view.
    ///
    /// Handing over the guest is a full logout, view reset included.
    pub fn set_identity(&mut self, identity: Identity) -> RosterChange {
        if identity.is_guest() {
            self.logout_user();
            return RosterChange::Unchanged;
        }
        self.identity.set_identity(identity)
    }

    /// Log the user out: back to the guest, home view, no selection.
    ///
    /// The logout event is recorded first so it carries the departing
    /// user's name.
    pub fn logout_user(&mut self) {
        self.analytics.record(EventKind::FeatureUse, "user_logout", None);
        self.identity.logout();
        self.nav.selection = None;
        self.nav.current = ViewId::Home;
    }

    // --- admin --------------------------------------------------------------

    /// Record the admin credential check result. A failed check leaves the
    /// flag unset.
    pub fn admin_login(&mut self, credential_ok: bool) -> bool {
        if credential_ok {
            self.admin.set_authenticated(true);
            tracing::info!("admin authenticated for this session");
        } else {
            tracing::debug!("admin credential rejected");
        }
        self.admin.is_authenticated()
    }

    /// Drop admin access and go home.
    pub fn admin_logout(&mut self) {
        self.admin.set_authenticated(false);
        self.nav.current = ViewId::Home;
        tracing::info!("admin signed out");
    }

    /// Whether the admin credential check passed this session.
    #[must_use]
    pub fn is_admin_authenticated(&self) -> bool {
        self.admin.is_authenticated()
    }

    // --- notifications ------------------------------------------------------

    /// Whether `latest` is newer than the acknowledged marker.
    #[must_use]
    pub fn is_notification_fresh(&self, latest: u64) -> bool {
        self.freshness.is_fresh(latest)
    }

    /// Report the current content collection's ids.
    pub fn update_content_ids<I: IntoIterator<Item = u64>>(&mut self, ids: I) -> bool {
        self.latest_content_id = latest_content_id(ids);
        self.refresh_freshness();
        self.has_new_content
    }

    /// Whether unacknowledged content exists.
    #[must_use]
    pub fn has_new_content(&self) -> bool {
        self.has_new_content
    }

    fn refresh_freshness(&mut self) {
        self.has_new_content = self.freshness.is_fresh(self.latest_content_id);
    }

    // --- theme & session ----------------------------------------------------

    /// Flip between light and dark and persist the choice.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme.save(&self.durable);
        let payload = Payload::new().with("newTheme", self.theme.as_str()).ok();
        self.analytics.record(EventKind::FeatureUse, "toggle_theme", payload);
        self.theme
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// End the session: the session tier is cleared, the admin flag with it.
    pub fn end_session(&mut self) {
        if let Err(error) = self.session.clear() {
            tracing::warn!(%error, "failed to clear session store");
        }
    }

    /// Read-only summary of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ShellSnapshot {
        let identity = self.identity.current();
        ShellSnapshot {
            view: self.nav.current,
            view_title: self.nav.current.title(),
            selection: self.nav.selection.clone(),
            theme: self.theme,
            is_guest: identity.is_guest(),
            login_count: identity.login_count,
            user_name: identity.name,
            admin_authenticated: self.admin.is_authenticated(),
            latest_content_id: self.latest_content_id,
            has_new_content: self.has_new_content,
            event_count: self.analytics.len(),
            roster_size: self.identity.roster().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::PayloadValue;
    use crate::keys;
    use chrono::{TimeZone, Utc};
    use portal_core::event::{KeyCode, Modifiers};
    use portal_runtime::{ManualClock, StoreTier};

    fn shell() -> (PortalShell, Arc<Store>, Arc<Store>) {
        let durable = Store::in_memory(StoreTier::Durable).shared();
        let session = Store::in_memory(StoreTier::Session).shared();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap(),
        ));
        let shell = PortalShell::new(Arc::clone(&durable), Arc::clone(&session), clock);
        (shell, durable, session)
    }

    fn names(shell: &PortalShell) -> Vec<String> {
        shell.events().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn bootstrap_records_home_once() {
        let (mut shell, _, _) = shell();
        assert_eq!(shell.bootstrap(), ReconcileOutcome::NoIdentity);
        assert_eq!(shell.bootstrap(), ReconcileOutcome::AlreadyReconciled);
        assert_eq!(names(&shell), vec!["home"]);
        assert_eq!(shell.current_view(), ViewId::Home);
    }

    #[test]
    fn bootstrap_restores_theme() {
        let (mut shell, durable, _) = shell();
        durable.set_raw(keys::THEME, "dark");
        shell.bootstrap();
        assert_eq!(shell.theme(), Theme::Dark);
    }

    #[test]
    fn bootstrap_attributes_home_to_reconciled_user() {
        let (mut shell, durable, _) = shell();
        durable.set(keys::USER_PROFILE, &Identity::new("Ada", "S-100"));
        shell.bootstrap();
        let events = shell.events();
        assert_eq!(events[0].user_name, "Ada");
        assert_eq!(shell.identity().login_count, 1);
    }

    #[test]
    fn toggle_theme_persists_and_records() {
        let (mut shell, durable, _) = shell();
        shell.bootstrap();
        assert_eq!(shell.toggle_theme(), Theme::Dark);
        assert_eq!(durable.get_raw(keys::THEME).as_deref(), Some("dark"));

        let last = shell.events().pop().unwrap();
        assert_eq!(last.kind, EventKind::FeatureUse);
        assert_eq!(last.name, "toggle_theme");
        assert_eq!(
            last.payload.unwrap().get("newTheme"),
            Some(&PayloadValue::Text("dark".into()))
        );
        assert_eq!(shell.toggle_theme(), Theme::Light);
    }

    #[test]
    fn logout_returns_home_and_keeps_roster() {
        let (mut shell, _, _) = shell();
        shell.bootstrap();
        shell.set_identity(Identity::new("Ada", "S-100"));
        shell.navigate(ViewId::Coding);
        shell.select_topic(TopicSelection::new("t1", "Ownership"));

        shell.logout_user();
        assert!(shell.identity().is_guest());
        assert_eq!(shell.current_view(), ViewId::Home);
        assert!(shell.selection().is_none());
        assert_eq!(shell.roster().len(), 1);

        let last = shell.events().pop().unwrap();
        assert_eq!(last.name, "user_logout");
        assert_eq!(last.user_name, "Ada");
    }

    #[test]
    fn guest_identity_replacement_leaves_restricted_view() {
        let (mut shell, _, _) = shell();
        shell.bootstrap();
        shell.set_identity(Identity::new("Ada", "S-100"));
        shell.navigate(ViewId::Coding);
        shell.select_topic(TopicSelection::new("t1", "Ownership"));

        assert_eq!(shell.set_identity(Identity::guest()), RosterChange::Unchanged);
        assert!(shell.identity().is_guest());
        assert_eq!(shell.current_view(), ViewId::Home);
        assert!(shell.selection().is_none());

        let last = shell.events().pop().unwrap();
        assert_eq!(last.name, "user_logout");
        assert_eq!(last.user_name, "Ada");
    }

    #[test]
    fn admin_flag_lives_in_session() {
        let (mut shell, _, session) = shell();
        shell.bootstrap();
        assert!(!shell.admin_login(false));
        assert!(!session.contains_key(keys::IS_ADMIN_AUTHENTICATED));

        assert!(shell.admin_login(true));
        shell.navigate(ViewId::Admin);
        shell.admin_logout();
        assert!(!shell.is_admin_authenticated());
        assert_eq!(shell.current_view(), ViewId::Home);

        shell.admin_login(true);
        shell.end_session();
        assert!(!shell.is_admin_authenticated());
    }

    #[test]
    fn content_updates_drive_the_indicator() {
        let (mut shell, _, _) = shell();
        shell.bootstrap();
        assert!(!shell.has_new_content());
        assert!(shell.update_content_ids([2, 5, 3]));
        assert!(shell.is_notification_fresh(5));
    }

    #[test]
    fn shortcut_respects_focus() {
        let (mut shell, _, _) = shell();
        shell.bootstrap();
        shell.set_identity(Identity::new("Ada", "S-100"));
        let alt3 = KeyEvent::new(KeyCode::Char('3')).with_modifiers(Modifiers::ALT);

        assert_eq!(
            shell.handle_key(&alt3, FocusTarget::TextInput),
            KeyDispatch::Ignored
        );
        assert_eq!(shell.current_view(), ViewId::Home);

        assert_eq!(
            shell.handle_key(&alt3, FocusTarget::Document),
            KeyDispatch::Navigate(ViewId::Coding)
        );
        assert_eq!(shell.current_view(), ViewId::Coding);
    }

    #[test]
    fn snapshot_reflects_state() {
        let (mut shell, _, _) = shell();
        shell.bootstrap();
        shell.set_identity(Identity::new("Ada", "S-100"));
        shell.update_content_ids([4]);

        let snap = shell.snapshot();
        assert_eq!(snap.view, ViewId::Home);
        assert_eq!(snap.user_name, "Ada");
        assert!(!snap.is_guest);
        assert!(snap.has_new_content);
        assert_eq!(snap.event_count, 1);
        assert_eq!(snap.roster_size, 1);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["view"], "home");
        assert_eq!(json["viewTitle"], "Home");
        assert_eq!(json["latestContentId"], 4);
    }
}
