#![forbid(unsafe_code)]

//! Client-state coordination for the learning portal.
//!
//! [`PortalShell`] is the entry point: it owns the active view, theme,
//! identity, admin flag, and new-content indicator, and is the only writer
//! of the persisted keys listed in [`keys`]. The supporting modules are
//! usable on their own:
//!
//! - [`navigation`]: the pure view transition and its effects
//! - [`identity`]: active identity, roster, startup reconciliation
//! - [`analytics`]: the bounded event log
//! - [`notifications`]: new-content freshness
//! - [`keymap`]: Alt+1..8 view shortcuts

pub mod admin;
pub mod analytics;
pub mod command;
pub mod config;
pub mod identity;
pub mod keymap;
pub mod keys;
pub mod navigation;
pub mod notifications;
pub mod shell;
pub mod theme;
pub mod view;

pub use analytics::{AnalyticsEvent, EventKind, MAX_ANALYTICS_EVENTS, Payload, PayloadValue};
pub use identity::{Identity, ReconcileOutcome, Roster, RosterChange};
pub use shell::{PortalShell, ShellSnapshot};
pub use theme::Theme;
pub use view::ViewId;
