#![forbid(unsafe_code)]

//! Pure navigation transition.
//!
//! [`transition`] inspects the current state and decides what a request to
//! enter a view does. It never touches storage: the result is an ordered list
//! of [`Effect`]s that the shell applies in sequence.
//!
//! # Ordering
//!
//! 1. Leaving the coding view drops the transient topic selection.
//! 2. Entering the news view acknowledges fresh content.
//! 3. A guest requesting a restricted view lands on the profile view and a
//!    redirect is recorded. Nothing else happens.
//! 4. Otherwise the view changes and a page view is recorded.
//!
//! Acknowledgment precedes gating, so a guest bounced off the news view
//! still clears the new-content indicator.

use serde::Serialize;

use crate::analytics::{EventKind, Payload};
use crate::view::ViewId;

/// The coding view's drilled-into topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSelection {
    /// Topic identifier.
    pub topic_id: String,
    /// Topic display name.
    pub topic_name: String,
}

impl TopicSelection {
    /// Create a selection.
    #[must_use]
    pub fn new(topic_id: impl Into<String>, topic_name: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            topic_name: topic_name.into(),
        }
    }
}

/// Navigation-owned state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
    /// The active view.
    pub current: ViewId,
    /// Transient selection inside the coding view.
    pub selection: Option<TopicSelection>,
}

/// Facts about the rest of the shell that a transition depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavContext {
    /// Whether the active identity is the guest.
    pub is_guest: bool,
    /// Whether unacknowledged content exists.
    pub notifications_fresh: bool,
    /// Largest known content id.
    pub latest_id: u64,
}

/// One side effect of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Drop the coding topic selection.
    ClearSelection,
    /// Persist the given id as the last seen content.
    AcknowledgeNotifications(u64),
    /// Make the given view active.
    SetView(ViewId),
    /// Append an analytics event.
    Record {
        /// Event kind.
        kind: EventKind,
        /// Event name.
        name: String,
        /// Optional payload.
        payload: Option<Payload>,
    },
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The view that ends up active.
    pub destination: ViewId,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Whether the request was redirected elsewhere.
    #[must_use]
    pub fn redirected_from(&self, requested: ViewId) -> bool {
        self.destination != requested
    }
}

/// Name of the redirect event recorded when a guest is bounced off `view`.
#[must_use]
pub fn redirect_event_name(view: ViewId) -> String {
    format!("profile_redirect_from_{}", view.key())
}

/// Decide what entering `requested` does.
#[must_use]
pub fn transition(state: &NavState, ctx: &NavContext, requested: ViewId) -> Transition {
    let mut effects = Vec::with_capacity(4);

    if !requested.owns_selection() && state.selection.is_some() {
        effects.push(Effect::ClearSelection);
    }

    if requested.owns_notifications() && ctx.notifications_fresh {
        effects.push(Effect::AcknowledgeNotifications(ctx.latest_id));
    }

    if requested.is_restricted() && ctx.is_guest {
        effects.push(Effect::SetView(ViewId::Profile));
        effects.push(Effect::Record {
            kind: EventKind::FeatureUse,
            name: redirect_event_name(requested),
            payload: Payload::new().with("from", requested.key()).ok(),
        });
        return Transition {
            destination: ViewId::Profile,
            effects,
        };
    }

    effects.push(Effect::SetView(requested));
    effects.push(Effect::Record {
        kind: EventKind::PageView,
        name: requested.key().to_string(),
        payload: None,
    });
    Transition {
        destination: requested,
        effects,
    }
}
