#![forbid(unsafe_code)]

//! The portal's fixed set of views.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies which view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    /// Landing page.
    #[default]
    Home,
    /// Subject files by year and semester.
    Resources,
    /// Coding topics, with an optional drilled-into topic.
    Coding,
    /// News articles; owns the new-content notification.
    News,
    /// Bookmarked items.
    Saved,
    /// Team and project information.
    About,
    /// Content administration (guarded by its own credential check).
    Admin,
    /// The user's profile and identity entry.
    Profile,
}

impl ViewId {
    /// All views in menu order. Alt+1..8 follow this order.
    pub const ALL: &[ViewId] = &[
        Self::Home,
        Self::Resources,
        Self::Coding,
        Self::News,
        Self::Saved,
        Self::About,
        Self::Admin,
        Self::Profile,
    ];

    /// Views a guest is redirected away from.
    pub const RESTRICTED: &[ViewId] = &[Self::Resources, Self::Coding, Self::News];

    /// 0-based index in the ALL array.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&v| v == self).unwrap_or(0)
    }

    /// Stable lower-case key, used in analytics names and scripts.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Resources => "resources",
            Self::Coding => "coding",
            Self::News => "news",
            Self::Saved => "saved",
            Self::About => "about",
            Self::Admin => "admin",
            Self::Profile => "profile",
        }
    }

    /// Title for menus and headers.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Resources => "Resources",
            Self::Coding => "Coding",
            Self::News => "News",
            Self::Saved => "Saved Items",
            Self::About => "About",
            Self::Admin => "Admin",
            Self::Profile => "Profile",
        }
    }

    /// Whether guests are redirected to the profile view instead.
    pub fn is_restricted(self) -> bool {
        Self::RESTRICTED.contains(&self)
    }

    /// Whether this view owns the transient topic selection.
    pub const fn owns_selection(self) -> bool {
        matches!(self, Self::Coding)
    }

    /// Whether this view owns the new-content notification.
    pub const fn owns_notifications(self) -> bool {
        matches!(self, Self::News)
    }

    /// Look up a view by key, case-insensitively.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.key().eq_ignore_ascii_case(key))
    }

    /// Look up a view by key; unknown names fall back to [`ViewId::Home`].
    pub fn parse_lossy(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            tracing::debug!(requested = key, "unknown view, falling back to home");
            Self::Home
        })
    }

    /// Map a digit key to a view: '1'..='8' select by menu position.
    pub fn from_digit(ch: char) -> Option<Self> {
        let idx = ch.to_digit(10)? as usize;
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
