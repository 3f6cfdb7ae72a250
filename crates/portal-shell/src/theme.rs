#![forbid(unsafe_code)]

//! Light/dark theme preference.

use std::fmt;

use portal_runtime::Store;
use serde::{Deserialize, Serialize};

use crate::keys;

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Parse a stored name; accepts the bare or JSON-quoted form.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_matches('"') {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Restore the stored preference, defaulting to light.
    #[must_use]
    pub fn load(durable: &Store) -> Self {
        durable
            .get_raw(keys::THEME)
            .and_then(|raw| Self::from_name(&raw))
            .unwrap_or_default()
    }

    /// Persist as a bare string.
    pub fn save(self, durable: &Store) {
        durable.set_raw(keys::THEME, self.as_str());
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
