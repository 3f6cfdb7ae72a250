#![forbid(unsafe_code)]

//! Bounded analytics event log.
//!
//! Events are appended to the durable `userAnalytics` list. The log keeps
//! the most recent [`MAX_ANALYTICS_EVENTS`] entries; older ones are evicted
//! first and the order of the retained suffix is preserved.
//!
//! Recording never fails the caller. A storage error is logged and the
//! event is dropped; navigation carries on.
//!
//! The log is appended to as raw JSON. Entries this build cannot type are
//! carried along untouched and only leave the log through eviction.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_runtime::clock::iso_timestamp;
use portal_runtime::{Clock, Store};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::identity::{GUEST_NAME, Identity};
use crate::keys;

/// Maximum number of retained events.
pub const MAX_ANALYTICS_EVENTS: usize = 200;

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A view was entered.
    #[serde(rename = "pageView")]
    PageView,
    /// A feature was used.
    #[serde(rename = "featureUse")]
    FeatureUse,
}

impl EventKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "pageView",
            Self::FeatureUse => "featureUse",
        }
    }

    /// Parse a wire name (also accepts `page-view` / `feature-use`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "pageView" | "page-view" | "page_view" => Some(Self::PageView),
            "featureUse" | "feature-use" | "feature_use" => Some(Self::FeatureUse),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload value.
///
/// Recorders produce the primitive kinds. Stored logs may also hold arrays,
/// objects or null written by other clients; those decode as `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Finite float.
    Float(f64),
    /// Text.
    Text(String),
    /// Any other JSON value, kept verbatim.
    Structured(Value),
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for PayloadValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Rejected payload entries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// Keys must contain at least one non-whitespace character.
    #[error("payload key must not be empty")]
    EmptyKey,
    /// NaN and infinities do not survive JSON.
    #[error("payload value for `{0}` is not a finite number")]
    NonFinite(String),
}

/// Free-form event payload: string keys to primitive values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, PayloadValue>);

impl Payload {
    /// An empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert one entry.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Result<(), PayloadError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(PayloadError::EmptyKey);
        }
        let value = value.into();
        if let PayloadValue::Float(f) = value
            && !f.is_finite()
        {
            return Err(PayloadError::NonFinite(key));
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Result<Self, PayloadError> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Event name (a view key, or a feature name).
    pub name: String,
    /// When the event was recorded, millisecond precision on the wire.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Display name of the acting user at record time.
    #[serde(default = "guest_name")]
    pub user_name: String,
    /// Optional payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

fn serialize_timestamp<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&iso_timestamp(*at))
}

fn guest_name() -> String {
    GUEST_NAME.to_string()
}

/// Appends events to the durable log.
#[derive(Debug, Clone)]
pub struct AnalyticsLogger {
    durable: Arc<Store>,
    clock: Arc<dyn Clock>,
    cap: usize,
}

impl AnalyticsLogger {
    /// Create a logger capped at [`MAX_ANALYTICS_EVENTS`].
    #[must_use]
    pub fn new(durable: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            durable,
            clock,
            cap: MAX_ANALYTICS_EVENTS,
        }
    }

    /// Retained-event cap.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Record an event and return it.
    ///
    /// The event is stamped with the stored identity's display name (or
    /// "Guest") and the clock's current time.
    pub fn record(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        payload: Option<Payload>,
    ) -> AnalyticsEvent {
        let mut entries = self.raw_entries();

        let user_name = self
            .durable
            .get_as::<Identity>(keys::USER_PROFILE)
            .map(|u| u.name)
            .unwrap_or_else(guest_name);

        let event = AnalyticsEvent {
            kind,
            name: name.into(),
            timestamp: self.clock.now(),
            user_name,
            payload: payload.filter(|p| !p.is_empty()),
        };

        let encoded = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    kind = %event.kind,
                    name = %event.name,
                    %error,
                    "failed to encode analytics event"
                );
                return event;
            }
        };
        entries.push(encoded);
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }

        if let Err(error) = self.durable.try_set(keys::USER_ANALYTICS, &entries) {
            tracing::warn!(
                kind = %event.kind,
                name = %event.name,
                %error,
                "failed to persist analytics event"
            );
        } else {
            tracing::trace!(kind = %event.kind, name = %event.name, "recorded analytics event");
        }
        event
    }

    /// The stored log, oldest first.
    ///
    /// A log that is not a JSON array reads as empty. Entries that do not
    /// decode as events are skipped here but stay in storage.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.raw_entries()
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(event) => Some(event),
                Err(error) => {
                    tracing::debug!(index, %error, "skipping undecodable analytics entry");
                    None
                }
            })
            .collect()
    }

    /// Number of stored entries, including ones that do not decode.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw_entries().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raw_entries(&self) -> Vec<Value> {
        self.durable.get_or_default(keys::USER_ANALYTICS)
    }

    /// Drop the stored log.
    pub fn clear(&self) {
        self.durable.remove(keys::USER_ANALYTICS);
    }
}
