#![forbid(unsafe_code)]

//! User identity lifecycle: the active identity, the roster of known users,
//! and the once-per-session login reconciliation.
//!
//! # Invariants
//!
//! - Exactly one identity is active. [`Identity::guest`] stands for "not
//!   logged in" and never enters the roster.
//! - The active identity is replaced wholesale; nothing patches single
//!   fields of the stored record. Whichever of reconciliation, login, or
//!   logout writes last wins.
//! - The roster holds at most one entry per `idNumber`.
//! - A login is counted at most once per process and once per session.
//!
//! Identity and roster live under separate keys. Updating both is two
//! sequential writes, not a transaction. The roster is written only after
//! the identity write succeeded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_runtime::{Clock, Store};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::keys;

/// Display name of the sentinel identity.
pub const GUEST_NAME: &str = "Guest";

/// Academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Year {
    /// First year.
    #[serde(rename = "1st year")]
    First,
    /// Second year.
    #[serde(rename = "2nd year")]
    Second,
    /// Third year.
    #[serde(rename = "3rd year")]
    Third,
    /// Fourth year.
    #[serde(rename = "4th year")]
    Fourth,
}

/// The active user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Academic year, if set.
    #[serde(default)]
    pub year: Option<Year>,
    /// Stable identifier; empty for the guest.
    #[serde(default)]
    pub id_number: String,
    /// Interest tags.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Profile image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// When the last counted login happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    /// Number of counted logins.
    #[serde(default)]
    pub login_count: u32,
}

impl Identity {
    /// The sentinel "not logged in" identity.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            name: GUEST_NAME.to_string(),
            year: None,
            id_number: String::new(),
            interests: Vec::new(),
            profile_picture: None,
            last_login: None,
            login_count: 0,
        }
    }

    /// A new identity with the given name and identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, id_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_number: id_number.into(),
            ..Self::guest()
        }
    }

    /// Set the academic year.
    #[must_use]
    pub fn with_year(mut self, year: Year) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the interest tags.
    #[must_use]
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    /// Set the login counter.
    #[must_use]
    pub fn with_login_count(mut self, count: u32) -> Self {
        self.login_count = count;
        self
    }

    /// Whether this is the sentinel identity (named "Guest", or unnamed).
    #[must_use]
    pub fn is_guest(&self) -> bool {
        let name = self.name.trim();
        name.is_empty() || name == GUEST_NAME
    }

    /// The record produced by counting one more login at `at`.
    #[must_use]
    pub fn counted_login(&self, at: DateTime<Utc>) -> Self {
        Self {
            login_count: self.login_count.saturating_add(1),
            last_login: Some(at),
            ..self.clone()
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::guest()
    }
}

/// What a roster update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    /// An entry with the same identifier was replaced.
    Replaced,
    /// A new entry was appended.
    Inserted,
    /// Nothing changed (guest, empty identifier, or unknown id on a
    /// replace-only update).
    Unchanged,
}

/// One stored roster element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Slot {
    Known(Identity),
    /// An element this build cannot decode, kept verbatim.
    Opaque(Value),
}

impl Slot {
    fn id_number(&self) -> Option<&str> {
        match self {
            Self::Known(identity) => Some(identity.id_number.as_str()),
            Self::Opaque(value) => value.get("idNumber").and_then(Value::as_str),
        }
    }
}

/// Previously seen non-guest identities, unique by identifier.
///
/// Stored elements that do not decode as an [`Identity`] are kept in place
/// and written back unchanged, so one bad record never costs the others.
/// A later update with the same `idNumber` replaces such an element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    slots: Vec<Slot>,
}

impl Roster {
    /// Build a roster, dropping guests, blank identifiers, and later
    /// duplicates of an identifier.
    #[must_use]
    pub fn from_entries(entries: Vec<Identity>) -> Self {
        let mut roster = Self::default();
        for identity in entries {
            roster.push_decoded(identity);
        }
        roster
    }

    /// Build a roster from stored JSON elements, decoding each on its own.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut roster = Self::default();
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<Identity>(value.clone()) {
                Ok(identity) => roster.push_decoded(identity),
                Err(error) => {
                    tracing::debug!(index, %error, "keeping undecodable roster entry as-is");
                    roster.slots.push(Slot::Opaque(value));
                }
            }
        }
        roster
    }

    fn push_decoded(&mut self, identity: Identity) {
        if Self::eligible(&identity) && self.position(&identity.id_number).is_none() {
            self.slots.push(Slot::Known(identity));
        }
    }

    /// Decoded entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Identity> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Known(identity) => Some(identity),
            Slot::Opaque(_) => None,
        })
    }

    /// Number of stored elements, including undecodable ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of elements kept verbatim because they do not decode.
    #[must_use]
    pub fn undecoded(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Opaque(_)))
            .count()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entry with the given identifier.
    #[must_use]
    pub fn find(&self, id_number: &str) -> Option<&Identity> {
        self.entries().find(|u| u.id_number == id_number)
    }

    /// Replace the element with a matching identifier; never inserts.
    pub fn replace_existing(&mut self, identity: &Identity) -> RosterChange {
        if !Self::eligible(identity) {
            return RosterChange::Unchanged;
        }
        match self.position(&identity.id_number) {
            Some(index) => {
                self.slots[index] = Slot::Known(identity.clone());
                RosterChange::Replaced
            }
            None => RosterChange::Unchanged,
        }
    }

    /// Replace the element with a matching identifier, or append.
    pub fn upsert(&mut self, identity: &Identity) -> RosterChange {
        if !Self::eligible(identity) {
            return RosterChange::Unchanged;
        }
        match self.replace_existing(identity) {
            RosterChange::Replaced => RosterChange::Replaced,
            _ => {
                self.slots.push(Slot::Known(identity.clone()));
                RosterChange::Inserted
            }
        }
    }

    fn position(&self, id_number: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.id_number() == Some(id_number))
    }

    fn eligible(identity: &Identity) -> bool {
        !identity.is_guest() && !identity.id_number.trim().is_empty()
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.slots)
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Value>::deserialize(deserializer).map(Self::from_values)
    }
}

/// Result of the startup reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The pass already ran in this process; nothing was done.
    AlreadyReconciled,
    /// No identity is persisted (or it does not decode).
    NoIdentity,
    /// The persisted identity is the guest.
    Guest,
    /// This session's login was already counted by an earlier load.
    SessionAlreadyCounted(Identity),
    /// The counted identity could not be persisted. Neither the roster nor
    /// the session marker was touched, so a later load counts again.
    WriteFailed,
    /// The login was counted; carries the updated identity.
    Reconciled {
        /// The identity as persisted after counting.
        identity: Identity,
        /// Whether a roster entry was replaced.
        roster: RosterChange,
    },
}

/// Owner of every write to the identity and roster keys.
#[derive(Debug)]
pub struct IdentityManager {
    durable: Arc<Store>,
    session: Arc<Store>,
    clock: Arc<dyn Clock>,
    reconciled: bool,
}

impl IdentityManager {
    /// Create a manager over the two store tiers.
    #[must_use]
    pub fn new(durable: Arc<Store>, session: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            durable,
            session,
            clock,
            reconciled: false,
        }
    }

    /// The active identity; the guest when nothing usable is stored.
    #[must_use]
    pub fn current(&self) -> Identity {
        self.durable
            .get_as::<Identity>(keys::USER_PROFILE)
            .unwrap_or_else(Identity::guest)
    }

    /// The roster of known users.
    #[must_use]
    pub fn roster(&self) -> Roster {
        self.durable.get_or_default(keys::ALL_USERS)
    }

    /// Whether the startup pass has run in this process.
    #[must_use]
    pub fn has_reconciled(&self) -> bool {
        self.reconciled
    }

    /// Count this load as a login for a persisted non-guest identity.
    ///
    /// Runs at most once per manager. The session tier records that the
    /// session was counted, so reloads within one session do not count again.
    /// The roster entry with the same identifier, if any, is replaced with
    /// the updated record; unknown identities are not added here.
    pub fn reconcile_startup(&mut self) -> ReconcileOutcome {
        if self.reconciled {
            tracing::debug!("identity reconciliation already ran in this process");
            return ReconcileOutcome::AlreadyReconciled;
        }
        self.reconciled = true;

        let Some(stored) = self.durable.get_as::<Identity>(keys::USER_PROFILE) else {
            return ReconcileOutcome::NoIdentity;
        };
        if stored.is_guest() {
            return ReconcileOutcome::Guest;
        }
        if self.session_counted() {
            tracing::debug!(user = %stored.name, "login already counted for this session");
            return ReconcileOutcome::SessionAlreadyCounted(stored);
        }

        let updated = stored.counted_login(self.clock.now());
        if let Err(error) = self.durable.try_set(keys::USER_PROFILE, &updated) {
            tracing::warn!(user = %updated.name, %error, "failed to persist counted login");
            return ReconcileOutcome::WriteFailed;
        }

        let mut roster = self.roster();
        let change = roster.replace_existing(&updated);
        if change == RosterChange::Replaced {
            self.durable.set(keys::ALL_USERS, &roster);
        }
        self.session.set_raw(keys::IDENTITY_RECONCILED, "true");

        tracing::info!(
            user = %updated.name,
            login_count = updated.login_count,
            roster = ?change,
            "reconciled persisted identity"
        );
        ReconcileOutcome::Reconciled {
            identity: updated,
            roster: change,
        }
    }

    /// Make `identity` the active identity and record it in the roster.
    ///
    /// Logging in as the guest is a logout. When the identity cannot be
    /// persisted the roster is left alone.
    pub fn login(&mut self, identity: Identity) -> RosterChange {
        if identity.is_guest() {
            self.logout();
            return RosterChange::Unchanged;
        }

        if let Err(error) = self.durable.try_set(keys::USER_PROFILE, &identity) {
            tracing::warn!(user = %identity.name, %error, "failed to persist identity");
            return RosterChange::Unchanged;
        }
        let mut roster = self.roster();
        let change = roster.upsert(&identity);
        if change != RosterChange::Unchanged {
            self.durable.set(keys::ALL_USERS, &roster);
        }

        tracing::info!(user = %identity.name, roster = ?change, "identity set");
        change
    }

    /// Same as [`login`](Self::login); the name the identity-entry view uses.
    pub fn set_identity(&mut self, identity: Identity) -> RosterChange {
        self.login(identity)
    }

    /// Replace the active identity with the guest. The roster is untouched.
    pub fn logout(&mut self) {
        let previous = self.current();
        self.durable.set(keys::USER_PROFILE, &Identity::guest());
        tracing::info!(user = %previous.name, "identity cleared");
    }

    fn session_counted(&self) -> bool {
        self.session
            .get_as::<bool>(keys::IDENTITY_RECONCILED)
            .unwrap_or(false)
    }
}
