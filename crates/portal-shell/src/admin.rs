#![forbid(unsafe_code)]

//! Session-scoped admin authentication flag.
//!
//! The credential check itself belongs to the admin view; this module only
//! remembers its result for the rest of the session. A reload within the
//! session keeps the flag, a new session starts unauthenticated.

use std::sync::Arc;

use portal_runtime::Store;

use crate::keys;

/// Reads and writes `isAdminAuthenticated` in the session tier.
#[derive(Debug, Clone)]
pub struct AdminSession {
    session: Arc<Store>,
}

impl AdminSession {
    /// Create over the session store.
    #[must_use]
    pub fn new(session: Arc<Store>) -> Self {
        Self { session }
    }

    /// Whether the admin credential check passed in this session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session
            .get_as::<bool>(keys::IS_ADMIN_AUTHENTICATED)
            .unwrap_or(false)
    }

    /// Record the result of a credential check.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.session
            .set_raw(keys::IS_ADMIN_AUTHENTICATED, authenticated.to_string());
    }
}
