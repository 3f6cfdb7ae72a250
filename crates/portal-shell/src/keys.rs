//! Persisted key layout.

/// Durable: `"light"` or `"dark"`, stored as a bare string.
pub const THEME: &str = "theme";
/// Durable: the active identity as JSON.
pub const USER_PROFILE: &str = "userProfile";
/// Durable: the roster as a JSON array.
pub const ALL_USERS: &str = "allUsers";
/// Durable: the analytics log as a JSON array, capped.
pub const USER_ANALYTICS: &str = "userAnalytics";
/// Durable: last acknowledged content id, as an integer string.
pub const LAST_SEEN_ARTICLE_ID: &str = "lastSeenArticleId";

/// Session: `"true"` once the admin credential check passed this session.
pub const IS_ADMIN_AUTHENTICATED: &str = "isAdminAuthenticated";
/// Session: `"true"` once this session's login has been counted.
pub const IDENTITY_RECONCILED: &str = "identityReconciled";
