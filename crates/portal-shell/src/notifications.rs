#![forbid(unsafe_code)]

//! New-content freshness against a persisted "last seen" marker.
//!
//! Content identifiers only grow. Content is fresh while the largest known
//! id is greater than the marker. The marker moves only through
//! [`FreshnessTracker::acknowledge`], which the shell calls when the user
//! navigates into the view that owns the content.

use std::sync::Arc;

use portal_runtime::Store;

use crate::keys;

/// Largest id in a content collection, or 0 when empty.
#[must_use]
pub fn latest_content_id<I: IntoIterator<Item = u64>>(ids: I) -> u64 {
    ids.into_iter().max().unwrap_or(0)
}

/// Reads and writes the `lastSeenArticleId` marker.
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
    durable: Arc<Store>,
}

impl FreshnessTracker {
    /// Create a tracker over the durable store.
    #[must_use]
    pub fn new(durable: Arc<Store>) -> Self {
        Self { durable }
    }

    /// The acknowledged marker; 0 when absent or unreadable.
    #[must_use]
    pub fn last_seen(&self) -> u64 {
        let Some(raw) = self.durable.get_raw(keys::LAST_SEEN_ARTICLE_ID) else {
            return 0;
        };
        // Stored as an integer string; tolerate a JSON-quoted one too.
        let trimmed = raw.trim().trim_matches('"');
        trimmed.parse::<u64>().unwrap_or_else(|_| {
            tracing::debug!(raw = %raw, "unreadable last-seen marker, treating as 0");
            0
        })
    }

    /// Whether `latest` has not been acknowledged yet.
    #[must_use]
    pub fn is_fresh(&self, latest: u64) -> bool {
        latest > self.last_seen()
    }

    /// Persist `latest` as the acknowledged marker.
    pub fn acknowledge(&self, latest: u64) {
        self.durable
            .set_raw(keys::LAST_SEEN_ARTICLE_ID, latest.to_string());
        tracing::debug!(latest, "acknowledged content");
    }
}
