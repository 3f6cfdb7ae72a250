//! Property-based invariant tests for the analytics log, freshness, and
//! navigation gating.
//!
//! 1. The log holds exactly min(n, 200) events after n records.
//! 2. The retained events are the most recent ones, in record order.
//! 3. Acknowledging clears freshness until a larger id appears.
//! 4. A guest never ends a navigation on a restricted view.

use std::sync::Arc;

use portal_runtime::{Clock, ManualClock, Store, StoreTier};
use portal_shell::analytics::AnalyticsLogger;
use portal_shell::notifications::FreshnessTracker;
use portal_shell::{EventKind, MAX_ANALYTICS_EVENTS, PortalShell, ViewId};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn logger() -> AnalyticsLogger {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(chrono::Utc::now()));
    AnalyticsLogger::new(Store::in_memory(StoreTier::Durable).shared(), clock)
}

fn view_strategy() -> impl Strategy<Value = ViewId> {
    (0usize..ViewId::ALL.len()).prop_map(|i| ViewId::ALL[i])
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Cap and eviction order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn log_keeps_most_recent_in_order(n in 0usize..420) {
        let logger = logger();
        for i in 1..=n {
            logger.record(EventKind::FeatureUse, format!("e{i}"), None);
        }

        let names: Vec<String> = logger.events().into_iter().map(|e| e.name).collect();
        let kept = n.min(MAX_ANALYTICS_EVENTS);
        prop_assert_eq!(names.len(), kept);

        let expected: Vec<String> = (n - kept + 1..=n).map(|i| format!("e{i}")).collect();
        prop_assert_eq!(names, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Acknowledgment
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn acknowledge_clears_until_newer(latest in 0u64..10_000, later in 0u64..10_000) {
        let tracker = FreshnessTracker::new(Store::in_memory(StoreTier::Durable).shared());
        tracker.acknowledge(latest);
        tracker.acknowledge(latest);
        prop_assert_eq!(tracker.last_seen(), latest);
        prop_assert!(!tracker.is_fresh(latest));
        prop_assert_eq!(tracker.is_fresh(later), later > latest);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Gating
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn guest_never_lands_on_restricted(path in prop::collection::vec(view_strategy(), 1..24)) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(chrono::Utc::now()));
        let mut shell = PortalShell::new(
            Store::in_memory(StoreTier::Durable).shared(),
            Store::in_memory(StoreTier::Session).shared(),
            clock,
        );
        shell.bootstrap();

        for view in path {
            let t = shell.navigate(view);
            prop_assert!(!t.destination.is_restricted());
            prop_assert!(!shell.current_view().is_restricted());
            if !view.is_restricted() {
                prop_assert_eq!(t.destination, view);
            }
        }
    }
}
