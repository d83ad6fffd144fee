use tracing::{debug, info};

use crate::monitor::config::MonitorConfig;
use crate::monitor::state::WindowState;

/// A restricted session that ended on the last foreground change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub app_id: String,
    pub credited_minutes: u32,
    pub window_reset: bool,
}

/// What a single foreground change did to the accounting state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundChange {
    /// Whether the newly foregrounded app is restricted
    pub restricted: bool,
    /// The session that this change ended, if any
    pub closed: Option<ClosedSession>,
}

impl ForegroundChange {
    /// Restricted foreground, or the end of a restricted session
    pub fn is_qualifying(&self) -> bool {
        self.restricted || self.closed.is_some()
    }
}

/// Rolling-window usage tracker
///
/// Window resets are only evaluated when a restricted session ends, so a
/// single uninterrupted session can run past the nominal window boundary.
#[derive(Debug, Default)]
pub struct UsageTracker {
    state: WindowState,
}

impl UsageTracker {
    /// Create a tracker with a zeroed window
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `app_id` became the foreground app at `now` (epoch ms)
    pub fn on_foreground_change(
        &mut self,
        config: &MonitorConfig,
        app_id: &str,
        now: i64,
    ) -> ForegroundChange {
        let restricted = config.is_restricted(app_id);

        // Any switch away from the active restricted app ends its session
        let closed = match self.state.active_app() {
            Some(active) if active != app_id => {
                let previous = active.to_string();
                let credited_minutes = self.state.close_session(now);
                let window_reset = self.state.reset_if_expired(now, config.window_minutes);
                if window_reset {
                    info!("Usage window expired, starting a new window");
                }

                Some(ClosedSession {
                    app_id: previous,
                    credited_minutes,
                    window_reset,
                })
            }
            _ => None,
        };

        if restricted {
            if self.state.active_app() != Some(app_id) {
                debug!("Restricted app {} in foreground", app_id);
                self.state.start_session(app_id, now);
            }
        } else {
            self.state.active = None;
        }

        ForegroundChange { restricted, closed }
    }

    /// Minutes used in the window including the open session, without mutating state
    pub fn minutes_used_now(&self, now: i64) -> u32 {
        self.state.minutes_used(now)
    }

    /// Current accounting state
    pub fn state(&self) -> &WindowState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::feed::parse_line;
    use crate::monitor::state::MINUTE_MS;

    fn make_test_config(apps: &[&str]) -> MonitorConfig {
        MonitorConfig {
            restricted_apps: apps.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_switch_away_credits_floored_minutes() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        tracker.on_foreground_change(&config, "x", 0);
        let change = tracker.on_foreground_change(&config, "y", 59_000);
        assert_eq!(change.closed.as_ref().map(|c| c.credited_minutes), Some(0));
        assert_eq!(tracker.state().accumulated_minutes, 0);

        tracker.on_foreground_change(&config, "x", 100 * MINUTE_MS);
        tracker.on_foreground_change(&config, "y", 101 * MINUTE_MS);
        assert_eq!(tracker.state().accumulated_minutes, 1);
    }

    #[test]
    fn test_scenario_a_switch_away_after_thirty_minutes() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        let first = tracker.on_foreground_change(&config, "x", 0);
        assert!(first.restricted);
        assert!(first.closed.is_none());

        let second = tracker.on_foreground_change(&config, "y", 30 * MINUTE_MS);
        assert!(!second.restricted);
        assert!(second.is_qualifying());
        assert_eq!(tracker.state().accumulated_minutes, 30);
        assert_eq!(tracker.minutes_used_now(30 * MINUTE_MS), 30);
        assert!(tracker.state().active_app().is_none());
    }

    #[test]
    fn test_scenario_b_long_session_is_not_reset() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        tracker.on_foreground_change(&config, "x", 0);
        assert_eq!(tracker.minutes_used_now(10 * 60 * MINUTE_MS), 600);
        assert_eq!(tracker.state().accumulated_minutes, 0);
        assert_eq!(tracker.state().window_start, Some(0));
    }

    #[test]
    fn test_scenario_c_prefix_match_credits() {
        let config = make_test_config(&["com.app"]);
        let mut tracker = UsageTracker::new();

        let change = tracker.on_foreground_change(&config, "com.app.extra", 0);
        assert!(change.restricted);

        tracker.on_foreground_change(&config, "launcher", 5 * MINUTE_MS);
        assert_eq!(tracker.state().accumulated_minutes, 5);
    }

    #[test]
    fn test_same_app_again_keeps_session_open() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        tracker.on_foreground_change(&config, "x", 0);
        let change = tracker.on_foreground_change(&config, "x", 10 * MINUTE_MS);
        assert!(change.closed.is_none());
        assert_eq!(tracker.state().active.as_ref().map(|a| a.since), Some(0));
        assert_eq!(tracker.minutes_used_now(20 * MINUTE_MS), 20);
    }

    #[test]
    fn test_switch_between_restricted_apps() {
        let config = make_test_config(&["x", "z"]);
        let mut tracker = UsageTracker::new();

        tracker.on_foreground_change(&config, "x", 0);
        let change = tracker.on_foreground_change(&config, "z", 7 * MINUTE_MS);
        assert!(change.restricted);
        assert_eq!(change.closed.as_ref().map(|c| c.app_id.as_str()), Some("x"));
        assert_eq!(tracker.state().accumulated_minutes, 7);
        assert_eq!(tracker.state().active_app(), Some("z"));
        assert_eq!(tracker.minutes_used_now(10 * MINUTE_MS), 10);
    }

    #[test]
    fn test_unrestricted_switches_do_nothing() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        let change = tracker.on_foreground_change(&config, "y", 0);
        assert!(!change.is_qualifying());
        tracker.on_foreground_change(&config, "w", 90 * MINUTE_MS);
        assert_eq!(tracker.state(), &WindowState::new());
    }

    #[test]
    fn test_window_resets_only_at_session_boundary() {
        let mut config = make_test_config(&["x"]);
        config.window_minutes = 60;
        let mut tracker = UsageTracker::new();

        tracker.on_foreground_change(&config, "x", 0);
        tracker.on_foreground_change(&config, "y", 20 * MINUTE_MS);
        assert_eq!(tracker.state().accumulated_minutes, 20);

        // Session spans the boundary; nothing resets until it ends
        tracker.on_foreground_change(&config, "x", 50 * MINUTE_MS);
        assert_eq!(tracker.minutes_used_now(70 * MINUTE_MS), 40);

        let change = tracker.on_foreground_change(&config, "y", 70 * MINUTE_MS);
        let closed = change.closed.expect("session should close");
        assert_eq!(closed.credited_minutes, 20);
        assert!(closed.window_reset);
        assert_eq!(tracker.state().accumulated_minutes, 0);
        assert_eq!(tracker.state().window_start, Some(70 * MINUTE_MS));
    }

    #[test]
    fn test_accumulation_is_monotonic_within_window() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();
        let mut last = 0;

        for i in 0..20 {
            let base = i * 5 * MINUTE_MS;
            tracker.on_foreground_change(&config, "x", base);
            tracker.on_foreground_change(&config, "y", base + 2 * MINUTE_MS + 30_000);
            let used = tracker.state().accumulated_minutes;
            assert!(used >= last);
            last = used;
        }
        assert_eq!(last, 40);
    }

    #[test]
    fn test_extreme_feed_timestamps_do_not_overflow() {
        let config = make_test_config(&["x"]);
        let mut tracker = UsageTracker::new();

        let first = parse_line("x -9223372036854775808", 0).unwrap().unwrap();
        let second = parse_line("y 9223372036854775807", 0).unwrap().unwrap();

        tracker.on_foreground_change(&config, &first.app_id, first.timestamp);
        assert_eq!(tracker.minutes_used_now(second.timestamp), u32::MAX);

        let change = tracker.on_foreground_change(&config, &second.app_id, second.timestamp);
        let closed = change.closed.expect("session should close");
        assert_eq!(closed.credited_minutes, u32::MAX);
        assert!(closed.window_reset);
        assert_eq!(tracker.state().accumulated_minutes, 0);
    }
}
