use std::sync::Arc;
use tracing::{debug, info};

use crate::monitor::blocker::{BlockAction, Violation};
use crate::monitor::config::{ConfigSource, MonitorConfig};
use crate::monitor::feed::ForegroundEvent;
use crate::monitor::notifier::{Notifier, SnitchReport, SnitchRequest};
use crate::monitor::tracker::UsageTracker;

/// Outcome of handling one foreground event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No restricted apps configured, even after a reload
    NotConfigured,
    /// Neither restricted nor ending a restricted session
    Ignored,
    /// Within the allowance
    Allowed { minutes_used: u32 },
    /// At or over the allowance; block and notify were triggered
    Enforced { minutes_used: u32 },
}

/// Usage monitor: owns the window tracker and decides when to enforce
///
/// Events are handled one at a time to completion. There is no latch: every
/// qualifying event while over the allowance triggers block and notify again.
pub struct UsageMonitor {
    source: Box<dyn ConfigSource>,
    config: Arc<MonitorConfig>,
    tracker: UsageTracker,
    blocker: Box<dyn BlockAction>,
    notifier: Box<dyn Notifier>,
}

impl UsageMonitor {
    /// Create a monitor from a snapshot already loaded from `source`
    pub fn with_config(
        source: Box<dyn ConfigSource>,
        config: MonitorConfig,
        blocker: Box<dyn BlockAction>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            config: Arc::new(config),
            tracker: UsageTracker::new(),
            blocker,
            notifier,
        }
    }

    /// Current accounting state
    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    /// Replace the configuration snapshot with a fresh load
    pub fn reload_config(&mut self) {
        self.config = Arc::new(self.source.load());
    }

    pub fn handle_event(&mut self, event: &ForegroundEvent) -> Decision {
        self.on_foreground_change(&event.app_id, event.timestamp)
    }

    /// Account for `app_id` becoming the foreground app at `now` and enforce
    pub fn on_foreground_change(&mut self, app_id: &str, now: i64) -> Decision {
        if !self.config.is_configured() {
            self.reload_config();
            if !self.config.is_configured() {
                debug!("No restricted apps configured, ignoring {}", app_id);
                return Decision::NotConfigured;
            }
        }

        let config = Arc::clone(&self.config);
        let change = self.tracker.on_foreground_change(&config, app_id, now);
        if let Some(closed) = &change.closed {
            debug!(
                "Session on {} ended: +{} min{}",
                closed.app_id,
                closed.credited_minutes,
                if closed.window_reset { ", window reset" } else { "" }
            );
        }
        if !change.is_qualifying() {
            return Decision::Ignored;
        }

        let minutes_used = self.tracker.minutes_used_now(now);
        if minutes_used < config.minutes_allowed {
            return Decision::Allowed { minutes_used };
        }

        // A switch-away is charged to the app whose session just ended
        let offending_app = match &change.closed {
            Some(closed) if !change.restricted => closed.app_id.clone(),
            _ => app_id.to_string(),
        };

        info!(
            "Limit reached: {} of {} minutes used (last app: {})",
            minutes_used, config.minutes_allowed, offending_app
        );

        let violation = Violation {
            app_id: offending_app,
            minutes_used,
            minutes_allowed: config.minutes_allowed,
            block_mode: config.block_action,
        };
        self.blocker.show(&violation);
        self.notify(&config, &violation);

        Decision::Enforced { minutes_used }
    }

    /// Minutes used in the current window, including any open session
    pub fn minutes_used_now(&self, now: i64) -> u32 {
        self.tracker.minutes_used_now(now)
    }

    fn notify(&self, config: &MonitorConfig, violation: &Violation) {
        let Some(target) = &config.notify else {
            debug!("No notification target configured, skipping notify");
            return;
        };

        self.notifier.send(SnitchReport {
            endpoint: target.endpoint.clone(),
            request: SnitchRequest {
                user_id: target.user_id.clone(),
                app_name: Some(
                    config
                        .app_name
                        .clone()
                        .unwrap_or_else(|| violation.app_id.clone()),
                ),
                shame_message: config.shame_message.clone(),
            },
        });
    }
}
