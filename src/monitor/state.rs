/// Milliseconds in one credited minute
pub const MINUTE_MS: i64 = 60_000;

/// Accounting state for one rolling usage window
///
/// Timestamps are epoch milliseconds. `None` stands for "unset", so a
/// feed whose clock starts at 0 is accounted like any other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    pub window_start: Option<i64>,
    pub accumulated_minutes: u32,
    pub active: Option<ActiveApp>,
}

/// The restricted application currently in the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveApp {
    pub app_id: String,
    pub since: i64,
}

impl WindowState {
    /// Create a zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the restricted app in the foreground, if any
    pub fn active_app(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.app_id.as_str())
    }

    /// Whole minutes elapsed in the open session at `now` (0 if none is open)
    pub fn session_minutes(&self, now: i64) -> u32 {
        self.active
            .as_ref()
            .map_or(0, |active| floor_minutes(now.saturating_sub(active.since)))
    }

    /// Open a session for `app_id`, anchoring the window on the first activation
    pub fn start_session(&mut self, app_id: &str, now: i64) {
        self.active = Some(ActiveApp {
            app_id: app_id.to_string(),
            since: now,
        });
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
    }

    /// Close the open session and credit its whole minutes; returns the credit
    pub fn close_session(&mut self, now: i64) -> u32 {
        let credited = self.session_minutes(now);
        self.accumulated_minutes = self.accumulated_minutes.saturating_add(credited);
        self.active = None;
        credited
    }

    /// Start a fresh window at `now` if the current one has run its length
    ///
    /// Returns true when a reset happened.
    pub fn reset_if_expired(&mut self, now: i64, window_minutes: u32) -> bool {
        let Some(start) = self.window_start else {
            return false;
        };
        let window_ms = i64::from(window_minutes) * MINUTE_MS;
        if now.saturating_sub(start) >= window_ms {
            self.window_start = Some(now);
            self.accumulated_minutes = 0;
            true
        } else {
            false
        }
    }

    /// Accumulated minutes plus the open session's whole minutes
    pub fn minutes_used(&self, now: i64) -> u32 {
        self.accumulated_minutes
            .saturating_add(self.session_minutes(now))
    }
}

/// Floor a millisecond span to whole minutes; negative spans credit nothing
pub fn floor_minutes(elapsed_ms: i64) -> u32 {
    if elapsed_ms <= 0 {
        return 0;
    }
    u32::try_from(elapsed_ms / MINUTE_MS).unwrap_or(u32::MAX)
}
