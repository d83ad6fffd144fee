use anyhow::Result;
use tracing::{info, warn};

use crate::monitor::config::BlockMode;
use crate::monitor::platform;

/// A threshold crossing, as seen by the side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Restricted app that used up the allowance
    pub app_id: String,
    pub minutes_used: u32,
    pub minutes_allowed: u32,
    pub block_mode: BlockMode,
}

/// Presents a block to the user
///
/// Invoked synchronously and never awaited for a result: implementations
/// swallow their own failures.
pub trait BlockAction {
    fn show(&self, violation: &Violation);
}

/// Blocks using the desktop's notice and lock facilities
#[derive(Debug, Default)]
pub struct ScreenBlocker;

impl ScreenBlocker {
    pub fn new() -> Self {
        Self
    }

    fn try_show(&self, violation: &Violation) -> Result<()> {
        match violation.block_mode {
            BlockMode::Overlay => {
                let message = format!(
                    "You have used {} of {} minutes on {}. Put it down.",
                    violation.minutes_used, violation.minutes_allowed, violation.app_id
                );
                platform::show_notice("Time limit reached", &message).or_else(|e| {
                    warn!("Could not show block notice ({:#}), locking instead", e);
                    platform::lock_screen()
                })
            }
            BlockMode::Lock => platform::lock_screen(),
            BlockMode::None => Ok(()),
        }
    }
}

impl BlockAction for ScreenBlocker {
    fn show(&self, violation: &Violation) {
        match self.try_show(violation) {
            Ok(()) => info!(
                "Blocked {} ({:?}) at {} min",
                violation.app_id, violation.block_mode, violation.minutes_used
            ),
            Err(e) => {
                warn!("Could not show block screen: {:#}", e);
                platform::toast("Could not show block screen");
            }
        }
    }
}

/// Only logs; used for dry runs
#[derive(Debug, Default)]
pub struct LogBlocker;

impl BlockAction for LogBlocker {
    fn show(&self, violation: &Violation) {
        info!(
            "[DRY RUN] Would block {} ({} of {} min used)",
            violation.app_id, violation.minutes_used, violation.minutes_allowed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_mode_none_never_fails() {
        let violation = Violation {
            app_id: "x".to_string(),
            minutes_used: 31,
            minutes_allowed: 30,
            block_mode: BlockMode::None,
        };
        assert!(ScreenBlocker::new().try_show(&violation).is_ok());
    }

    #[test]
    fn test_log_blocker_is_silent() {
        let violation = Violation {
            app_id: "x".to_string(),
            minutes_used: 31,
            minutes_allowed: 30,
            block_mode: BlockMode::Lock,
        };
        LogBlocker.show(&violation);
    }
}
