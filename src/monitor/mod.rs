//! Restricted-app usage monitor
//!
//! This module provides functionality to:
//! - Load the restricted-app configuration
//! - Account restricted foreground time over a rolling window
//! - Block the user once the allowance is used up
//! - Notify the accountability partner without stalling event handling

pub mod blocker;
pub mod config;
pub mod enforcement;
pub mod feed;
pub mod notifier;
pub mod platform;
pub mod state;
pub mod tracker;

pub use blocker::{BlockAction, LogBlocker, ScreenBlocker};
pub use config::{ConfigSource, FileConfigSource};
pub use enforcement::{Decision, UsageMonitor};
pub use notifier::{LogNotifier, Notifier, SnitchDispatcher};
