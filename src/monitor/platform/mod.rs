//! Platform-specific block presentation

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

use anyhow::{Context, Result};
use std::process::Command;

/// Lock the user's session
pub fn lock_screen() -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        windows::lock_screen()
    }

    #[cfg(target_os = "macos")]
    {
        macos::lock_screen()
    }

    #[cfg(target_os = "linux")]
    {
        linux::lock_screen()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        anyhow::bail!("Unsupported operating system for screen locking")
    }
}

/// Show a prominent, blocking notice to the user
pub fn show_notice(title: &str, message: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        windows::show_notice(title, message)
    }

    #[cfg(target_os = "macos")]
    {
        macos::show_notice(title, message)
    }

    #[cfg(target_os = "linux")]
    {
        linux::show_notice(title, message)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = (title, message);
        anyhow::bail!("Unsupported operating system for notices")
    }
}

/// Show a small transient message; errors are ignored
pub fn toast(message: &str) {
    #[cfg(target_os = "windows")]
    {
        windows::toast(message);
    }

    #[cfg(target_os = "macos")]
    {
        macos::toast(message);
    }

    #[cfg(target_os = "linux")]
    {
        linux::toast(message);
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = message;
    }
}

/// Start `command` without waiting for it to exit
///
/// For modal dialogs that only return once dismissed. The child is reaped on
/// a background thread.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn spawn_detached(command: &mut Command) -> Result<()> {
    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to start {:?}", command.get_program()))?;
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_spawn_detached_does_not_wait() {
        let start = Instant::now();
        spawn_detached(Command::new("sleep").arg("5")).unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_spawn_detached_missing_program() {
        assert!(spawn_detached(&mut Command::new("nonexistent_command_xyz")).is_err());
    }
}
