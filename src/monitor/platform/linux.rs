use anyhow::Result;
use std::process::Command;

/// Lock the session, trying the common lockers in order of preference
pub fn lock_screen() -> Result<()> {
    const LOCKERS: &[(&str, &[&str])] = &[
        // systemd-logind works across desktop environments
        ("loginctl", &["lock-session"]),
        ("xdg-screensaver", &["lock"]),
        ("gnome-screensaver-command", &["--lock"]),
        ("cinnamon-screensaver-command", &["--lock"]),
        ("mate-screensaver-command", &["--lock"]),
        ("xscreensaver-command", &["-lock"]),
        ("light-locker-command", &["--lock"]),
    ];

    for (cmd, args) in LOCKERS {
        if try_command(cmd, args).is_ok() {
            return Ok(());
        }
    }

    anyhow::bail!("No supported screen lock mechanism found on this Linux system")
}

/// Show a critical desktop notification that stays until dismissed
pub fn show_notice(title: &str, message: &str) -> Result<()> {
    try_command(
        "notify-send",
        &["--urgency=critical", "--icon=dialog-warning", title, message],
    )
}

pub fn toast(message: &str) {
    let _ = try_command("notify-send", &["--urgency=low", "app-snitch", message]);
}

/// Try to execute a command, returning Ok if successful
fn try_command(cmd: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(cmd)
        .args(args)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        anyhow::bail!("Command failed: {} {:?}", cmd, args)
    }
}
