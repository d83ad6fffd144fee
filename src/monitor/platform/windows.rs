use anyhow::Result;
use std::process::Command;

/// Lock the workstation
pub fn lock_screen() -> Result<()> {
    run("rundll32.exe", &["user32.dll,LockWorkStation"])
}

/// Show a message box on the current session
pub fn show_notice(title: &str, message: &str) -> Result<()> {
    let text = format!("{}: {}", title, message);
    run("msg.exe", &["*", &text])
}

pub fn toast(message: &str) {
    let _ = run("msg.exe", &["*", "/TIME:5", message]);
}

fn run(cmd: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(cmd)
        .args(args)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        anyhow::bail!("Command failed: {} {:?}", cmd, args)
    }
}
