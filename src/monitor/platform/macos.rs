use anyhow::Result;
use std::process::Command;

/// Lock the session with the Ctrl+Cmd+Q shortcut
pub fn lock_screen() -> Result<()> {
    run_script("tell application \"System Events\" to keystroke \"q\" using {command down, control down}")
}

/// Show a modal alert; returns once it is on screen, not when dismissed
pub fn show_notice(title: &str, message: &str) -> Result<()> {
    let script = format!(
        "display alert \"{}\" message \"{}\" as critical",
        escape(title),
        escape(message)
    );
    super::spawn_detached(Command::new("osascript").arg("-e").arg(script))
}

pub fn toast(message: &str) {
    let script = format!(
        "display notification \"{}\" with title \"app-snitch\"",
        escape(message)
    );
    let _ = run_script(&script);
}

fn run_script(script: &str) -> Result<()> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        anyhow::bail!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
    }
}
