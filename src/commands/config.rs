use anyhow::{Context, Result};
use chrono::Duration;
use std::path::PathBuf;

use crate::monitor::config::{load_config, BlockMode, EXAMPLE_CONFIG};
use crate::platform::common::atomic_write;

use super::utils::{format_duration, init_logging, resolve_config_path};

/// Write the example configuration file
pub fn init(output: Option<PathBuf>, force: bool) -> Result<()> {
    let output_path = resolve_config_path(output)?;

    // Check if file exists
    if output_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}\nUse --force to overwrite",
            output_path.display()
        );
    }

    atomic_write(&output_path, EXAMPLE_CONFIG.as_bytes())
        .with_context(|| format!("Failed to write config file: {}", output_path.display()))?;

    println!("✓ Created configuration file: {}", output_path.display());
    println!("\nEdit this file to list your restricted apps and your user_id.");
    println!("Then start monitoring:");
    println!("\n  app-snitch run --config {}", output_path.display());

    Ok(())
}

/// Show the loaded configuration
pub fn show(config: Option<PathBuf>, verbose: bool) -> Result<()> {
    init_logging(verbose);

    let config_path = resolve_config_path(config)?;
    let config = load_config(&config_path)
        .context("Failed to load configuration. Run 'app-snitch init' first.")?;

    println!("Restricted App Usage Configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("File: {}", config_path.display());
    println!();

    if config.restricted_apps.is_empty() {
        println!("Restricted apps: none (monitor stays idle)");
    } else {
        println!("Restricted apps (exact or prefix match):");
        for app in &config.restricted_apps {
            println!("  - {}", app);
        }
    }

    println!();
    println!(
        "Allowance: {} per {} window",
        format_duration(Duration::minutes(i64::from(config.minutes_allowed))),
        format_duration(Duration::minutes(i64::from(config.window_minutes)))
    );

    let block = match config.block_action {
        BlockMode::Overlay => "show block notice",
        BlockMode::Lock => "lock screen",
        BlockMode::None => "log only",
    };
    println!("On limit:  {}", block);

    match &config.notify {
        Some(target) => {
            println!("Notify:    {} as {}", target.endpoint, target.user_id);
            if let Some(app_name) = &config.app_name {
                println!("  App name: {}", app_name);
            }
            if let Some(message) = &config.shame_message {
                println!("  Message:  {}", message);
            }
        }
        None => println!("Notify:    disabled"),
    }

    Ok(())
}
