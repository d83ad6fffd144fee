use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Restricted App Usage Monitor
///
/// Caps the time spent in restricted apps over a rolling window, blocks the
/// screen when the cap is reached and notifies an accountability partner.
#[derive(Parser, Debug)]
#[command(name = "app-snitch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults to the system location)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor on a stream of foreground-app events
    Run {
        /// Read events from this file instead of stdin
        #[arg(long)]
        events: Option<PathBuf>,

        /// Log block and notify actions instead of performing them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Write an example configuration file
    Init {
        /// Where to write the file (defaults to --config or the system location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the loaded configuration
    ShowConfig,
    /// Send one notification and report how the endpoint answered
    TestNotify {
        /// App label to send instead of the configured one
        #[arg(long)]
        app: Option<String>,
    },
}
