use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod monitor;
mod platform;

use cli::{Args, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Run { events, dry_run } => {
            commands::monitor::run(args.config, events, dry_run, args.verbose)
        }
        Commands::Init { output, force } => {
            commands::config::init(output.or(args.config), force)
        }
        Commands::ShowConfig => {
            commands::config::show(args.config, args.verbose)
        }
        Commands::TestNotify { app } => {
            commands::monitor::test_notify(args.config, app, args.verbose)
        }
    }
}
