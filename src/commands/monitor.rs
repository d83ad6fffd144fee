use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::monitor::config::load_config;
use crate::monitor::feed::spawn_reader;
use crate::monitor::notifier::{self, DispatchOutcome, SnitchReport, SnitchRequest};
use crate::monitor::{
    BlockAction, ConfigSource, Decision, FileConfigSource, LogBlocker, LogNotifier, Notifier,
    ScreenBlocker, SnitchDispatcher, UsageMonitor,
};

use super::utils::{init_logging, resolve_config_path};

/// Events buffered between the feed reader and the monitor
const FEED_CAPACITY: usize = 64;

/// How long to let queued notifications finish on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run the monitor until the event feed ends or Ctrl+C
pub fn run(
    config: Option<PathBuf>,
    events: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    init_logging(verbose);

    let config_path = resolve_config_path(config)?;
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async {
        match events {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open event file: {}", path.display()))?;
                run_monitor(config_path, file, dry_run).await
            }
            None => run_monitor(config_path, tokio::io::stdin(), dry_run).await,
        }
    });

    // A pending stdin read would otherwise hold up shutdown
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run_monitor<R>(config_path: PathBuf, feed: R, dry_run: bool) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    info!("Starting usage monitor");
    if dry_run {
        info!("DRY RUN MODE - no blocking or notifications");
    }

    let source = FileConfigSource::new(config_path);
    let config = source.load();
    if !config.is_configured() {
        warn!(
            "No restricted apps configured in {}; will reload when events arrive",
            source.path().display()
        );
    }

    let blocker: Box<dyn BlockAction>;
    let notifier: Box<dyn Notifier>;
    let mut worker = None;
    if dry_run {
        blocker = Box::new(LogBlocker);
        notifier = Box::new(LogNotifier);
    } else {
        let (dispatcher, handle) = SnitchDispatcher::spawn(config.queue_capacity)?;
        blocker = Box::new(ScreenBlocker::new());
        notifier = Box::new(dispatcher);
        worker = Some(handle);
    }

    let mut monitor = UsageMonitor::with_config(Box::new(source), config, blocker, notifier);
    let (mut events, reader) = spawn_reader(feed, FEED_CAPACITY);

    let mut handled = 0usize;
    let mut enforced = 0usize;
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!("Event feed ended");
                    break;
                };
                handled += 1;
                if let Decision::Enforced { .. } = monitor.handle_event(&event) {
                    enforced += 1;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping monitor");
                interrupted = true;
                break;
            }
        }
    }

    let now = chrono::Utc::now().timestamp_millis();
    info!(
        "Handled {} events, enforced {} times, {} min used in current window",
        handled,
        enforced,
        monitor.minutes_used_now(now)
    );
    if let Some(app) = monitor.tracker().state().active_app() {
        info!("Session on {} still open at shutdown", app);
    }

    // Dropping the monitor closes the notification queue
    drop(monitor);
    if interrupted {
        reader.abort();
    } else if let Ok(Err(e)) = reader.await {
        warn!("Event feed stopped early: {:#}", e);
    }

    if let Some(worker) = worker {
        if tokio::time::timeout(SHUTDOWN_GRACE, worker).await.is_err() {
            warn!("Pending notifications did not finish in time");
        }
    }

    Ok(())
}

/// Send one notification and print how the endpoint answered
pub fn test_notify(config: Option<PathBuf>, app: Option<String>, verbose: bool) -> Result<()> {
    init_logging(verbose);

    let config_path = resolve_config_path(config)?;
    let config = load_config(&config_path)
        .context("Failed to load configuration. Run 'app-snitch init' first.")?;

    let target = config
        .notify
        .clone()
        .context("Notifications are not configured (need user_id and notify_endpoint)")?;

    let report = SnitchReport {
        endpoint: target.endpoint,
        request: SnitchRequest {
            user_id: target.user_id,
            app_name: app.or(config.app_name),
            shame_message: config.shame_message,
        },
    };

    println!("Sending test notification to {}...", report.endpoint);

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(async {
        let client = notifier::build_client()?;
        notifier::deliver(&client, &report).await
    })?;

    match outcome {
        DispatchOutcome::Delivered { message } => {
            println!("✓ Notification delivered");
            if let Some(message) = message {
                println!("  {}", message);
            }
            Ok(())
        }
        DispatchOutcome::Rejected { status, reason, kind } => {
            anyhow::bail!("Endpoint rejected the notification ({} {:?}): {}", status, kind, reason)
        }
    }
}
