use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// "Application became foreground" notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundEvent {
    pub app_id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(alias = "app", alias = "package")]
    app_id: String,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Parse one feed line
///
/// Accepts a JSON object (`{"app_id": "...", "timestamp": 123}`) or plain
/// text (`<app_id> [<timestamp_ms>]`). Blank lines and `#` comments yield
/// `None`. A missing timestamp is filled in with `now_ms`.
pub fn parse_line(line: &str, now_ms: i64) -> Result<Option<ForegroundEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (app_id, timestamp) = if line.starts_with('{') {
        let raw: RawEvent = serde_json::from_str(line).context("Invalid JSON event")?;
        (raw.app_id, raw.timestamp)
    } else {
        let mut parts = line.split_whitespace();
        let app_id = parts.next().unwrap_or_default().to_string();
        let timestamp = parts
            .next()
            .map(|ts| ts.parse::<i64>().with_context(|| format!("Invalid timestamp: {}", ts)))
            .transpose()?;
        if parts.next().is_some() {
            anyhow::bail!("Expected '<app_id> [<timestamp_ms>]', got: {}", line);
        }
        (app_id, timestamp)
    };

    if app_id.trim().is_empty() {
        anyhow::bail!("Event has an empty app identifier");
    }

    Ok(Some(ForegroundEvent {
        app_id,
        timestamp: timestamp.unwrap_or(now_ms),
    }))
}

/// Read events line by line from `reader` on a background task
///
/// Unparseable lines are logged and skipped. The channel closes at end of
/// input.
pub fn spawn_reader<R>(
    reader: R,
    capacity: usize,
) -> (mpsc::Receiver<ForegroundEvent>, JoinHandle<Result<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.context("Failed to read event feed")? {
            line_no += 1;
            let now = chrono::Utc::now().timestamp_millis();
            match parse_line(&line, now) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        debug!("Event consumer went away, stopping feed");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping feed line {}: {:#}", line_no, e),
            }
        }

        Ok(())
    });

    (rx, handle)
}
