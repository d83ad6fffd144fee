use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// JSON body of the partner notification call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnitchRequest {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shame_message: Option<String>,
}

/// A notification ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnitchReport {
    pub endpoint: Url,
    pub request: SnitchRequest,
}

/// Response body of the notification endpoint
#[derive(Debug, Default, Deserialize)]
struct SnitchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Why the endpoint refused a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Request lacked `userId` (400)
    MissingUser,
    /// The user has no accountability partner (400)
    NoPartner,
    /// The partner has no push delivery token (400)
    NoDeliveryToken,
    /// The user or partner record does not exist (404)
    NotFound,
    /// Server-side failure (5xx)
    Server,
    Other,
}

impl RemoteErrorKind {
    /// Configuration problems will not go away by themselves
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingUser | Self::NoPartner | Self::NoDeliveryToken | Self::NotFound
        )
    }
}

/// Classified result of one notification call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered {
        message: Option<String>,
    },
    Rejected {
        status: u16,
        reason: String,
        kind: RemoteErrorKind,
    },
}

/// Classify a non-success response from its status and error text
pub fn classify_rejection(status: StatusCode, reason: &str) -> RemoteErrorKind {
    let reason = reason.to_lowercase();
    match status.as_u16() {
        400 if reason.contains("userid") => RemoteErrorKind::MissingUser,
        400 if reason.contains("token") => RemoteErrorKind::NoDeliveryToken,
        400 if reason.contains("partner") => RemoteErrorKind::NoPartner,
        404 => RemoteErrorKind::NotFound,
        _ if status.is_server_error() => RemoteErrorKind::Server,
        _ => RemoteErrorKind::Other,
    }
}

/// Build the HTTP client used for notification calls
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("app-snitch/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// POST one report and classify the response
pub async fn deliver(client: &Client, report: &SnitchReport) -> Result<DispatchOutcome> {
    debug!("Sending notification to: {}", report.endpoint);

    let response = client
        .post(report.endpoint.clone())
        .json(&report.request)
        .send()
        .await
        .context("Failed to connect to notification endpoint")?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;
    let parsed: SnitchResponse = serde_json::from_str(&body).unwrap_or_default();

    if status.is_success() {
        if !parsed.success {
            debug!("Endpoint answered {} without success flag", status);
        }
        return Ok(DispatchOutcome::Delivered {
            message: parsed.message,
        });
    }

    let reason = parsed
        .error
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    Ok(DispatchOutcome::Rejected {
        status: status.as_u16(),
        kind: classify_rejection(status, &reason),
        reason,
    })
}

/// Log a delivery result; nothing is retried
pub fn log_outcome(result: &Result<DispatchOutcome>) {
    match result {
        Ok(DispatchOutcome::Delivered { message }) => info!(
            "Partner notified{}",
            message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
        ),
        Ok(DispatchOutcome::Rejected { status, reason, kind }) if kind.is_configuration() => {
            error!(
                "Notification rejected ({}, {:?}): {}. Check user_id and partner setup.",
                status, kind, reason
            )
        }
        Ok(DispatchOutcome::Rejected { status, reason, kind }) => {
            error!("Notification failed ({}, {:?}): {}", status, kind, reason)
        }
        Err(e) => error!("Notification failed: {:#}", e),
    }
}

/// Fire-and-forget notification channel
///
/// `send` must return immediately; delivery happens elsewhere.
pub trait Notifier {
    fn send(&self, report: SnitchReport);
}

/// Queues reports for a background worker that performs the HTTP calls
pub struct SnitchDispatcher {
    tx: mpsc::Sender<SnitchReport>,
}

impl SnitchDispatcher {
    /// Spawn the delivery worker on the current tokio runtime
    ///
    /// The worker exits once the dispatcher is dropped and the queue drains.
    pub fn spawn(capacity: usize) -> Result<(Self, JoinHandle<()>)> {
        Ok(Self::spawn_with_client(build_client()?, capacity))
    }

    fn spawn_with_client(client: Client, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(client, rx));
        (Self { tx }, worker)
    }
}

impl Notifier for SnitchDispatcher {
    fn send(&self, report: SnitchReport) {
        match self.tx.try_send(report) {
            Ok(()) => debug!("Notification queued"),
            Err(TrySendError::Full(report)) => {
                warn!("Notification queue full, dropping report for {}", report.request.user_id)
            }
            Err(TrySendError::Closed(_)) => error!("Notification worker is gone, dropping report"),
        }
    }
}

async fn run_worker(client: Client, mut rx: mpsc::Receiver<SnitchReport>) {
    while let Some(report) = rx.recv().await {
        let result = deliver(&client, &report).await;
        log_outcome(&result);
    }
    debug!("Notification worker stopped");
}

/// Only logs; used for dry runs
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, report: SnitchReport) {
        info!(
            "[DRY RUN] Would notify {} for user {}",
            report.endpoint, report.request.user_id
        );
    }
}
