use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_MINUTES_ALLOWED: u32 = 30;
const DEFAULT_WINDOW_MINUTES: u32 = 180;
const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Immutable configuration snapshot for one monitor
///
/// A reload replaces the whole snapshot; fields are never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Restricted identifiers (exact or prefix matches)
    pub restricted_apps: BTreeSet<String>,

    /// Minutes of restricted usage allowed per window
    pub minutes_allowed: u32,

    /// Window length in minutes, always >= 1
    pub window_minutes: u32,

    /// Where to report a violation; `None` disables notification
    pub notify: Option<NotifyTarget>,

    /// Label sent as `appName`
    pub app_name: Option<String>,

    /// Message sent as `shameMessage`
    pub shame_message: Option<String>,

    /// How the block is presented
    pub block_action: BlockMode,

    /// Capacity of the pending-notification queue
    pub queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            restricted_apps: BTreeSet::new(),
            minutes_allowed: DEFAULT_MINUTES_ALLOWED,
            window_minutes: DEFAULT_WINDOW_MINUTES,
            notify: None,
            app_name: None,
            shame_message: None,
            block_action: BlockMode::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl MonitorConfig {
    /// An empty restricted set means the monitor has not been configured yet
    pub fn is_configured(&self) -> bool {
        !self.restricted_apps.is_empty()
    }

    /// Exact-or-prefix match against the restricted set
    ///
    /// An entry that happens to prefix an unrelated identifier over-matches;
    /// this is accepted so one entry can cover a family of identifiers.
    pub fn is_restricted(&self, app_id: &str) -> bool {
        self.restricted_apps
            .iter()
            .any(|entry| app_id == entry || app_id.starts_with(entry.as_str()))
    }
}

/// Identity and endpoint used for violation reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub user_id: String,
    pub endpoint: Url,
}

/// Block presentation mode
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Show a blocking notice, locking the session if no notice can be shown
    #[default]
    Overlay,
    /// Lock the session
    Lock,
    /// Only log the violation
    None,
}

/// On-disk layout of the configuration file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    user_id: Option<String>,

    #[serde(default)]
    restricted_apps: Option<serde_yaml::Value>,

    #[serde(default)]
    minutes_allowed: Option<i64>,

    #[serde(default)]
    window_minutes: Option<i64>,

    #[serde(default)]
    notify_endpoint: Option<String>,

    #[serde(default)]
    app_name: Option<String>,

    #[serde(default)]
    shame_message: Option<String>,

    #[serde(default)]
    block_action: BlockMode,

    #[serde(default)]
    queue_capacity: Option<usize>,
}

/// Supplies configuration snapshots to a monitor
///
/// `load` may be called any number of times and never fails: problems are
/// logged and degrade to an unconfigured snapshot.
pub trait ConfigSource {
    fn load(&self) -> MonitorConfig;
}

/// Configuration read from a YAML file on every load
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> MonitorConfig {
        match load_config(&self.path) {
            Ok(config) => {
                info!(
                    "Loaded configuration from {} ({} restricted apps, {} min per {} min window)",
                    self.path.display(),
                    config.restricted_apps.len(),
                    config.minutes_allowed,
                    config.window_minutes
                );
                config
            }
            Err(e) => {
                error!("Failed to load configuration: {:#}", e);
                MonitorConfig::default()
            }
        }
    }
}

/// Get the platform-specific config file path
pub fn get_config_path() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/etc/app-snitch/config.yaml"))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(PathBuf::from(
            "/Library/Application Support/app-snitch/config.yaml",
        ))
    }

    #[cfg(target_os = "windows")]
    {
        let mut path = PathBuf::from(
            std::env::var("ProgramData")
                .unwrap_or_else(|_| "C:\\ProgramData".to_string()),
        );
        path.push("app-snitch");
        path.push("config.yaml");
        Ok(path)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        anyhow::bail!("Unsupported operating system");
    }
}

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<MonitorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))
}

/// Parse configuration text, applying defaults and soft validation
pub fn parse_config(content: &str) -> Result<MonitorConfig> {
    let file: ConfigFile = if content.trim().is_empty() {
        ConfigFile::default()
    } else {
        serde_yaml::from_str(content)?
    };

    let restricted_apps = file
        .restricted_apps
        .as_ref()
        .map(parse_restricted_apps)
        .unwrap_or_default();

    let minutes_allowed = positive_or_default(
        "minutes_allowed",
        file.minutes_allowed,
        DEFAULT_MINUTES_ALLOWED,
    );
    let window_minutes = positive_or_default(
        "window_minutes",
        file.window_minutes,
        DEFAULT_WINDOW_MINUTES,
    );

    let user_id = non_blank(file.user_id);
    let endpoint = non_blank(file.notify_endpoint);
    let notify = match (user_id, endpoint) {
        (Some(user_id), Some(endpoint)) => match validate_endpoint(&endpoint) {
            Ok(endpoint) => Some(NotifyTarget { user_id, endpoint }),
            Err(e) => {
                warn!("Notifications disabled: {:#}", e);
                None
            }
        },
        (None, Some(_)) => {
            warn!("notify_endpoint is set but user_id is missing; notifications disabled");
            None
        }
        _ => None,
    };

    let queue_capacity = match file.queue_capacity {
        Some(0) => {
            warn!("queue_capacity must be at least 1, using {}", DEFAULT_QUEUE_CAPACITY);
            DEFAULT_QUEUE_CAPACITY
        }
        Some(n) => n,
        None => DEFAULT_QUEUE_CAPACITY,
    };

    Ok(MonitorConfig {
        restricted_apps,
        minutes_allowed,
        window_minutes,
        notify,
        app_name: non_blank(file.app_name),
        shame_message: non_blank(file.shame_message),
        block_action: file.block_action,
        queue_capacity,
    })
}

/// Accepts a YAML sequence of strings or a JSON array string
///
/// Anything malformed yields an empty set.
fn parse_restricted_apps(value: &serde_yaml::Value) -> BTreeSet<String> {
    let parsed: Result<Vec<String>> = match value {
        serde_yaml::Value::String(json) => {
            serde_json::from_str(json).context("restricted_apps is not a JSON array of strings")
        }
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value.clone())
            .context("restricted_apps must contain only strings"),
        serde_yaml::Value::Null => Ok(Vec::new()),
        _ => Err(anyhow::anyhow!("restricted_apps must be a list")),
    };

    match parsed {
        Ok(apps) => apps
            .into_iter()
            .map(|app| app.trim().to_string())
            .filter(|app| {
                if app.is_empty() {
                    debug!("Skipping blank restricted_apps entry");
                }
                !app.is_empty()
            })
            .collect(),
        Err(e) => {
            warn!("Ignoring restricted_apps: {:#}", e);
            BTreeSet::new()
        }
    }
}

fn positive_or_default(key: &str, value: Option<i64>, default: u32) -> u32 {
    match value {
        None => default,
        Some(v) => match u32::try_from(v) {
            Ok(v) if v >= 1 => v,
            _ => {
                warn!("{} must be a positive integer (got {}), using {}", key, v, default);
                default
            }
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Validate a notification endpoint URL
///
/// HTTPS is required, except plain HTTP to a loopback host.
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .with_context(|| format!("Invalid notify_endpoint: {}", endpoint))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => anyhow::bail!("notify_endpoint must use HTTPS (got: {})", scheme),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = include_str!("../../example-config.yaml");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn restricted(apps: &[&str]) -> MonitorConfig {
        MonitorConfig {
            restricted_apps: apps.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = parse_config("").unwrap();
        assert!(!config.is_configured());
        assert_eq!(config.minutes_allowed, 30);
        assert_eq!(config.window_minutes, 180);
        assert!(config.notify.is_none());
        assert_eq!(config.block_action, BlockMode::Overlay);
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(EXAMPLE_CONFIG).unwrap();
        assert!(config.is_restricted("com.instagram.android"));
        assert!(config.is_restricted("com.tinder"));
        let notify = config.notify.expect("example config has a notify target");
        assert_eq!(notify.user_id, "alex_01");
        assert_eq!(notify.endpoint.scheme(), "https");
    }

    #[test]
    fn test_restricted_apps_as_json_string() {
        let config = parse_config(
            r#"restricted_apps: '["com.instagram.android","com.tinder"]'"#,
        )
        .unwrap();
        assert_eq!(config.restricted_apps.len(), 2);
        assert!(config.is_restricted("com.tinder"));
    }

    #[test]
    fn test_malformed_restricted_apps_is_empty() {
        let config = parse_config("restricted_apps: '[not json'").unwrap();
        assert!(!config.is_configured());

        let config = parse_config("restricted_apps: 42").unwrap();
        assert!(!config.is_configured());

        let config = parse_config("restricted_apps: [1, 2]").unwrap();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_blank_entries_are_skipped() {
        let config = parse_config(r#"restricted_apps: ["", "  ", "x"]"#).unwrap();
        assert_eq!(config.restricted_apps.len(), 1);
        assert!(!config.is_restricted("y"));
    }

    #[test]
    fn test_prefix_match() {
        let config = restricted(&["com.app"]);
        assert!(config.is_restricted("com.app"));
        assert!(config.is_restricted("com.app.extra"));
        // Accepted over-match: literal prefix of an unrelated identifier
        assert!(config.is_restricted("com.apple.music"));
        assert!(!config.is_restricted("org.other"));
        assert!(!config.is_restricted("com.ap"));
    }

    #[test]
    fn test_non_positive_limits_fall_back_to_defaults() {
        let config = parse_config("minutes_allowed: 0\nwindow_minutes: -5").unwrap();
        assert_eq!(config.minutes_allowed, 30);
        assert_eq!(config.window_minutes, 180);
    }

    #[test]
    fn test_notify_requires_user_id() {
        let config = parse_config("notify_endpoint: https://example.com/snitch").unwrap();
        assert!(config.notify.is_none());

        let config = parse_config(
            "user_id: '  '\nnotify_endpoint: https://example.com/snitch",
        )
        .unwrap();
        assert!(config.notify.is_none());
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(validate_endpoint("https://example.com/snitch").is_ok());
        assert!(validate_endpoint("http://127.0.0.1:8080/snitch").is_ok());
        assert!(validate_endpoint("http://localhost/snitch").is_ok());
        assert!(validate_endpoint("http://example.com/snitch").is_err());
        assert!(validate_endpoint("not-a-url").is_err());
    }

    #[test]
    fn test_insecure_endpoint_disables_notify() {
        let config = parse_config(
            "user_id: u1\nnotify_endpoint: http://example.com/snitch",
        )
        .unwrap();
        assert!(config.notify.is_none());
    }

    #[test]
    fn test_file_source_degrades_to_unconfigured() {
        let source = FileConfigSource::new("/nonexistent/app-snitch/config.yaml");
        assert_eq!(source.load(), MonitorConfig::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "minutes_allowed: [not, a, number]").unwrap();
        let source = FileConfigSource::new(file.path());
        assert!(!source.load().is_configured());
    }

    #[test]
    fn test_file_source_reads_on_every_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "restricted_apps: []").unwrap();

        let source = FileConfigSource::new(&path);
        assert!(!source.load().is_configured());

        std::fs::write(&path, "restricted_apps: [x]").unwrap();
        assert!(source.load().is_restricted("x"));
    }
}
