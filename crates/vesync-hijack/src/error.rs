use std::path::PathBuf;

use vesync_hijack_cloud::CloudError;
use vesync_hijack_device::DeviceError;
use vesync_hijack_smartconfig::SmartConfigError;

/// Startup configuration problems. All of these abort before anything is
/// bound or sent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to find a usable IPv4 interface{}", requested_suffix(.requested))]
    NoInterface { requested: Option<String> },

    #[error("need to specify your WiFi password (--password)")]
    MissingPassphrase,

    #[error("WiFi discovery unavailable: {reason}. Please use --ssid and --bssid to provide WiFi details")]
    WifiUnavailable { reason: String },

    #[error("WiFi interface {interface:?} is not connected (status {status:?})")]
    WifiDisconnected {
        interface: Option<String>,
        status: Option<String>,
    },

    #[error("specified WiFi SSID {requested:?} doesn't match connected {connected:?}")]
    SsidMismatch { requested: String, connected: String },

    #[error("invalid BSSID {0:?} (expected xx:xx:xx:xx:xx:xx)")]
    InvalidBssid(String),

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn requested_suffix(requested: &Option<String>) -> String {
    match requested {
        Some(requested) => format!(" matching {requested:?}"),
        None => String::new(),
    }
}

/// Top-level error for a takeover run.
#[derive(Debug, thiserror::Error)]
pub enum HijackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SmartConfig(#[from] SmartConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// A background task panicked or was aborted.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HijackError>;
