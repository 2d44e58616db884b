use std::net::SocketAddr;

/// Errors raised by the command channel and HTTP listener.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The peer is not the device we expect to upgrade.
    #[error("unexpected device {device_name:?} {device_type:?}")]
    UnexpectedDevice {
        device_name: Option<String>,
        device_type: Option<String>,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A binary frame was not a whole number of cipher blocks.
    #[error("cannot decrypt {len}-byte frame (not a multiple of {block} bytes)")]
    Decrypt { len: usize, block: usize },

    /// Failed to bind the HTTP listener.
    #[error("failed to bind HTTP listener to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// I/O error on the HTTP listener.
    #[error("HTTP server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
