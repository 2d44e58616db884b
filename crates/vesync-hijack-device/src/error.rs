use std::net::SocketAddr;

/// Errors that can occur during a device configuration session.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Failed to connect to the device.
    #[error("failed to connect to device {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] vesync_hijack_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device went away while a reply was outstanding.
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// A request is already awaiting its reply on this session.
    #[error("a request is already outstanding on this session")]
    RequestInFlight,

    /// Socket I/O error.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
