use std::net::SocketAddr;

/// Errors that can occur while encoding or broadcasting credentials.
#[derive(Debug, thiserror::Error)]
pub enum SmartConfigError {
    /// The encoded payload does not fit the one-byte length/sequence fields.
    #[error("smart config payload too long ({len} bytes, max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// A BSSID string could not be parsed as six colon-separated hex octets.
    #[error("invalid BSSID {0:?} (expected xx:xx:xx:xx:xx:xx)")]
    InvalidBssid(String),

    /// Failed to bind the UDP socket.
    #[error("failed to bind UDP socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the UDP socket.
    #[error("UDP I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SmartConfigError>;
