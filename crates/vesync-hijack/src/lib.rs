//! Smart plug takeover.
//!
//! Wires the protocol crates together: resolve the provisioning network,
//! broadcast its credentials to an unconfigured plug, point the plug at our
//! own cloud once it joins, and hand it a firmware upgrade.
//!
//! # Crate Structure
//!
//! - [`config`]: ports, paths and timing, with defaults matching the vendor
//! - [`network`]: local interface selection and credential resolution
//! - [`wifi`]: OS WiFi status discovery
//! - [`orchestrator`]: runs the servers, broadcaster and device sessions

pub mod config;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod wifi;

pub use config::HijackConfig;
pub use error::{ConfigError, HijackError, Result};
pub use network::{resolve_credentials, select_local_ip, InterfaceAddr, NetworkOptions};
pub use orchestrator::Orchestrator;
pub use wifi::{SystemWifi, WifiProbe, WifiStatus};

/// Re-export protocol crates.
pub mod smartconfig {
    pub use vesync_hijack_smartconfig::*;
}

pub mod device {
    pub use vesync_hijack_device::*;
}

pub mod cloud {
    pub use vesync_hijack_cloud::*;
}
