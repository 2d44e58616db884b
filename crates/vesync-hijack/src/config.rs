//! Runtime configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vesync_hijack_cloud::{HTTP_PORT, WEBSOCKET_PATH};
use vesync_hijack_device::DEVICE_CONFIG_PORT;
use vesync_hijack_smartconfig::BroadcastTiming;

use crate::error::ConfigError;

/// UDP port plugs announce themselves on after joining the network.
pub const RENDEZVOUS_PORT: u16 = 18266;

/// AirKiss multicast group.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(234, 100, 100, 100);
pub const MULTICAST_PORT: u16 = 7001;

/// Ports, paths and timing for one takeover run.
///
/// Defaults match what stock plugs expect. A JSON file may override any
/// subset of fields; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HijackConfig {
    pub device_port: u16,
    pub rendezvous_port: u16,
    pub http_port: u16,
    pub multicast_group: Ipv4Addr,
    pub multicast_port: u16,
    pub websocket_path: String,
    /// Directory firmware images are served from.
    pub assets_dir: PathBuf,
    /// Send the SSID in-band (needed when the network does not broadcast it).
    pub ssid_hidden: bool,
    pub broadcast: BroadcastTiming,
}

impl Default for HijackConfig {
    fn default() -> Self {
        Self {
            device_port: DEVICE_CONFIG_PORT,
            rendezvous_port: RENDEZVOUS_PORT,
            http_port: HTTP_PORT,
            multicast_group: MULTICAST_GROUP,
            multicast_port: MULTICAST_PORT,
            websocket_path: WEBSOCKET_PATH.to_string(),
            assets_dir: PathBuf::from("assets"),
            ssid_hidden: true,
            broadcast: BroadcastTiming::default(),
        }
    }
}

impl HijackConfig {
    /// Load overrides from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Where broadcast datagrams are sent.
    pub fn multicast_target(&self) -> SocketAddr {
        SocketAddr::from((self.multicast_group, self.multicast_port))
    }

    /// Origin plugs are told to download firmware from.
    pub fn upgrade_url(&self, local_ip: Ipv4Addr) -> String {
        format!("http://{local_ip}:{}", self.http_port)
    }
}
