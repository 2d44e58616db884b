use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use vesync_hijack_smartconfig::NetworkCredentials;

/// URI of the configuration command.
pub const BEGIN_CONFIG_URI: &str = "/beginConfigRequest";

/// Points a plug at our network and our server.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeginConfigRequest {
    pub uri: String,
    #[serde(rename = "wifiID")]
    pub wifi_id: String,
    /// Left empty; the plug already knows the access point.
    #[serde(rename = "wifiBssid")]
    pub wifi_bssid: String,
    #[serde(rename = "wifiPassword")]
    pub wifi_password: String,
    pub account: String,
    /// Millisecond timestamp.
    pub key: u64,
    #[serde(rename = "serverIP")]
    pub server_ip: String,
}

impl BeginConfigRequest {
    pub fn new(credentials: &NetworkCredentials, key: u64) -> Self {
        Self {
            uri: BEGIN_CONFIG_URI.to_string(),
            wifi_id: credentials.ssid.clone(),
            wifi_bssid: String::new(),
            wifi_password: credentials.passphrase.clone(),
            account: "0".to_string(),
            key,
            server_ip: credentials.local_ip.to_string(),
        }
    }

    /// Request keyed with the current wall-clock time.
    pub fn now(credentials: &NetworkCredentials) -> Self {
        let key = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(credentials, key)
    }
}

impl fmt::Debug for BeginConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeginConfigRequest")
            .field("uri", &self.uri)
            .field("wifi_id", &self.wifi_id)
            .field("wifi_password", &"<redacted>")
            .field("key", &self.key)
            .field("server_ip", &self.server_ip)
            .finish()
    }
}
