use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{Result, SmartConfigError};

/// Access point MAC address.
pub type Bssid = [u8; 6];

/// BSSID used when the access point address is unknown or not needed.
pub const ZERO_BSSID: Bssid = [0; 6];

/// Everything a plug needs to join our network and find our servers.
///
/// Resolved once at startup and shared read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkCredentials {
    pub ssid: String,
    pub bssid: Bssid,
    /// WPA passphrase. Redacted in debug output.
    pub passphrase: String,
    /// Our address on the provisioning network.
    pub local_ip: Ipv4Addr,
}

impl NetworkCredentials {
    pub fn new(
        ssid: impl Into<String>,
        bssid: Bssid,
        passphrase: impl Into<String>,
        local_ip: Ipv4Addr,
    ) -> Self {
        Self {
            ssid: ssid.into(),
            bssid,
            passphrase: passphrase.into(),
            local_ip,
        }
    }

    /// BSSID in `aa:bb:cc:dd:ee:ff` form.
    pub fn bssid_string(&self) -> String {
        format_bssid(&self.bssid)
    }
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("ssid", &self.ssid)
            .field("bssid", &self.bssid_string())
            .field("passphrase", &"<redacted>")
            .field("local_ip", &self.local_ip)
            .finish()
    }
}

/// Parse a colon-separated BSSID (`00:11:22:33:44:55`).
pub fn parse_bssid(input: &str) -> Result<Bssid> {
    let mut bssid = ZERO_BSSID;
    let mut parts = input.trim().split(':');

    for octet in bssid.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| SmartConfigError::InvalidBssid(input.to_string()))?;
        if part.is_empty() || part.len() > 2 {
            return Err(SmartConfigError::InvalidBssid(input.to_string()));
        }
        *octet = u8::from_str_radix(part, 16)
            .map_err(|_| SmartConfigError::InvalidBssid(input.to_string()))?;
    }

    if parts.next().is_some() {
        return Err(SmartConfigError::InvalidBssid(input.to_string()));
    }
    Ok(bssid)
}

pub fn format_bssid(bssid: &Bssid) -> String {
    bssid
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
