//! Local interface selection and credential resolution.

use std::net::{IpAddr, Ipv4Addr};

use tracing::{debug, info};
use vesync_hijack_smartconfig::{parse_bssid, NetworkCredentials, ZERO_BSSID};

use crate::error::ConfigError;
use crate::wifi::WifiProbe;

/// One IPv4 address on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub addr: Ipv4Addr,
    pub loopback: bool,
}

/// Enumerate local IPv4 addresses.
pub fn list_interfaces() -> std::io::Result<Vec<InterfaceAddr>> {
    Ok(if_addrs::get_if_addrs()?
        .into_iter()
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(addr) => Some(InterfaceAddr {
                loopback: iface.is_loopback(),
                name: iface.name,
                addr,
            }),
            IpAddr::V6(_) => None,
        })
        .collect())
}

/// Pick the address we provision from.
///
/// With `requested`, the first non-loopback address whose interface name or
/// address equals it. Without, the first non-loopback address.
pub fn select_local_ip(
    interfaces: &[InterfaceAddr],
    requested: Option<&str>,
) -> Result<Ipv4Addr, ConfigError> {
    let mut candidates = interfaces.iter().filter(|iface| !iface.loopback);
    let chosen = match requested {
        Some(requested) => candidates
            .find(|iface| iface.name == requested || iface.addr.to_string() == requested),
        None => candidates.next(),
    };

    match chosen {
        Some(iface) => {
            info!(interface = %iface.name, addr = %iface.addr, "using local interface");
            Ok(iface.addr)
        }
        None => Err(ConfigError::NoInterface {
            requested: requested.map(str::to_string),
        }),
    }
}

/// What the user told us about the network.
#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    /// Interface name or IPv4 address.
    pub ip: Option<String>,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub password: Option<String>,
    /// A device address was given, so nothing will be broadcast and the
    /// BSSID is irrelevant.
    pub direct_device: bool,
}

/// Resolve the credentials to hand the plug.
///
/// - the passphrase is always required
/// - without an SSID, the OS must report a connected WiFi network and its
///   SSID and BSSID are used
/// - with an SSID but no BSSID, the OS is asked for the BSSID; if it reports
///   a connected network it must be the same SSID, otherwise the BSSID stays
///   all zeros
pub async fn resolve_credentials<P: WifiProbe>(
    options: &NetworkOptions,
    interfaces: &[InterfaceAddr],
    wifi: &P,
) -> Result<NetworkCredentials, ConfigError> {
    let local_ip = select_local_ip(interfaces, options.ip.as_deref())?;
    let passphrase = options
        .password
        .clone()
        .ok_or(ConfigError::MissingPassphrase)?;

    let (ssid, bssid) = match &options.ssid {
        Some(ssid) if options.direct_device => (ssid.clone(), ZERO_BSSID),
        Some(ssid) => match &options.bssid {
            Some(bssid) => (ssid.clone(), bssid_or_error(bssid)?),
            None => (ssid.clone(), probe_bssid(ssid, wifi).await?),
        },
        None => {
            info!("looking for local WiFi interface (use --ssid and --bssid to override)");
            let status = wifi.probe().await?;
            let (Some(ssid), true) = (status.ssid.clone(), status.success) else {
                return Err(ConfigError::WifiUnavailable {
                    reason: "failed to find WiFi interface".to_string(),
                });
            };
            if !status.is_connected() {
                return Err(ConfigError::WifiDisconnected {
                    interface: status.interface,
                    status: status.status,
                });
            }
            let bssid = match (&status.bssid, options.direct_device) {
                (Some(bssid), false) => bssid_or_error(bssid)?,
                _ => ZERO_BSSID,
            };
            (ssid, bssid)
        }
    };

    Ok(NetworkCredentials::new(ssid, bssid, passphrase, local_ip))
}

async fn probe_bssid<P: WifiProbe>(
    ssid: &str,
    wifi: &P,
) -> Result<vesync_hijack_smartconfig::Bssid, ConfigError> {
    let status = match wifi.probe().await {
        Ok(status) if status.success && status.is_connected() => status,
        Ok(status) => {
            debug!(?status, "WiFi not connected, using zero BSSID");
            return Ok(ZERO_BSSID);
        }
        Err(err) => {
            debug!(error = %err, "WiFi discovery failed, using zero BSSID");
            return Ok(ZERO_BSSID);
        }
    };

    let connected = status.ssid.unwrap_or_default();
    if connected != ssid {
        return Err(ConfigError::SsidMismatch {
            requested: ssid.to_string(),
            connected,
        });
    }
    match status.bssid {
        Some(bssid) => bssid_or_error(&bssid),
        None => Ok(ZERO_BSSID),
    }
}

fn bssid_or_error(bssid: &str) -> Result<vesync_hijack_smartconfig::Bssid, ConfigError> {
    if bssid.is_empty() {
        return Ok(ZERO_BSSID);
    }
    parse_bssid(bssid).map_err(|_| ConfigError::InvalidBssid(bssid.to_string()))
}
