//! OS WiFi status discovery.
//!
//! Only macOS exposes the associated BSSID without extra privileges, via
//! `system_profiler`. Everywhere else discovery reports
//! [`ConfigError::WifiUnavailable`] and the SSID/BSSID must be given
//! explicitly.

use std::future::Future;

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ConfigError;

/// Current WiFi association as reported by the OS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WifiStatus {
    pub interface: Option<String>,
    pub status: Option<String>,
    pub phy_mode: Option<String>,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    /// Every field above was found.
    pub success: bool,
}

impl WifiStatus {
    pub fn is_connected(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("connected"))
    }
}

/// Source of [`WifiStatus`].
pub trait WifiProbe {
    fn probe(&self) -> impl Future<Output = Result<WifiStatus, ConfigError>> + Send;
}

/// Queries the host OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWifi;

impl WifiProbe for SystemWifi {
    async fn probe(&self) -> Result<WifiStatus, ConfigError> {
        if !cfg!(target_os = "macos") {
            return Err(ConfigError::WifiUnavailable {
                reason: format!("unsupported platform {}", std::env::consts::OS),
            });
        }

        let output = Command::new("system_profiler")
            .args(["SPAirPortDataType", "-detailLevel", "basic"])
            .output()
            .await
            .map_err(|err| ConfigError::WifiUnavailable {
                reason: format!("failed to run system_profiler: {err}"),
            })?;
        if !output.status.success() {
            return Err(ConfigError::WifiUnavailable {
                reason: format!("system_profiler exited with {}", output.status),
            });
        }

        let report = String::from_utf8_lossy(&output.stdout);
        let status = parse_system_profiler(&report);
        debug!(?status, "WiFi status");
        Ok(status)
    }
}

/// Pick the interesting fields out of `system_profiler SPAirPortDataType`.
///
/// Only the first occurrence of each label counts, so the values describe
/// the first listed interface and its current network.
pub fn parse_system_profiler(report: &str) -> WifiStatus {
    let interface = value_after(report, "Interfaces:", |token| {
        let end = token.find(':').unwrap_or(token.len());
        (end > 0).then(|| &token[..end])
    });
    let status = value_after(report, "Status:", Some);
    let phy_mode = value_after(report, "PHY Mode:", Some);
    // The network name is the heading line under this label, e.g. `HomeNet:`.
    let ssid = value_after(report, "Current Network Information:", |token| {
        token.rfind(':').filter(|&end| end > 0).map(|end| &token[..end])
    });
    let bssid = value_after(report, "BSSID:", Some);

    let success = interface.is_some()
        && status.is_some()
        && phy_mode.is_some()
        && ssid.is_some()
        && bssid.is_some();

    WifiStatus {
        interface,
        status,
        phy_mode,
        ssid,
        bssid,
        success,
    }
}

/// Find `label`, skip at least one whitespace character, and hand the next
/// whitespace-delimited token to `extract`. Later occurrences are tried if
/// an earlier one does not fit.
fn value_after<'a>(
    report: &'a str,
    label: &str,
    extract: impl Fn(&'a str) -> Option<&'a str>,
) -> Option<String> {
    report.match_indices(label).find_map(|(at, _)| {
        let rest = &report[at + label.len()..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let token = &trimmed[..end];
        if token.is_empty() {
            return None;
        }
        extract(token).map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTED: &str = "\
Wi-Fi:

      Software Versions:
          CoreWLAN: 16.0 (1657)
          CoreWLANKit: 16.0 (1657)
      Interfaces:
        en0:
          Card Type: Wi-Fi  (0x14E4, 0x7BF)
          Firmware Version: Broadcom BCM43xx 1.0 (7.77.111.1 AirPortDriverBrcmNIC-1710.3)
          MAC Address: 88:66:5a:00:00:00
          Locale: FCC
          Country Code: US
          Supported PHY Modes: 802.11 a/b/g/n/ac
          Wake On Wireless: Supported
          Status: Connected
          Current Network Information:
            HomeNet:
              PHY Mode: 802.11ac
              BSSID: 11:22:33:44:55:66
              Channel: 149 (5GHz, 80MHz)
              Network Type: Infrastructure
";

    #[test]
    fn parses_connected_report() {
        let status = parse_system_profiler(CONNECTED);
        assert_eq!(
            status,
            WifiStatus {
                interface: Some("en0".to_string()),
                status: Some("Connected".to_string()),
                phy_mode: Some("802.11ac".to_string()),
                ssid: Some("HomeNet".to_string()),
                bssid: Some("11:22:33:44:55:66".to_string()),
                success: true,
            }
        );
        assert!(status.is_connected());
    }

    #[test]
    fn disconnected_report_is_incomplete() {
        let report = "\
Wi-Fi:
      Interfaces:
        en0:
          Supported PHY Modes: 802.11 a/b/g/n/ac
          Status: Off
";
        let status = parse_system_profiler(report);
        assert_eq!(status.interface.as_deref(), Some("en0"));
        assert_eq!(status.status.as_deref(), Some("Off"));
        assert_eq!(status.phy_mode, None);
        assert_eq!(status.ssid, None);
        assert!(!status.success);
        assert!(!status.is_connected());
    }

    #[test]
    fn empty_report_finds_nothing() {
        assert_eq!(parse_system_profiler(""), WifiStatus::default());
    }

    #[test]
    fn ssid_keeps_inner_colons() {
        let report = "Current Network Information:\n    Cafe:Guest:\n";
        let status = parse_system_profiler(report);
        assert_eq!(status.ssid.as_deref(), Some("Cafe:Guest"));
    }

    #[test]
    fn status_match_is_case_insensitive() {
        let status = WifiStatus {
            status: Some("CONNECTED".to_string()),
            ..WifiStatus::default()
        };
        assert!(status.is_connected());
    }

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn system_probe_unavailable_off_macos() {
        let err = SystemWifi.probe().await.expect_err("probe should be unavailable");
        assert!(matches!(err, ConfigError::WifiUnavailable { .. }));
    }
}
