use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `deviceName` announced by the plugs we take over.
pub const EXPECTED_DEVICE_NAME: &str = "vesync_wifi_outlet";
/// `type` announced by the plugs we take over.
pub const EXPECTED_DEVICE_TYPE: &str = "wifi-switch";
/// Version advertised in the upgrade directive.
pub const UPGRADE_VERSION: &str = "2.00";

pub const LOGIN_REPLY_URI: &str = "/loginReply";
pub const UPGRADE_URI: &str = "/upgrade";

/// Cloud reply accepting a device login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginReply {
    pub uri: String,
    pub error: i32,
    pub wd: u8,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Milliseconds since the Unix epoch.
    pub ms: i64,
    pub hh: u8,
    pub hl: u8,
    pub lh: u8,
    pub ll: u8,
}

impl LoginReply {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            uri: LOGIN_REPLY_URI.to_string(),
            error: 0,
            wd: 3,
            year: now.year(),
            month: now.month(),
            day: now.day(),
            ms: now.timestamp_millis(),
            hh: 0,
            hl: 0,
            lh: 0,
            ll: 0,
        }
    }
}

/// Tells the device to fetch new firmware from `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpgradeDirective {
    pub uri: String,
    pub url: String,
    #[serde(rename = "newVersion")]
    pub new_version: String,
}

impl UpgradeDirective {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            uri: UPGRADE_URI.to_string(),
            url: url.into(),
            new_version: UPGRADE_VERSION.to_string(),
        }
    }
}

/// What a parsed device frame is asking for.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// Carries a `uri`; the device is reporting, not logging in.
    Notification { uri: Value },
    /// Anything else is treated as a login announcement.
    Identity {
        device_name: Option<String>,
        device_type: Option<String>,
    },
}

impl DeviceMessage {
    pub fn classify(message: &Value) -> Self {
        match message.get("uri") {
            Some(uri) if !uri.is_null() => Self::Notification { uri: uri.clone() },
            _ => Self::Identity {
                device_name: string_field(message, "deviceName"),
                device_type: string_field(message, "type"),
            },
        }
    }
}

fn string_field(message: &Value, key: &str) -> Option<String> {
    message.get(key).and_then(Value::as_str).map(str::to_string)
}
