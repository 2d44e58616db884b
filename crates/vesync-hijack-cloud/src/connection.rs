use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cipher;
use crate::error::{CloudError, Result};
use crate::message::{
    DeviceMessage, LoginReply, UpgradeDirective, EXPECTED_DEVICE_NAME, EXPECTED_DEVICE_TYPE,
};

/// A WebSocket frame from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
}

/// A WebSocket frame to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
}

/// Per-connection command channel state.
///
/// A device speaks either plaintext text frames or encrypted binary frames
/// for the life of a connection. The first binary frame switches the
/// connection to encrypted replies for good. The upgrade directive is sent at
/// most once per connection.
///
/// A message that fails validation is reported to the caller and dropped;
/// the connection stays usable for the next message.
#[derive(Debug, Clone)]
pub struct DeviceSocketConnection {
    encryption_enabled: bool,
    upgrade_sent: bool,
    upgrade_url: String,
}

impl DeviceSocketConnection {
    /// `upgrade_url` is the origin of our HTTP server.
    pub fn new(upgrade_url: impl Into<String>) -> Self {
        Self {
            encryption_enabled: false,
            upgrade_sent: false,
            upgrade_url: upgrade_url.into(),
        }
    }

    pub fn encryption_enabled(&self) -> bool {
        self.encryption_enabled
    }

    pub fn upgrade_sent(&self) -> bool {
        self.upgrade_sent
    }

    /// Handle one inbound frame and return the frames to send in reply.
    pub fn handle<Tz: TimeZone>(
        &mut self,
        frame: Inbound,
        now: &DateTime<Tz>,
    ) -> Result<Vec<Outbound>> {
        let plaintext = self.open(frame)?;
        let message: Value = serde_json::from_slice(&plaintext)?;
        debug!(%message, encrypted = self.encryption_enabled, "device message");

        let (device_name, device_type) = match DeviceMessage::classify(&message) {
            DeviceMessage::Notification { uri } => {
                debug!(%uri, "ignoring device notification");
                return Ok(Vec::new());
            }
            DeviceMessage::Identity {
                device_name,
                device_type,
            } => (device_name, device_type),
        };

        if device_name.as_deref() != Some(EXPECTED_DEVICE_NAME)
            || device_type.as_deref() != Some(EXPECTED_DEVICE_TYPE)
        {
            return Err(CloudError::UnexpectedDevice {
                device_name,
                device_type,
            });
        }

        let mut replies = vec![self.seal(&LoginReply::at(now))?];
        if !self.upgrade_sent {
            info!(url = %self.upgrade_url, "initiating device upgrade");
            replies.push(self.seal(&UpgradeDirective::new(self.upgrade_url.clone()))?);
            self.upgrade_sent = true;
        }
        Ok(replies)
    }

    fn open(&mut self, frame: Inbound) -> Result<Vec<u8>> {
        match frame {
            Inbound::Text(text) => Ok(text.into_bytes()),
            Inbound::Binary(data) => {
                self.encryption_enabled = true;
                cipher::decrypt(&data)
            }
        }
    }

    fn seal<T: Serialize>(&self, message: &T) -> Result<Outbound> {
        let text = serde_json::to_string(message)?;
        if self.encryption_enabled {
            Ok(Outbound::Binary(cipher::encrypt(text.as_bytes())))
        } else {
            Ok(Outbound::Text(text))
        }
    }
}
