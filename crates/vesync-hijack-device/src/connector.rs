use std::net::{IpAddr, SocketAddr};

use serde_json::Value;
use tracing::{debug, info};
use vesync_hijack_smartconfig::NetworkCredentials;

use crate::command::BeginConfigRequest;
use crate::error::Result;
use crate::session::DeviceSession;

/// TCP port plugs accept configuration on.
pub const DEVICE_CONFIG_PORT: u16 = 41234;

/// Run one configuration session against a device.
///
/// Connects, sends `/beginConfigRequest` pointing the device at
/// `credentials.local_ip`, and returns the device's reply. The socket is
/// closed on every path. Nothing is retried.
pub async fn configure_device(
    device: IpAddr,
    port: u16,
    credentials: &NetworkCredentials,
) -> Result<Value> {
    let addr = SocketAddr::new(device, port);
    let mut session = DeviceSession::connect(addr).await?;
    info!(device = %addr, "connected to device");

    let result = session.request(&BeginConfigRequest::now(credentials)).await;
    if let Err(err) = session.close().await {
        debug!(device = %addr, error = %err, "device socket close failed");
    }

    let reply = result?;
    info!(device = %addr, %reply, "device accepted configuration");
    Ok(reply)
}
