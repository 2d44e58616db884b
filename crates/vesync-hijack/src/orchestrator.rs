//! Runs one takeover.
//!
//! The cloud server always runs. With a known device address we configure it
//! directly; otherwise the broadcaster and rendezvous listener run until
//! shutdown, configuring every plug that announces itself.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vesync_hijack_cloud::{CloudConfig, CloudServer};
use vesync_hijack_device::configure_device;
use vesync_hijack_smartconfig::{
    encode_packet_lengths, BroadcastTransmitter, NetworkCredentials, RendezvousListener,
};

use crate::config::HijackConfig;
use crate::error::Result;

pub struct Orchestrator {
    config: HijackConfig,
    credentials: Arc<NetworkCredentials>,
    device: Option<IpAddr>,
}

impl Orchestrator {
    pub fn new(config: HijackConfig, credentials: NetworkCredentials) -> Self {
        Self {
            config,
            credentials: Arc::new(credentials),
            device: None,
        }
    }

    /// Skip broadcasting and configure this device directly.
    pub fn with_device(mut self, device: IpAddr) -> Self {
        self.device = Some(device);
        self
    }

    pub fn credentials(&self) -> &NetworkCredentials {
        &self.credentials
    }

    /// Bind the cloud server; returns it unstarted so callers can read its
    /// address.
    pub async fn bind_cloud(&self) -> Result<CloudServer> {
        let config = CloudConfig {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.http_port)),
            assets_dir: self.config.assets_dir.clone(),
            websocket_path: self.config.websocket_path.clone(),
            upgrade_url: self.config.upgrade_url(self.credentials.local_ip),
        };
        Ok(CloudServer::bind(config).await?)
    }

    /// Run until `cancel` fires.
    ///
    /// Device session failures are logged and do not end the run.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let cloud = self.bind_cloud().await?;
        self.run_with(cloud, cancel).await
    }

    /// [`Orchestrator::run`] with an already-bound cloud server.
    pub async fn run_with(self, cloud: CloudServer, cancel: CancellationToken) -> Result<()> {
        info!(
            ssid = %self.credentials.ssid,
            bssid = %self.credentials.bssid_string(),
            local_ip = %self.credentials.local_ip,
            "using network"
        );

        let server = tokio::spawn(cloud.serve(cancel.clone()));

        let outcome = match self.device {
            Some(device) => {
                info!(%device, "attempting to connect to device");
                // A device session has no timeout; shutdown must not wait on it.
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = configure(device, self.config.device_port, &self.credentials) => {}
                }
                cancel.cancelled().await;
                Ok(())
            }
            None => self.provision(&cancel).await,
        };

        cancel.cancel();
        let served = server.await?;
        outcome?;
        served?;
        Ok(())
    }

    async fn provision(&self, cancel: &CancellationToken) -> Result<()> {
        let lengths = encode_packet_lengths(&self.credentials, self.config.ssid_hidden)?;
        let listener = RendezvousListener::bind(
            self.credentials.local_ip,
            self.config.rendezvous_port,
            self.config.multicast_group,
        )
        .await?;
        let transmitter =
            BroadcastTransmitter::new(listener.socket(), self.config.multicast_target(), lengths)
                .with_timing(self.config.broadcast.clone());

        let credentials = Arc::clone(&self.credentials);
        let device_port = self.config.device_port;
        let on_device = move |device: IpAddr| {
            let credentials = Arc::clone(&credentials);
            async move { configure(device, device_port, &credentials).await }
        };

        info!(group = %self.config.multicast_target(), "sending smart config");
        let (listened, ()) = tokio::join!(
            async {
                let result = listener.run(cancel.clone(), on_device).await;
                if result.is_err() {
                    cancel.cancel();
                }
                result
            },
            transmitter.run(cancel),
        );
        Ok(listened?)
    }
}

async fn configure(device: IpAddr, port: u16, credentials: &NetworkCredentials) {
    if let Err(err) = configure_device(device, port, credentials).await {
        warn!(%device, error = %err, "device configuration failed");
    }
}

/// Cancel `cancel` on Ctrl-C.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            return;
        }
        info!("shutting down");
        cancel.cancel();
    });
}
