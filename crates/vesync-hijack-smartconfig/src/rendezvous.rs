//! Device self-announcements after a plug joins the network.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SmartConfigError};

/// Repeat announcements from the same source inside this window are dropped.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(3);

const RECV_BUFFER_SIZE: usize = 1500;

/// Single-entry de-duplication of device announcements.
///
/// Only the most recent source is remembered. Its timestamp is refreshed
/// only when an announcement is admitted, so a device that keeps announcing
/// is re-admitted once per window.
#[derive(Debug, Clone)]
pub struct AnnouncementFilter {
    last: Option<(IpAddr, Instant)>,
    window: Duration,
}

impl Default for AnnouncementFilter {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

impl AnnouncementFilter {
    pub fn new(window: Duration) -> Self {
        Self { last: None, window }
    }

    /// Returns `true` if an announcement from `source` at `now` should start
    /// a device session.
    pub fn admit(&mut self, source: IpAddr, now: Instant) -> bool {
        if let Some((last_source, last_seen)) = self.last {
            if last_source == source && now.saturating_duration_since(last_seen) < self.window {
                return false;
            }
        }
        self.last = Some((source, now));
        true
    }
}

/// UDP socket that turns device announcements into session dispatches.
///
/// The same socket doubles as the smart config broadcast source; see
/// [`RendezvousListener::socket`].
pub struct RendezvousListener {
    socket: Arc<UdpSocket>,
    filter: AnnouncementFilter,
}

impl RendezvousListener {
    /// Bind to `local_ip:port`, enable broadcast, send multicast out of the
    /// `local_ip` interface with TTL 1, and join `multicast_group`.
    pub async fn bind(local_ip: Ipv4Addr, port: u16, multicast_group: Ipv4Addr) -> Result<Self> {
        let addr = SocketAddr::from((local_ip, port));
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket
            .bind(&addr.into())
            .map_err(|source| SmartConfigError::Bind { addr, source })?;
        socket.set_broadcast(true)?;
        socket.set_multicast_if_v4(&local_ip)?;
        socket.set_multicast_ttl_v4(1)?;
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket.into())?;

        if let Err(err) = socket.join_multicast_v4(multicast_group, local_ip) {
            // Sending to the group works without membership.
            warn!(group = %multicast_group, error = %err, "failed to join multicast group");
        }

        info!(addr = %socket.local_addr()?, "listening for devices");
        Ok(Self {
            socket: Arc::new(socket),
            filter: AnnouncementFilter::default(),
        })
    }

    /// Override the de-duplication window.
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.filter = AnnouncementFilter::new(window);
        self
    }

    /// Shared handle to the underlying socket.
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive announcements until `cancel` fires.
    ///
    /// Each admitted source is handed to `on_device` on its own task, so a
    /// slow device session never stalls the receive loop.
    pub async fn run<F, Fut>(mut self, cancel: CancellationToken, on_device: F) -> Result<()>
    where
        F: Fn(IpAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, from) = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                received = self.socket.recv_from(&mut buf) => received?,
            };

            let source = from.ip();
            if !self.filter.admit(source, Instant::now()) {
                debug!(%source, len, "ignoring repeat announcement");
                continue;
            }

            info!(%source, len, "device announced");
            tokio::spawn(on_device(source));
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    const DEVICE_A: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50));
    const DEVICE_B: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 51));

    #[test]
    fn repeat_inside_window_is_dropped() {
        let mut filter = AnnouncementFilter::default();
        let t0 = Instant::now();

        assert!(filter.admit(DEVICE_A, t0));
        assert!(!filter.admit(DEVICE_A, t0 + Duration::from_millis(2999)));
    }

    #[test]
    fn repeat_after_window_is_admitted() {
        let mut filter = AnnouncementFilter::default();
        let t0 = Instant::now();

        assert!(filter.admit(DEVICE_A, t0));
        assert!(filter.admit(DEVICE_A, t0 + Duration::from_secs(3)));
    }

    #[test]
    fn different_sources_are_both_admitted() {
        let mut filter = AnnouncementFilter::default();
        let t0 = Instant::now();

        assert!(filter.admit(DEVICE_A, t0));
        assert!(filter.admit(DEVICE_B, t0 + Duration::from_millis(10)));
        // Only the latest source is remembered.
        assert!(filter.admit(DEVICE_A, t0 + Duration::from_millis(20)));
    }

    #[test]
    fn suppressed_repeats_do_not_extend_window() {
        let mut filter = AnnouncementFilter::default();
        let t0 = Instant::now();

        assert!(filter.admit(DEVICE_A, t0));
        assert!(!filter.admit(DEVICE_A, t0 + Duration::from_secs(2)));
        assert!(filter.admit(DEVICE_A, t0 + Duration::from_millis(3500)));
    }

    #[tokio::test]
    async fn listener_pins_multicast_to_local_interface() {
        let listener = RendezvousListener::bind(Ipv4Addr::LOCALHOST, 0, Ipv4Addr::new(234, 100, 100, 100))
            .await
            .expect("listener should bind");
        let socket = listener.socket();

        let sock = socket2::SockRef::from(&*socket);
        assert_eq!(
            sock.multicast_if_v4().expect("multicast interface readable"),
            Ipv4Addr::LOCALHOST
        );
        assert!(sock.broadcast().expect("broadcast flag readable"));
        assert_eq!(socket.multicast_ttl_v4().expect("ttl readable"), 1);
    }

    #[tokio::test]
    async fn listener_dispatches_once_per_burst() {
        let listener = RendezvousListener::bind(Ipv4Addr::LOCALHOST, 0, Ipv4Addr::new(234, 100, 100, 100))
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("listener addr");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listener.run(cancel.clone(), move |source| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(source);
            }
        }));

        let device = UdpSocket::bind("127.0.0.1:0").await.expect("device should bind");
        device.send_to(b"\x1bannounce", addr).await.expect("first send");
        device.send_to(b"\x1bannounce", addr).await.expect("second send");

        let source = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("dispatch should happen")
            .expect("channel open");
        assert_eq!(source, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let second = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(second.is_err(), "repeat announcement should not dispatch");

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("listener should stop")
            .expect("listener task should not panic");
        assert!(result.is_ok());
    }
}
