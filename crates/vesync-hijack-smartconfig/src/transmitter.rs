//! Length-modulated UDP broadcast of encoded credentials.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Guide preamble the receiver phase-locks onto.
pub const GUIDE_CODE: [u16; 4] = [515, 514, 513, 512];

/// Filler byte; only the datagram length carries information.
const FILLER: u8 = b'1';

/// Pacing of one broadcast cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastTiming {
    /// How long the guide preamble is repeated each cycle.
    pub guide_duration: Duration,
    /// Delay after every guide datagram.
    pub guide_interval: Duration,
    /// Delay after every payload datagram.
    pub payload_interval: Duration,
    /// Payload repetitions per cycle.
    pub payload_repeats: usize,
    /// Pause after each payload repetition.
    pub repeat_pause: Duration,
    /// Pause at the end of each cycle.
    pub cycle_pause: Duration,
}

impl Default for BroadcastTiming {
    fn default() -> Self {
        Self {
            guide_duration: Duration::from_secs(2),
            guide_interval: Duration::from_millis(8),
            payload_interval: Duration::from_millis(8),
            payload_repeats: 3,
            repeat_pause: Duration::from_millis(500),
            cycle_pause: Duration::from_millis(500),
        }
    }
}

/// Sends the guide preamble and encoded payload, forever.
///
/// There is no feedback from the device, so the loop has no natural end:
/// [`BroadcastTransmitter::run`] only returns once its cancellation token
/// fires (in practice, at process shutdown).
pub struct BroadcastTransmitter {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    lengths: Vec<u16>,
    timing: BroadcastTiming,
    filler: Vec<u8>,
}

impl BroadcastTransmitter {
    /// Create a transmitter for the given encoded lengths.
    pub fn new(socket: Arc<UdpSocket>, target: SocketAddr, lengths: Vec<u16>) -> Self {
        let longest = lengths
            .iter()
            .chain(GUIDE_CODE.iter())
            .copied()
            .max()
            .unwrap_or_default();
        Self {
            socket,
            target,
            lengths,
            timing: BroadcastTiming::default(),
            filler: vec![FILLER; usize::from(longest)],
        }
    }

    /// Override cycle pacing.
    pub fn with_timing(mut self, timing: BroadcastTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Encoded payload lengths.
    pub fn lengths(&self) -> &[u16] {
        &self.lengths
    }

    /// Broadcast until `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) {
        info!(
            target_addr = %self.target,
            datagrams = self.lengths.len(),
            "sending smart config"
        );

        let mut cycles = 0u64;
        while let Some(failed) = self.run_cycle(cancel).await {
            cycles = cycles.saturating_add(1);
            debug!(cycles, failed, "smart config cycle complete");
        }
        info!(cycles, "smart config broadcast stopped");
    }

    /// One guide + payload cycle. Returns the number of failed sends, or
    /// `None` if cancelled part-way.
    async fn run_cycle(&self, cancel: &CancellationToken) -> Option<usize> {
        let mut failed = 0usize;

        let guide_start = Instant::now();
        while guide_start.elapsed() < self.timing.guide_duration {
            for &len in &GUIDE_CODE {
                self.send_length(len, &mut failed).await;
                self.pause(self.timing.guide_interval, cancel).await?;
            }
        }

        for _ in 0..self.timing.payload_repeats {
            for &len in &self.lengths {
                self.send_length(len, &mut failed).await;
                self.pause(self.timing.payload_interval, cancel).await?;
            }
            self.pause(self.timing.repeat_pause, cancel).await?;
        }

        self.pause(self.timing.cycle_pause, cancel).await?;
        Some(failed)
    }

    /// Lost datagrams are resent next cycle. Only the first failure of a
    /// cycle is logged at warn.
    async fn send_length(&self, len: u16, failed: &mut usize) {
        let body = &self.filler[..usize::from(len)];
        if let Err(err) = self.socket.send_to(body, self.target).await {
            if *failed == 0 {
                warn!(dest = %self.target, len, error = %err, "smart config send failed");
            } else {
                debug!(len, error = %err, "smart config send failed");
            }
            *failed += 1;
        }
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Option<()> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(duration) => Some(()),
        }
    }
}
