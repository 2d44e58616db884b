use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};
use vesync_hijack_frame::DeviceCodec;

use crate::error::{DeviceError, Result};

type ReplySender = oneshot::Sender<Result<Value>>;

/// Lifecycle of a configuration session once the socket is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    AwaitingReply,
    Closed,
}

/// Single-slot request/reply correlation shared with the receive task.
#[derive(Default)]
struct Correlation {
    pending: Option<ReplySender>,
    closed: Option<String>,
}

/// One TCP session with a plug.
///
/// A background task owns the receive side: it reassembles frames, resolves
/// the outstanding request with the next reply, and fails it with
/// [`DeviceError::Disconnected`] when the device closes the connection.
/// At most one request is outstanding at a time.
pub struct DeviceSession {
    peer: SocketAddr,
    writer: FramedWrite<OwnedWriteHalf, DeviceCodec>,
    correlation: Arc<Mutex<Correlation>>,
    receiver: JoinHandle<()>,
}

impl DeviceSession {
    /// Connect to a device's configuration port.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| DeviceError::Connect { addr, source })?;
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let correlation = Arc::new(Mutex::new(Correlation::default()));
        let receiver = tokio::spawn(receive_loop(
            FramedRead::new(read_half, DeviceCodec::new()),
            Arc::clone(&correlation),
            peer,
        ));

        Ok(Self {
            peer,
            writer: FramedWrite::new(write_half, DeviceCodec::new()),
            correlation,
            receiver,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        let correlation = lock(&self.correlation);
        if correlation.closed.is_some() {
            SessionState::Closed
        } else if correlation.pending.is_some() {
            SessionState::AwaitingReply
        } else {
            SessionState::Connected
        }
    }

    /// Send one message without waiting for a reply.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let body = serde_json::to_vec(message)?;
        debug!(device = %self.peer, len = body.len(), "sending device frame");
        self.writer.send(Bytes::from(body)).await?;
        Ok(())
    }

    /// Send one message and wait for the next frame from the device.
    ///
    /// There is no timeout: a silent device is only detected when it closes
    /// the connection.
    pub async fn request<T: Serialize>(&mut self, message: &T) -> Result<Value> {
        let reply = self.register_pending()?;

        if let Err(err) = self.send(message).await {
            lock(&self.correlation).pending = None;
            return Err(err);
        }

        reply
            .await
            .map_err(|_| DeviceError::Disconnected("receive task ended".to_string()))?
    }

    /// Shut down the write side and stop the receive task.
    pub async fn close(mut self) -> Result<()> {
        let result = self.writer.close().await;
        lock(&self.correlation)
            .closed
            .get_or_insert_with(|| "closed locally".to_string());
        result.map_err(Into::into)
    }

    fn register_pending(&self) -> Result<oneshot::Receiver<Result<Value>>> {
        let mut correlation = lock(&self.correlation);
        if let Some(reason) = &correlation.closed {
            return Err(DeviceError::Disconnected(reason.clone()));
        }
        // A previous request whose caller gave up leaves a dead sender behind.
        if matches!(&correlation.pending, Some(sender) if !sender.is_closed()) {
            return Err(DeviceError::RequestInFlight);
        }

        let (tx, rx) = oneshot::channel();
        correlation.pending = Some(tx);
        Ok(rx)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(
    mut frames: FramedRead<OwnedReadHalf, DeviceCodec>,
    correlation: Arc<Mutex<Correlation>>,
    peer: SocketAddr,
) {
    let reason = loop {
        let frame = match frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => break err.to_string(),
            None => break "connection closed by device".to_string(),
        };

        let parsed = serde_json::from_slice::<Value>(&frame.body).map_err(DeviceError::from);
        let pending = lock(&correlation).pending.take();
        match (pending, parsed) {
            (Some(reply), parsed) => {
                let _ = reply.send(parsed);
            }
            (None, Ok(message)) => info!(device = %peer, %message, "unsolicited device message"),
            (None, Err(err)) => warn!(device = %peer, error = %err, body = %frame.text(), "unparseable device message"),
        }
    };

    debug!(device = %peer, %reason, "device session receive ended");
    let mut correlation = lock(&correlation);
    if let Some(reply) = correlation.pending.take() {
        let _ = reply.send(Err(DeviceError::Disconnected(reason.clone())));
    }
    correlation.closed.get_or_insert(reason);
}

fn lock(correlation: &Mutex<Correlation>) -> MutexGuard<'_, Correlation> {
    correlation.lock().unwrap_or_else(PoisonError::into_inner)
}
