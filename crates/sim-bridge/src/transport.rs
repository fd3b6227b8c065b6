//! Transport abstractions for the simulator bridge
//!
//! Provides AsyncReader/AsyncWriter traits plus a length-prefixed framing
//! that works over any tokio byte stream (TCP, Unix sockets).

use crate::error::{LinkError, LinkResult};
use crate::model::BodySample;
use crate::protocol::{Frame, SimMessage, deserialize};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, warn};

/// Upper bound on a single message (64MB)
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read a complete message from the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn read_message(&mut self) -> LinkResult<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send {
    /// Write a complete message to the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn write_message(&mut self, data: &[u8]) -> LinkResult<()>;
}

/// Length-prefixed reader over any byte stream
pub struct FramedReader<R>(pub R);

#[async_trait]
impl<R: AsyncRead + Unpin + Send> AsyncReader for FramedReader<R> {
    async fn read_message(&mut self) -> LinkResult<Vec<u8>> {
        // Read 4-byte length prefix (little-endian)
        let mut len_bytes = [0u8; 4];
        self.0
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| LinkError::Ipc(format!("read length failed: {}", e)))?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_MESSAGE_LEN {
            return Err(LinkError::Ipc(format!("Message too large: {} bytes", len)));
        }

        let mut data = vec![0u8; len];
        self.0
            .read_exact(&mut data)
            .await
            .map_err(|e| LinkError::Ipc(format!("read data failed: {}", e)))?;

        Ok(data)
    }
}

/// Length-prefixed writer over any byte stream
pub struct FramedWriter<W>(pub W);

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AsyncWriter for FramedWriter<W> {
    async fn write_message(&mut self, data: &[u8]) -> LinkResult<()> {
        let len = u32::try_from(data.len())
            .map_err(|_| LinkError::Ipc(format!("Message too large: {} bytes", data.len())))?;
        self.0
            .write_all(&len.to_le_bytes())
            .await
            .map_err(|e| LinkError::Ipc(format!("write length failed: {}", e)))?;

        self.0
            .write_all(data)
            .await
            .map_err(|e| LinkError::Ipc(format!("write data failed: {}", e)))?;

        self.0
            .flush()
            .await
            .map_err(|e| LinkError::Ipc(format!("flush failed: {}", e)))?;

        Ok(())
    }
}

/// A request waiting for the response with the same id
pub type PendingRequest = (u64, oneshot::Sender<LinkResult<SimMessage>>);

/// Simulator identity announced in its `Ready` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorInfo {
    pub name: String,
    pub version: String,
}

/// Requests waiting for a response, keyed by id
#[derive(Default)]
struct PendingRequests {
    senders: HashMap<u64, oneshot::Sender<LinkResult<SimMessage>>>,
}

impl PendingRequests {
    /// Take in queued registrations and forget requests whose caller gave up.
    ///
    /// Returns `false` once the request channel is closed.
    fn sync(&mut self, request_rx: &mut mpsc::UnboundedReceiver<PendingRequest>) -> bool {
        let open = loop {
            match request_rx.try_recv() {
                Ok((id, response_tx)) => {
                    self.senders.insert(id, response_tx);
                }
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        };
        // Timed-out requests drop their receiver
        self.senders.retain(|_, tx| !tx.is_closed());
        open
    }

    fn complete(&mut self, id: u64) -> Option<oneshot::Sender<LinkResult<SimMessage>>> {
        self.senders.remove(&id)
    }

    fn fail_all(&mut self) {
        for (_, response_tx) in self.senders.drain() {
            let _ = response_tx.send(Err(LinkError::Closed));
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.senders.len()
    }
}

/// Background reader task that handles incoming messages
///
/// This task:
/// - Stores pushed `GroundTruth` samples in the latest-value channel
/// - Routes responses to the pending request with the matching id
/// - Hands the first `Ready` message to `ready_tx`
///
/// Registrations are always queued before the request is written, so they
/// are drained after each read, before the response is routed.
pub async fn reader_task<R: AsyncReader>(
    mut reader: R,
    mut request_rx: mpsc::UnboundedReceiver<PendingRequest>,
    ground_truth_tx: watch::Sender<Option<BodySample>>,
    ready_tx: oneshot::Sender<SimulatorInfo>,
) {
    let mut pending = PendingRequests::default();
    let mut ready_tx = Some(ready_tx);

    loop {
        let read = reader.read_message().await;
        let requests_closed = !pending.sync(&mut request_rx);

        let data = match read {
            Ok(data) => data,
            Err(e) => {
                error!("Reader task failed: {}", e);
                // Notify all pending requests of failure
                pending.fail_all();
                break;
            }
        };

        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Sim→Rust] len={} json={}", data.len(), json_preview);

        match deserialize(&data) {
            Ok(Frame {
                message: SimMessage::GroundTruth { state },
                ..
            }) => {
                ground_truth_tx.send_replace(Some(state));
            }
            Ok(Frame {
                id: None,
                message: SimMessage::Ready { name, version },
            }) => match ready_tx.take() {
                Some(tx) => {
                    let _ = tx.send(SimulatorInfo { name, version });
                }
                None => warn!("Ignoring repeated Ready from {} v{}", name, version),
            },
            Ok(Frame {
                id: Some(id),
                message,
            }) => match pending.complete(id) {
                Some(response_tx) => {
                    if response_tx.send(Ok(message)).is_err() {
                        debug!("Response {} arrived after its request was abandoned", id);
                    }
                }
                None => warn!(
                    "Received response {} but no pending request (timed out or unknown)",
                    id
                ),
            },
            Ok(Frame { id: None, message }) => {
                warn!("Dropping unsolicited {} message", message.kind());
            }
            Err(e) => {
                error!("Failed to deserialize message: {}", e);
            }
        }

        if requests_closed {
            debug!("Request channel closed, reader task exiting");
            break;
        }
    }
}
