//! TCP transport for the simulator bridge
//!
//! Used when the simulator plugin listens on a TCP port.

use crate::error::{LinkError, LinkResult};
use crate::transport::{FramedReader, FramedWriter};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::info;

/// TCP read half with length-prefixed framing
pub type TcpReader = FramedReader<OwnedReadHalf>;

/// TCP write half with length-prefixed framing
pub type TcpWriter = FramedWriter<OwnedWriteHalf>;

/// Connect to `addr` and split the stream into framed halves
pub async fn connect(addr: &str, timeout: Duration) -> LinkResult<(TcpReader, TcpWriter)> {
    info!("Connecting to simulator at {}", addr);

    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| LinkError::Ipc(format!("Connection timeout to {}", addr)))?
        .map_err(|e| LinkError::Ipc(format!("Failed to connect to {}: {}", addr, e)))?;

    // Disable Nagle's algorithm for low latency
    stream
        .set_nodelay(true)
        .map_err(|e| LinkError::Ipc(format!("Failed to set TCP_NODELAY: {}", e)))?;

    let (read_half, write_half) = stream.into_split();
    Ok((FramedReader(read_half), FramedWriter(write_half)))
}
