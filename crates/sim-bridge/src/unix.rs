//! Unix socket transport for the simulator bridge
//!
//! Used when the simulator plugin and rl-env share a host.

use crate::error::{LinkError, LinkResult};
use crate::transport::{FramedReader, FramedWriter};
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::info;

/// Unix socket read half with length-prefixed framing
pub type UnixReader = FramedReader<OwnedReadHalf>;

/// Unix socket write half with length-prefixed framing
pub type UnixWriter = FramedWriter<OwnedWriteHalf>;

/// Connect to the socket at `path` and split it into framed halves
pub async fn connect(path: &Path, timeout: Duration) -> LinkResult<(UnixReader, UnixWriter)> {
    info!("Connecting to simulator at {}", path.display());

    let stream = tokio::time::timeout(timeout, UnixStream::connect(path))
        .await
        .map_err(|_| LinkError::Ipc(format!("Connection timeout to {}", path.display())))?
        .map_err(|e| LinkError::Ipc(format!("Failed to connect to {}: {}", path.display(), e)))?;

    let (read_half, write_half) = stream.into_split();
    Ok((FramedReader(read_half), FramedWriter(write_half)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AsyncReader, AsyncWriter};
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_frames_cross_unix_socket() {
        let dir = std::env::temp_dir().join(format!("rl-env-unix-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sim.sock");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, write_half) = stream.into_split();
            let mut reader = FramedReader(read_half);
            let mut writer = FramedWriter(write_half);
            let data = reader.read_message().await.unwrap();
            writer.write_message(&data).await.unwrap();
        });

        let (mut reader, mut writer) = connect(&path, Duration::from_secs(1)).await.unwrap();
        writer.write_message(b"{\"Type\":\"Ack\"}").await.unwrap();
        let echoed = reader.read_message().await.unwrap();
        assert_eq!(echoed, b"{\"Type\":\"Ack\"}");

        server.await.unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
