//! Line-delimited JSON transport for the agent protocol

use crate::environment::Environment;
use crate::host::EnvHost;
use crate::messages::{AgentMessage, HostMessage};
use rl_env_core::{EnvError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// Run the agent loop on stdin/stdout
pub async fn run<E: Environment>(host: &mut EnvHost<E>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    info!("rl-env host starting on stdio");
    run_lines(host, reader, writer).await
}

/// Run the agent loop over any line-oriented byte streams
///
/// Returns when the agent disconnects (EOF) or a fatal error occurs. The
/// environment is shut down in both cases.
pub async fn run_lines<E, R, W>(host: &mut EnvHost<E>, mut reader: R, mut writer: W) -> Result<()>
where
    E: Environment,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = serve(host, &mut reader, &mut writer).await;

    if let Err(e) = &result {
        error!("Fatal: {}", e);
    }
    if let Err(e) = host.shutdown().await {
        warn!("Environment shutdown failed: {}", e);
    }
    result
}

async fn serve<E, R, W>(host: &mut EnvHost<E>, reader: &mut R, writer: &mut W) -> Result<()>
where
    E: Environment,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for message in host.startup().await? {
        write_message(writer, &message).await?;
    }

    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| EnvError::Transport(format!("Failed to read stdin: {}", e)))?;

        if bytes_read == 0 {
            // EOF - agent disconnected
            info!("Agent disconnected (EOF)");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!("Received: {}", trimmed);

        let message: AgentMessage = match serde_json::from_str(trimmed) {
            Ok(m) => m,
            Err(e) => {
                error!("Failed to parse agent message: {}", e);
                continue;
            }
        };

        match host.handle(message).await {
            Ok(reply) => write_message(writer, &reply).await?,
            Err(e) if !e.is_fatal() => warn!("Skipping agent message: {}", e),
            Err(e) => return Err(e),
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &HostMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;

    let json_preview: String = json.chars().take(200).collect();
    debug!("Sending {}: {}", message.kind(), json_preview);

    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| EnvError::Transport(format!("Failed to write stdout: {}", e)))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| EnvError::Transport(format!("Failed to write newline: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| EnvError::Transport(format!("Failed to flush stdout: {}", e)))?;
    Ok(())
}
