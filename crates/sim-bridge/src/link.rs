//! Simulator/actuation boundary
//!
//! [`SimulatorLink`] is the blocking request/response surface environments
//! drive. [`BridgeLink`] implements it over the framed wire protocol.

use crate::error::{LinkError, LinkResult};
use crate::model::{BodySample, ControllerInfo, TwistCommand};
use crate::protocol::{Frame, SimMessage, serialize};
use crate::transport::{AsyncReader, AsyncWriter, PendingRequest, SimulatorInfo, reader_task};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Request/response calls into the simulator and its controller manager.
///
/// Every async method blocks the caller until the simulator answers or the
/// transport fails. A link is owned by exactly one environment.
#[async_trait]
pub trait SimulatorLink: Send {
    /// Reset the world to its initial configuration
    async fn reset_world(&mut self) -> LinkResult<()>;

    /// Stop the physics loop
    async fn pause_physics(&mut self) -> LinkResult<()>;

    /// Resume free-running physics
    async fn unpause_physics(&mut self) -> LinkResult<()>;

    /// Advance a paused simulation by `steps` physics steps
    async fn step(&mut self, steps: u32) -> LinkResult<()>;

    /// Physics steps executed since the last world reset
    async fn iteration(&mut self) -> LinkResult<u64>;

    /// Current state of `model`
    async fn model_state(&mut self, model: &str) -> LinkResult<BodySample>;

    /// Overwrite the state of `model`
    async fn set_model_state(&mut self, model: &str, state: &BodySample) -> LinkResult<()>;

    /// Load a controller plugin; `Ok(false)` means the manager refused
    async fn load_controller(&mut self, name: &str) -> LinkResult<bool>;

    /// Controllers known to the controller manager
    async fn list_controllers(&mut self) -> LinkResult<Vec<ControllerInfo>>;

    /// Start and stop controllers; `Ok(false)` means the manager refused
    async fn switch_controller(&mut self, start: &[String], stop: &[String]) -> LinkResult<bool>;

    /// Publish a velocity command (no response)
    async fn publish_command(&mut self, command: &TwistCommand) -> LinkResult<()>;

    /// Latest-value feed of pushed ground-truth samples, if the simulator publishes one
    fn ground_truth(&self) -> Option<watch::Receiver<Option<BodySample>>>;

    /// Close the link
    async fn shutdown(&mut self) -> LinkResult<()>;
}

/// Where the simulator plugin listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEndpoint {
    /// `host:port`
    Tcp(String),
    /// `unix:/path/to/socket`
    #[cfg(unix)]
    Unix(PathBuf),
}

impl FromStr for SimEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            #[cfg(unix)]
            return Ok(SimEndpoint::Unix(PathBuf::from(path)));
            #[cfg(not(unix))]
            return Err(format!("Unix sockets are not supported here: {}", path));
        }
        let addr = s.strip_prefix("tcp:").unwrap_or(s);
        if addr.rsplit_once(':').is_none() {
            return Err(format!("Expected host:port or unix:/path, got {}", s));
        }
        Ok(SimEndpoint::Tcp(addr.to_string()))
    }
}

impl fmt::Display for SimEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEndpoint::Tcp(addr) => write!(f, "{}", addr),
            #[cfg(unix)]
            SimEndpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Configuration for the simulator bridge connection
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Simulator plugin endpoint (default: 127.0.0.1:11347)
    pub endpoint: SimEndpoint,
    /// Timeout for connecting and receiving `Ready`
    pub connect_timeout: Duration,
    /// Timeout for each request/response round trip
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: SimEndpoint::Tcp("127.0.0.1:11347".into()),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Bridge to the simulator plugin over the framed wire protocol
pub struct BridgeLink {
    /// Connection configuration
    config: BridgeConfig,
    /// Writer half of the connection
    writer: Option<Box<dyn AsyncWriter>>,
    /// Channel registering requests with the reader task
    request_tx: mpsc::UnboundedSender<PendingRequest>,
    /// Latest pushed ground-truth sample
    ground_truth: watch::Receiver<Option<BodySample>>,
    /// Next request id
    next_id: u64,
    /// Identity announced by the simulator
    info: SimulatorInfo,
    /// Background reader task handle
    reader_handle: JoinHandle<()>,
}

impl BridgeLink {
    /// Connect to the configured endpoint and wait for `Ready`
    pub async fn connect(config: BridgeConfig) -> LinkResult<Self> {
        match &config.endpoint {
            SimEndpoint::Tcp(addr) => {
                let (reader, writer) = crate::tcp::connect(addr, config.connect_timeout).await?;
                Self::from_transport(config, reader, writer).await
            }
            #[cfg(unix)]
            SimEndpoint::Unix(path) => {
                let (reader, writer) =
                    crate::unix::connect(path, config.connect_timeout).await?;
                Self::from_transport(config, reader, writer).await
            }
        }
    }

    /// Run the bridge over an already-established transport
    pub async fn from_transport<R, W>(config: BridgeConfig, reader: R, writer: W) -> LinkResult<Self>
    where
        R: AsyncReader + 'static,
        W: AsyncWriter + 'static,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (ground_truth_tx, ground_truth) = watch::channel(None);
        let (ready_tx, ready_rx) = oneshot::channel();

        let reader_handle =
            tokio::spawn(reader_task(reader, request_rx, ground_truth_tx, ready_tx));

        let info = match tokio::time::timeout(config.connect_timeout, ready_rx).await {
            Ok(Ok(info)) => info,
            Ok(Err(_)) => {
                reader_handle.abort();
                return Err(LinkError::Closed);
            }
            Err(_) => {
                reader_handle.abort();
                return Err(LinkError::Timeout {
                    request: "Ready".into(),
                    timeout_ms: config.connect_timeout.as_millis() as u64,
                });
            }
        };
        info!("Connected to {} v{}", info.name, info.version);

        Ok(Self {
            config,
            writer: Some(Box::new(writer)),
            request_tx,
            ground_truth,
            next_id: 1,
            info,
            reader_handle,
        })
    }

    /// Identity announced by the simulator
    pub fn simulator(&self) -> &SimulatorInfo {
        &self.info
    }

    async fn write(&mut self, frame: &Frame) -> LinkResult<()> {
        let data = serialize(frame)?;

        // Log outgoing message
        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Rust→Sim] len={} json={}", data.len(), json_preview);

        let writer = self.writer.as_mut().ok_or(LinkError::NotConnected)?;
        writer.write_message(&data).await
    }

    /// Send a message and wait for the response with the same id
    async fn request(&mut self, message: SimMessage) -> LinkResult<SimMessage> {
        if self.writer.is_none() {
            return Err(LinkError::NotConnected);
        }
        let id = self.next_id;
        self.next_id += 1;
        let request = message.kind();

        // Register before writing so the reader task can route the response
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send((id, response_tx))
            .map_err(|_| LinkError::Closed)?;

        self.write(&Frame::request(id, message)).await?;

        let response = tokio::time::timeout(self.config.request_timeout, response_rx)
            .await
            .map_err(|_| LinkError::Timeout {
                request: request.to_string(),
                timeout_ms: self.config.request_timeout.as_millis() as u64,
            })?
            .map_err(|_| LinkError::Closed)??;

        match response {
            SimMessage::Error { code, message } => Err(LinkError::Remote { code, message }),
            other => Ok(other),
        }
    }

    /// Send a message without waiting for response (fire-and-forget)
    async fn send(&mut self, message: SimMessage) -> LinkResult<()> {
        self.write(&Frame::notify(message)).await
    }

    async fn request_ack(&mut self, message: SimMessage) -> LinkResult<()> {
        let request = message.kind();
        match self.request(message).await? {
            SimMessage::Ack => Ok(()),
            other => Err(unexpected(request, &other)),
        }
    }
}

fn unexpected(request: &str, response: &SimMessage) -> LinkError {
    LinkError::UnexpectedResponse {
        request: request.to_string(),
        response: response.kind().to_string(),
    }
}

impl Drop for BridgeLink {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

#[async_trait]
impl SimulatorLink for BridgeLink {
    async fn reset_world(&mut self) -> LinkResult<()> {
        self.request_ack(SimMessage::ResetWorld).await
    }

    async fn pause_physics(&mut self) -> LinkResult<()> {
        self.request_ack(SimMessage::PausePhysics).await
    }

    async fn unpause_physics(&mut self) -> LinkResult<()> {
        self.request_ack(SimMessage::UnpausePhysics).await
    }

    async fn step(&mut self, steps: u32) -> LinkResult<()> {
        self.request_ack(SimMessage::Step { steps }).await
    }

    async fn iteration(&mut self) -> LinkResult<u64> {
        match self.request(SimMessage::GetIteration).await? {
            SimMessage::Iteration { iteration } => Ok(iteration),
            other => Err(unexpected("GetIteration", &other)),
        }
    }

    async fn model_state(&mut self, model: &str) -> LinkResult<BodySample> {
        let response = self
            .request(SimMessage::GetModelState {
                model: model.to_string(),
            })
            .await?;

        match response {
            SimMessage::ModelState { state } => Ok(state),
            other => Err(unexpected("GetModelState", &other)),
        }
    }

    async fn set_model_state(&mut self, model: &str, state: &BodySample) -> LinkResult<()> {
        self.request_ack(SimMessage::SetModelState {
            model: model.to_string(),
            state: *state,
        })
        .await
    }

    async fn load_controller(&mut self, name: &str) -> LinkResult<bool> {
        let response = self
            .request(SimMessage::LoadController {
                name: name.to_string(),
            })
            .await?;

        match response {
            SimMessage::ControllerLoaded { ok } => Ok(ok),
            other => Err(unexpected("LoadController", &other)),
        }
    }

    async fn list_controllers(&mut self) -> LinkResult<Vec<ControllerInfo>> {
        match self.request(SimMessage::ListControllers).await? {
            SimMessage::Controllers { controllers } => Ok(controllers),
            other => Err(unexpected("ListControllers", &other)),
        }
    }

    async fn switch_controller(&mut self, start: &[String], stop: &[String]) -> LinkResult<bool> {
        let response = self
            .request(SimMessage::SwitchController {
                start: start.to_vec(),
                stop: stop.to_vec(),
            })
            .await?;

        match response {
            SimMessage::ControllerSwitched { ok } => Ok(ok),
            other => Err(unexpected("SwitchController", &other)),
        }
    }

    async fn publish_command(&mut self, command: &TwistCommand) -> LinkResult<()> {
        self.send(SimMessage::Command { twist: *command }).await
    }

    fn ground_truth(&self) -> Option<watch::Receiver<Option<BodySample>>> {
        Some(self.ground_truth.clone())
    }

    async fn shutdown(&mut self) -> LinkResult<()> {
        if self.writer.is_some() {
            self.send(SimMessage::Shutdown).await?;
        }
        self.writer = None;
        Ok(())
    }
}
