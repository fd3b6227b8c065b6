//! Wire protocol for Rust <-> simulator communication
//!
//! Messages are serialized as JSON with internally-tagged enums.
//! Format: {"Id": 7, "Type": "MessageType", ...fields}
//!
//! Requests carry an `Id` that the simulator echoes in its response.
//! Pushed messages (`Ready`, `GroundTruth`) carry no `Id`.

use serde::{Deserialize, Serialize};

use crate::model::{BodySample, ControllerInfo, TwistCommand};

/// Messages sent between the Rust bridge and the simulator process
///
/// Note: `rename_all` on enums only affects variant names, not field names inside variants.
/// Each field must be explicitly renamed using `#[serde(rename = "...")]` for PascalCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum SimMessage {
    // === Simulator -> Rust ===
    /// Simulator is ready (first message after connect)
    Ready {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Version")]
        version: String,
    },

    /// Generic success response
    Ack,

    /// Model state response
    ModelState {
        #[serde(rename = "State")]
        state: BodySample,
    },

    /// Controller load response
    ControllerLoaded {
        #[serde(rename = "Ok")]
        ok: bool,
    },

    /// Controller switch response
    ControllerSwitched {
        #[serde(rename = "Ok")]
        ok: bool,
    },

    /// Physics step counter response
    Iteration {
        #[serde(rename = "Iteration")]
        iteration: u64,
    },

    /// Controller manager listing
    Controllers {
        #[serde(rename = "Controllers")]
        controllers: Vec<ControllerInfo>,
    },

    /// Pushed ground-truth sample
    GroundTruth {
        #[serde(rename = "State")]
        state: BodySample,
    },

    /// Error response
    Error {
        #[serde(rename = "Code")]
        code: i32,
        #[serde(rename = "Message")]
        message: String,
    },

    // === Rust -> Simulator ===
    /// Reset the world to its initial configuration
    ResetWorld,

    /// Stop the physics loop
    PausePhysics,

    /// Resume free-running physics
    UnpausePhysics,

    /// Advance a paused simulation by a fixed number of physics steps
    Step {
        #[serde(rename = "Steps")]
        steps: u32,
    },

    /// Request the physics step counter (steps since the last world reset)
    GetIteration,

    /// Request the state of a model
    GetModelState {
        #[serde(rename = "Model")]
        model: String,
    },

    /// Overwrite the state of a model
    SetModelState {
        #[serde(rename = "Model")]
        model: String,
        #[serde(rename = "State")]
        state: BodySample,
    },

    /// Load an actuation controller plugin
    LoadController {
        #[serde(rename = "Name")]
        name: String,
    },

    /// List controllers known to the controller manager
    ListControllers,

    /// Start and/or stop controllers
    SwitchController {
        #[serde(rename = "Start")]
        start: Vec<String>,
        #[serde(rename = "Stop")]
        stop: Vec<String>,
    },

    /// Velocity command for the actuation controller (no response)
    Command {
        #[serde(rename = "Twist")]
        twist: TwistCommand,
    },

    /// Shutdown the bridge connection
    Shutdown,
}

impl SimMessage {
    /// Variant name, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SimMessage::Ready { .. } => "Ready",
            SimMessage::Ack => "Ack",
            SimMessage::ModelState { .. } => "ModelState",
            SimMessage::ControllerLoaded { .. } => "ControllerLoaded",
            SimMessage::ControllerSwitched { .. } => "ControllerSwitched",
            SimMessage::Iteration { .. } => "Iteration",
            SimMessage::Controllers { .. } => "Controllers",
            SimMessage::GroundTruth { .. } => "GroundTruth",
            SimMessage::Error { .. } => "Error",
            SimMessage::ResetWorld => "ResetWorld",
            SimMessage::PausePhysics => "PausePhysics",
            SimMessage::UnpausePhysics => "UnpausePhysics",
            SimMessage::Step { .. } => "Step",
            SimMessage::GetIteration => "GetIteration",
            SimMessage::GetModelState { .. } => "GetModelState",
            SimMessage::SetModelState { .. } => "SetModelState",
            SimMessage::LoadController { .. } => "LoadController",
            SimMessage::ListControllers => "ListControllers",
            SimMessage::SwitchController { .. } => "SwitchController",
            SimMessage::Command { .. } => "Command",
            SimMessage::Shutdown => "Shutdown",
        }
    }
}

/// A message plus its correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub message: SimMessage,
}

impl Frame {
    /// A request expecting a response with the same id
    pub fn request(id: u64, message: SimMessage) -> Self {
        Self {
            id: Some(id),
            message,
        }
    }

    /// A message that expects no response
    pub fn notify(message: SimMessage) -> Self {
        Self { id: None, message }
    }
}

/// Serialize a frame to JSON bytes
pub fn serialize(frame: &Frame) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(frame)
}

/// Deserialize a frame from JSON bytes
pub fn deserialize(bytes: &[u8]) -> Result<Frame, serde_json::Error> {
    serde_json::from_slice(bytes)
}
