//! Agent protocol messages
//!
//! One JSON object per line, internally tagged by `Type`.

use rl_env_core::{Action, EnvDescription, Experience, Sensation};
use serde::{Deserialize, Serialize};

/// Messages sent by the learning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum AgentMessage {
    /// One decision
    Action {
        #[serde(rename = "Action")]
        action: Action,
    },
    /// Episode boundary: the agent finished an episode
    ExperimentInfo {
        #[serde(rename = "EpisodeNumber")]
        episode_number: u64,
        #[serde(rename = "EpisodeReward", default)]
        episode_reward: f64,
    },
}

/// Messages sent to the learning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum HostMessage {
    /// Environment description, once at startup
    Description(EnvDescription),
    /// Recorded transition supplied before the live loop
    SeedExperience(Experience),
    /// Observation and reward after each decision
    StateReward {
        #[serde(rename = "State")]
        state: Sensation,
        #[serde(rename = "Reward")]
        reward: f64,
        #[serde(rename = "Terminal")]
        terminal: bool,
        /// SHA-256 of the observation, when state hashing is enabled
        #[serde(rename = "StateHash", skip_serializing_if = "Option::is_none", default)]
        state_hash: Option<String>,
    },
}

impl HostMessage {
    /// Message type name (for logging)
    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Description(_) => "Description",
            HostMessage::SeedExperience(_) => "SeedExperience",
            HostMessage::StateReward { .. } => "StateReward",
        }
    }
}
