//! Observations, rewards and recorded transitions

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Fixed-length observation vector handed to the agent
pub type Sensation = Vec<f64>;

/// One complete transition, used to seed the agent before the live loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Experience {
    /// Observation before the action
    pub from_state: Sensation,
    /// Action taken
    pub action: Action,
    /// Immediate reward
    pub reward: f64,
    /// Observation after the action
    pub to_state: Sensation,
    /// Whether the transition ended the episode
    pub terminal: bool,
}
