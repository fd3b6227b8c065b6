//! Environment description sent to the agent at startup

use serde::{Deserialize, Serialize};

use crate::action::ActionSpace;

/// Environment description describing spaces and reward bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvDescription {
    /// Human-readable title
    pub title: String,
    /// Number of discrete actions, or length of the action vector
    pub num_actions: usize,
    /// Full action space
    pub action_space: ActionSpace,
    /// Whether the task has episodes
    pub episodic: bool,
    /// Length of the observation vector
    pub num_states: usize,
    /// Per-dimension lower bound of the observation vector
    pub min_state_range: Vec<f64>,
    /// Per-dimension upper bound of the observation vector
    pub max_state_range: Vec<f64>,
    /// Stochastic version of the domain
    pub stochastic: bool,
    /// Largest reward the environment can emit
    pub max_reward: f64,
    /// `max_reward - min_reward`
    pub reward_range: f64,
}

impl EnvDescription {
    /// Build a description from the bounds an environment reports
    pub fn new(
        title: impl Into<String>,
        action_space: ActionSpace,
        episodic: bool,
        features: (Vec<f64>, Vec<f64>),
        rewards: (f64, f64),
        stochastic: bool,
    ) -> Self {
        let (min_state_range, max_state_range) = features;
        let (min_reward, max_reward) = rewards;
        Self {
            title: title.into(),
            num_actions: action_space.num_actions(),
            action_space,
            episodic,
            num_states: min_state_range.len(),
            min_state_range,
            max_state_range,
            stochastic,
            max_reward,
            reward_range: max_reward - min_reward,
        }
    }
}
