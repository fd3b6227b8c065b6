//! Environment host
//!
//! Owns the single environment instance and turns agent messages into
//! environment calls. Passed explicitly to the transport loop.

use crate::environment::Environment;
use crate::messages::{AgentMessage, HostMessage};
use rl_env_core::{Result, Sensation};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Host options fixed before the first reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostOptions {
    /// Reported in the environment description
    pub stochastic: bool,
    /// Attach a SHA-256 of every observation to state messages
    pub hash_states: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            stochastic: true,
            hash_states: false,
        }
    }
}

/// Context object driving one environment
pub struct EnvHost<E: Environment> {
    env: E,
    options: HostOptions,
    /// Decisions applied in the current episode
    decisions: u64,
    /// Reward accumulated in the current episode
    episode_reward: f64,
}

impl<E: Environment> EnvHost<E> {
    pub fn new(env: E, options: HostOptions) -> Self {
        Self {
            env,
            options,
            decisions: 0,
            episode_reward: 0.0,
        }
    }

    /// Hosted environment
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Startup sequence: description, seed experiences, then the first state
    pub async fn startup(&mut self) -> Result<Vec<HostMessage>> {
        let description = self.env.describe(self.options.stochastic);
        info!(
            "Starting {} ({} actions, {} features)",
            description.title, description.num_actions, description.num_states
        );

        let mut messages = vec![HostMessage::Description(description)];

        let seedings = self.env.seedings().await?;
        if !seedings.is_empty() {
            info!("Sending {} seed experiences", seedings.len());
        }
        messages.extend(seedings.into_iter().map(HostMessage::SeedExperience));

        messages.push(self.begin_episode().await?);
        Ok(messages)
    }

    /// Handle one agent message and produce the reply
    pub async fn handle(&mut self, message: AgentMessage) -> Result<HostMessage> {
        match message {
            AgentMessage::Action { action } => {
                let reward = self.env.apply(&action).await?;
                let state = self.env.sensation().await?;
                let terminal = self.env.terminal();

                self.decisions += 1;
                self.episode_reward += reward;
                if terminal {
                    info!(
                        "Episode finished after {} decisions (reward {:.3})",
                        self.decisions, self.episode_reward
                    );
                }
                Ok(self.state_message(state, reward, terminal))
            }
            AgentMessage::ExperimentInfo {
                episode_number,
                episode_reward,
            } => {
                info!(
                    "Episode {} reported by agent: reward {:.3}",
                    episode_number, episode_reward
                );
                self.begin_episode().await
            }
        }
    }

    /// Shut down the environment
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down {}", self.env.title());
        self.env.shutdown().await
    }

    async fn begin_episode(&mut self) -> Result<HostMessage> {
        self.env.reset().await?;
        self.decisions = 0;
        self.episode_reward = 0.0;

        let state = self.env.sensation().await?;
        debug!("Episode start state: {:?}", state);
        Ok(self.state_message(state, 0.0, false))
    }

    fn state_message(&self, state: Sensation, reward: f64, terminal: bool) -> HostMessage {
        let state_hash = self.options.hash_states.then(|| state_hash(&state));
        HostMessage::StateReward {
            state,
            reward,
            terminal,
            state_hash,
        }
    }
}

/// SHA-256 over the little-endian bytes of each observation element
pub fn state_hash(state: &[f64]) -> String {
    let mut hasher = Sha256::new();
    for value in state {
        hasher.update(value.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}
