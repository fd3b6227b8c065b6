//! Environment trait

use async_trait::async_trait;
use rl_env_core::{Action, ActionSpace, EnvDescription, Experience, Result, Sensation};

/// Trait for implementing environments
///
/// Implement this trait to expose a simulated system to a learning agent.
/// The agent drives a strict loop: `apply` → `sensation` → `terminal`, with
/// `reset` at every episode boundary. `apply` is only valid between a
/// `reset` and the next `terminal() == true`.
#[async_trait]
pub trait Environment: Send + 'static {
    /// Current observation.
    ///
    /// May take in a newly-arrived sample. Repeated calls with no new sample
    /// and no `apply` in between return identical vectors.
    async fn sensation(&mut self) -> Result<Sensation>;

    /// Apply one action, advance by exactly one decision interval and
    /// return the immediate reward
    async fn apply(&mut self, action: &Action) -> Result<f64>;

    /// Episode-end test
    fn terminal(&mut self) -> bool;

    /// Return to the canonical start state; blocks until the next `apply` is valid
    async fn reset(&mut self) -> Result<()>;

    /// Per-dimension observation bounds
    fn min_max_features(&self) -> (Vec<f64>, Vec<f64>);

    /// Smallest and largest immediate reward
    fn min_max_reward(&self) -> (f64, f64);

    /// Declared action space
    fn action_space(&self) -> ActionSpace;

    /// Number of discrete actions, or action vector length
    fn num_actions(&self) -> usize {
        self.action_space().num_actions()
    }

    fn is_episodic(&self) -> bool;

    fn title(&self) -> String;

    /// Transitions handed to the agent before the live loop
    async fn seedings(&mut self) -> Result<Vec<Experience>> {
        Ok(Vec::new())
    }

    /// Called when the host shuts down
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Startup description built from the static metadata
    fn describe(&self, stochastic: bool) -> EnvDescription {
        EnvDescription::new(
            self.title(),
            self.action_space(),
            self.is_episodic(),
            self.min_max_features(),
            self.min_max_reward(),
            stochastic,
        )
    }
}

#[async_trait]
impl<E: Environment + ?Sized> Environment for Box<E> {
    async fn sensation(&mut self) -> Result<Sensation> {
        (**self).sensation().await
    }

    async fn apply(&mut self, action: &Action) -> Result<f64> {
        (**self).apply(action).await
    }

    fn terminal(&mut self) -> bool {
        (**self).terminal()
    }

    async fn reset(&mut self) -> Result<()> {
        (**self).reset().await
    }

    fn min_max_features(&self) -> (Vec<f64>, Vec<f64>) {
        (**self).min_max_features()
    }

    fn min_max_reward(&self) -> (f64, f64) {
        (**self).min_max_reward()
    }

    fn action_space(&self) -> ActionSpace {
        (**self).action_space()
    }

    fn num_actions(&self) -> usize {
        (**self).num_actions()
    }

    fn is_episodic(&self) -> bool {
        (**self).is_episodic()
    }

    fn title(&self) -> String {
        (**self).title()
    }

    async fn seedings(&mut self) -> Result<Vec<Experience>> {
        (**self).seedings().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown().await
    }
}
