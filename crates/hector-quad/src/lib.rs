//! Quadrotor environments over a physics simulator
//!
//! This crate provides:
//! - `QuadEnvironment`, the `Environment` implementation for both quadrotor tasks
//! - Ground-truth and explicit-stepping sensing strategies
//! - Controller engagement handshake run on every reset
//! - Target trajectory and reward shaping
//! - Registration of the quadrotor kinds in an `EnvRegistry`

pub mod config;
pub mod engagement;
pub mod env;
pub mod retry;
pub mod reward;
pub mod sensing;
pub mod state;
pub mod task;
pub mod trajectory;

#[cfg(test)]
mod mock;

pub use config::{EngagementConfig, QuadConfig, RetryPolicy, SensingMode};
pub use env::QuadEnvironment;
pub use task::QuadTask;
pub use trajectory::{CircleConfig, Target, TrajectoryConfig};

use rl_env_core::EnvKind;
use rl_env_server::{EnvOptions, EnvRegistry, Environment, RegistryError};
use sim_bridge::BridgeConfig;

/// Command-line adjustments applied on top of each task preset
#[derive(Debug, Clone, Default)]
pub struct QuadOverrides {
    /// Partial `QuadConfig` JSON merged into the preset
    pub config: Option<serde_json::Value>,
    /// Sensing strategy replacing the preset's
    pub sensing: Option<SensingMode>,
}

impl QuadOverrides {
    /// Final configuration for `task`
    pub fn resolve(&self, task: QuadTask) -> rl_env_core::Result<QuadConfig> {
        let mut config = QuadConfig::preset(task);
        if let Some(overrides) = &self.config {
            config = config.with_overrides(overrides)?;
        }
        // The kind decides the task
        config.task = task;
        if let Some(sensing) = self.sensing {
            config.sensing = sensing;
        }
        Ok(config)
    }
}

/// Register every quadrotor kind, each connecting through `bridge`
pub fn register_all(
    registry: &mut EnvRegistry,
    bridge: BridgeConfig,
    overrides: QuadOverrides,
) -> Result<(), RegistryError> {
    for kind in [EnvKind::HectorQuad, EnvKind::HectorQuadPose] {
        let task = QuadTask::for_kind(kind);
        let bridge = bridge.clone();
        let overrides = overrides.clone();

        registry.register(kind, move |options: EnvOptions| {
            let bridge = bridge.clone();
            let config = overrides.resolve(task);
            async move {
                let env = QuadEnvironment::connect(config?, bridge, options).await?;
                Ok::<Box<dyn Environment>, rl_env_core::EnvError>(Box::new(env))
            }
        })?;
    }
    Ok(())
}
