//! # rl-env-server
//!
//! Environment host for the rl-env agent protocol.
//!
//! This crate provides:
//! - `Environment` trait for implementing simulated systems
//! - Environment registry dispatching by `EnvKind`
//! - Agent message types and the host context driving one environment
//! - Line-delimited JSON stdio transport

pub mod environment;
pub mod host;
pub mod messages;
pub mod registry;
pub mod transport;

#[cfg(test)]
mod test_env;

pub use environment::Environment;
pub use host::{EnvHost, HostOptions};
pub use messages::{AgentMessage, HostMessage};
pub use registry::{EnvOptions, EnvRegistry, RegistryError};

use rl_env_core::Result;

/// rl-env environment server
pub struct RlEnvServer<E: Environment> {
    host: EnvHost<E>,
}

impl<E: Environment> RlEnvServer<E> {
    /// Create a new server with the given environment
    pub fn new(environment: E, options: HostOptions) -> Self {
        Self {
            host: EnvHost::new(environment, options),
        }
    }

    /// Run the server on stdio transport
    pub async fn run_stdio(mut self) -> Result<()> {
        transport::stdio::run(&mut self.host).await
    }

    /// Hosted environment
    pub fn environment(&self) -> &E {
        self.host.environment()
    }
}
