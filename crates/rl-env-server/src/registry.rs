//! Environment registry
//!
//! Maps each [`EnvKind`] to a factory that builds the environment. The host
//! picks one kind at startup; no global environment pointer exists.

use crate::environment::Environment;
use rl_env_core::{EnvError, EnvKind};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Options forwarded to every environment factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOptions {
    /// Seed for the external random source
    pub seed: Option<u64>,
    /// Build the stochastic version of the domain
    pub stochastic: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            seed: None,
            stochastic: true,
        }
    }
}

/// Boxed future resolving to a constructed environment
pub type EnvFuture =
    Pin<Box<dyn Future<Output = rl_env_core::Result<Box<dyn Environment>>> + Send>>;

/// Factory building one environment kind
pub type EnvFactory = Box<dyn Fn(EnvOptions) -> EnvFuture + Send + Sync>;

/// Registry of environment factories
#[derive(Default)]
pub struct EnvRegistry {
    factories: HashMap<EnvKind, EnvFactory>,
}

impl EnvRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `kind`
    pub fn register<F, Fut>(&mut self, kind: EnvKind, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(EnvOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = rl_env_core::Result<Box<dyn Environment>>> + Send + 'static,
    {
        if self.factories.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.factories
            .insert(kind, Box::new(move |options| Box::pin(factory(options))));
        Ok(())
    }

    /// Build the environment registered for `kind`
    pub async fn create(
        &self,
        kind: EnvKind,
        options: EnvOptions,
    ) -> Result<Box<dyn Environment>, RegistryError> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or(RegistryError::NotRegistered(kind))?;

        info!(
            "Constructing {} (seed={:?}, stochastic={})",
            kind, options.seed, options.stochastic
        );
        factory(options)
            .await
            .map_err(|source| RegistryError::Construction { kind, source })
    }

    /// Whether a factory exists for `kind`
    pub fn contains(&self, kind: EnvKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered kinds, in display order
    pub fn kinds(&self) -> Vec<EnvKind> {
        EnvKind::ALL
            .into_iter()
            .filter(|kind| self.factories.contains_key(kind))
            .collect()
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Environment already registered: {0}")]
    AlreadyRegistered(EnvKind),
    #[error("No environment registered for {0}")]
    NotRegistered(EnvKind),
    #[error("Failed to construct {kind}: {source}")]
    Construction {
        kind: EnvKind,
        #[source]
        source: EnvError,
    },
}
