//! Actuation controller engagement
//!
//! The controller is loaded once at construction and engaged on every reset.
//! No command reaches the body until the controller manager reports it
//! running.

use crate::config::{EngagementConfig, RetryPolicy};
use crate::retry::retrying;
use rl_env_core::{EnvError, Result};
use sim_bridge::{SimulatorLink, TwistCommand};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Engagement lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementPhase {
    Unloaded,
    Loaded,
    Engaging,
    Running,
    Shutdown,
}

impl fmt::Display for EngagementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Controller state as reported by the controller manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    NotLoaded,
    Stopped,
    Running,
}

/// Controller engagement state machine
#[derive(Debug)]
pub struct Engagement {
    config: EngagementConfig,
    phase: EngagementPhase,
}

impl Engagement {
    pub fn new(config: EngagementConfig) -> Self {
        Self {
            config,
            phase: EngagementPhase::Unloaded,
        }
    }

    pub fn phase(&self) -> EngagementPhase {
        self.phase
    }

    pub fn controller(&self) -> &str {
        &self.config.controller
    }

    /// Load the controller. Any failure is fatal and never retried.
    pub async fn load(&mut self, link: &mut dyn SimulatorLink) -> Result<()> {
        if self.phase != EngagementPhase::Unloaded {
            return Ok(());
        }

        let load_error = |reason: String| EnvError::ControllerLoad {
            controller: self.config.controller.clone(),
            reason,
        };
        match link.load_controller(&self.config.controller).await {
            Ok(true) => {}
            Ok(false) => return Err(load_error("controller manager refused to load it".into())),
            Err(e) => return Err(load_error(e.to_string())),
        }

        info!("Loaded controller {}", self.config.controller);
        self.phase = EngagementPhase::Loaded;
        Ok(())
    }

    /// Poll the controller manager
    pub async fn status(&self, link: &mut dyn SimulatorLink) -> sim_bridge::LinkResult<ControllerStatus> {
        let controllers = link.list_controllers().await?;
        let status = match controllers
            .iter()
            .find(|c| c.name == self.config.controller)
        {
            None => ControllerStatus::NotLoaded,
            Some(c) if c.is_running() => ControllerStatus::Running,
            Some(_) => ControllerStatus::Stopped,
        };
        Ok(status)
    }

    /// Start the controller and wait until it reports running.
    ///
    /// Publishes a neutral command before every status poll. The poll
    /// interval doubles up to its cap; running out of time is
    /// [`EnvError::EngagementTimeout`].
    pub async fn engage(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        match self.phase {
            EngagementPhase::Unloaded => {
                return Err(EnvError::Precondition(format!(
                    "cannot engage controller {} before it is loaded",
                    self.config.controller
                )));
            }
            EngagementPhase::Running => self.shutdown(link, retry).await?,
            _ => {}
        }

        self.phase = EngagementPhase::Engaging;
        let start = Instant::now();
        let timeout = self.config.timeout();
        let mut interval = self.config.poll_initial();
        let mut polls: u32 = 0;

        self.request_start(link, retry).await?;

        loop {
            retrying!(retry, "Command", link.publish_command(&TwistCommand::ZERO));

            polls += 1;
            match self.status(link).await {
                Ok(ControllerStatus::Running) => {
                    info!(
                        "Controller {} running after {} polls ({} ms)",
                        self.config.controller,
                        polls,
                        start.elapsed().as_millis()
                    );
                    self.phase = EngagementPhase::Running;
                    return Ok(());
                }
                Ok(ControllerStatus::Stopped) => {
                    debug!("Controller {} still stopped (poll {})", self.config.controller, polls);
                    self.request_start(link, retry).await?;
                }
                Ok(ControllerStatus::NotLoaded) => {
                    self.phase = EngagementPhase::Unloaded;
                    return Err(EnvError::ControllerLoad {
                        controller: self.config.controller.clone(),
                        reason: "controller disappeared from the manager during engagement".into(),
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!("Status poll {} failed: {}", polls, e);
                }
                Err(e) => return Err(e.into()),
            }

            let waited = start.elapsed();
            if waited >= timeout {
                self.phase = EngagementPhase::Loaded;
                return Err(EnvError::EngagementTimeout {
                    controller: self.config.controller.clone(),
                    waited_ms: waited.as_millis() as u64,
                    polls,
                });
            }
            tokio::time::sleep(interval.min(timeout - waited)).await;
            interval = (interval * 2).min(self.config.poll_max());
        }
    }

    async fn request_start(&self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        let start = [self.config.controller.clone()];
        let accepted = retrying!(retry, "SwitchController", link.switch_controller(&start, &[]));
        if !accepted {
            warn!("Controller manager refused to start {}", self.config.controller);
        }
        Ok(())
    }

    /// Zero the command and stop the controller if it is running
    pub async fn shutdown(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        if self.phase == EngagementPhase::Unloaded {
            return Ok(());
        }

        retrying!(retry, "Command", link.publish_command(&TwistCommand::ZERO));

        if matches!(self.phase, EngagementPhase::Running | EngagementPhase::Engaging) {
            let stop = [self.config.controller.clone()];
            let accepted = retrying!(retry, "SwitchController", link.switch_controller(&[], &stop));
            if !accepted {
                warn!("Controller manager refused to stop {}", self.config.controller);
            }
            debug!("Stopped controller {}", self.config.controller);
        }
        self.phase = EngagementPhase::Shutdown;
        Ok(())
    }

    /// Fail unless the controller is running.
    ///
    /// With `verify_status_on_apply` the controller manager is asked as well.
    pub async fn ensure_running(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        if self.phase != EngagementPhase::Running {
            return Err(EnvError::Precondition(format!(
                "controller {} is not running (phase {}); call reset first",
                self.config.controller, self.phase
            )));
        }

        if self.config.verify_status_on_apply {
            let status = retrying!(retry, "ListControllers", self.status(link));
            if status != ControllerStatus::Running {
                self.phase = EngagementPhase::Loaded;
                return Err(EnvError::Precondition(format!(
                    "controller {} reported {:?} before command",
                    self.config.controller, status
                )));
            }
        }
        Ok(())
    }
}
