//! Sensing strategies
//!
//! How new body samples reach the tracker. Reward and termination only see
//! recorded samples, so strategies can be swapped without touching them.

use crate::config::{RetryPolicy, SensingMode};
use crate::retry::{Backoff, retrying};
use async_trait::async_trait;
use rl_env_core::{EnvError, Result};
use sim_bridge::{BodySample, SimulatorLink};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Outcome of one decision interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Sample taken after the decision's command, if one arrived
    pub sample: Option<BodySample>,
    /// Physics steps credited to simulated time
    pub steps: u64,
}

/// Source of body samples
#[async_trait]
pub trait SensingStrategy: Send {
    fn mode(&self) -> SensingMode;

    /// Last step of a reset, after the body was placed and the controller engaged
    async fn on_reset(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()>;

    /// Let one decision of `steps` physics steps elapse after a command.
    async fn advance(
        &mut self,
        link: &mut dyn SimulatorLink,
        model: &str,
        steps: u32,
        retry: &RetryPolicy,
    ) -> Result<Advance>;

    /// Newest sample that arrived since the last call, without blocking
    fn poll(&mut self) -> Option<BodySample>;
}

/// Build the strategy for `mode`
pub fn for_mode(
    mode: SensingMode,
    link: &dyn SimulatorLink,
    decision_period: Duration,
) -> Result<Box<dyn SensingStrategy>> {
    match mode {
        SensingMode::GroundTruth => {
            let feed = link.ground_truth().ok_or_else(|| {
                EnvError::Config("Simulator does not publish a ground-truth feed".into())
            })?;
            Ok(Box::new(GroundTruthSensing::new(feed, decision_period)))
        }
        SensingMode::Stepping => Ok(Box::new(SteppingSensing::default())),
    }
}

/// Free-running physics; samples arrive on the ground-truth feed.
///
/// The feed carries no simulation clock, so a decision is credited with its
/// nominal step count only when a sample arrived after its command.
pub struct GroundTruthSensing {
    feed: watch::Receiver<Option<BodySample>>,
    period: Duration,
}

impl GroundTruthSensing {
    pub fn new(feed: watch::Receiver<Option<BodySample>>, period: Duration) -> Self {
        Self { feed, period }
    }
}

#[async_trait]
impl SensingStrategy for GroundTruthSensing {
    fn mode(&self) -> SensingMode {
        SensingMode::GroundTruth
    }

    async fn on_reset(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        // Samples published before the reset describe the old episode
        self.feed.borrow_and_update();
        retrying!(retry, "UnpausePhysics", link.unpause_physics());
        Ok(())
    }

    /// Wait up to one decision period for a sample published after the command.
    ///
    /// The caller must have drained the feed with [`poll`](Self::poll) before
    /// sending the command.
    async fn advance(
        &mut self,
        _link: &mut dyn SimulatorLink,
        _model: &str,
        steps: u32,
        _retry: &RetryPolicy,
    ) -> Result<Advance> {
        let changed = tokio::time::timeout(self.period, self.feed.changed()).await;
        match changed {
            Ok(Ok(())) => {
                let sample = *self.feed.borrow_and_update();
                let steps = if sample.is_some() { u64::from(steps) } else { 0 };
                Ok(Advance { sample, steps })
            }
            Ok(Err(_)) => Err(EnvError::Transport("Ground-truth feed closed".into())),
            Err(_) => {
                warn!("No ground-truth sample within {:?} of the command", self.period);
                Ok(Advance {
                    sample: None,
                    steps: 0,
                })
            }
        }
    }

    fn poll(&mut self) -> Option<BodySample> {
        match self.feed.has_changed() {
            Ok(true) => *self.feed.borrow_and_update(),
            _ => None,
        }
    }
}

/// Paused physics advanced explicitly, one decision at a time
#[derive(Debug, Default)]
pub struct SteppingSensing {
    /// Simulator step counter at the end of the last decision
    iteration: u64,
}

impl SteppingSensing {
    /// Run exactly `steps` physics steps past the last decision.
    ///
    /// A failed `Step` may still have run in the simulator, so after each
    /// failure the step counter is read back and only the remainder is sent.
    async fn step_exactly(
        &mut self,
        link: &mut dyn SimulatorLink,
        steps: u32,
        retry: &RetryPolicy,
    ) -> Result<()> {
        let target = self.iteration + u64::from(steps);
        let mut remaining = steps;
        let mut backoff = Backoff::new(retry);

        loop {
            let err = match link.step(remaining).await {
                Ok(()) => break,
                Err(err) => err,
            };
            backoff.wait("Step", err).await?;

            let reached = retrying!(retry, "GetIteration", link.iteration());
            if reached >= target {
                if reached > target {
                    warn!("Simulator overshot: at step {} of {}", reached, target);
                }
                break;
            }
            if reached < self.iteration {
                return Err(EnvError::Transport(format!(
                    "Simulator step counter went back: {} after {}",
                    reached, self.iteration
                )));
            }
            // At most `steps` since `reached >= self.iteration`
            remaining = (target - reached) as u32;
            debug!("Step retry: {} of {} steps still to run", remaining, steps);
        }

        self.iteration = target;
        Ok(())
    }
}

#[async_trait]
impl SensingStrategy for SteppingSensing {
    fn mode(&self) -> SensingMode {
        SensingMode::Stepping
    }

    async fn on_reset(&mut self, link: &mut dyn SimulatorLink, retry: &RetryPolicy) -> Result<()> {
        self.iteration = retrying!(retry, "GetIteration", link.iteration());
        Ok(())
    }

    async fn advance(
        &mut self,
        link: &mut dyn SimulatorLink,
        model: &str,
        steps: u32,
        retry: &RetryPolicy,
    ) -> Result<Advance> {
        self.step_exactly(link, steps, retry).await?;
        let sample = retrying!(retry, "GetModelState", link.model_state(model));
        debug!("Stepped {} -> z={:.3}", steps, sample.position.z);
        Ok(Advance {
            sample: Some(sample),
            steps: u64::from(steps),
        })
    }

    fn poll(&mut self) -> Option<BodySample> {
        None
    }
}
