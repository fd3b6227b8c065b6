//! Task variants: observation, action mapping, reward and bounds

use crate::config::QuadConfig;
use crate::reward::{sign_of_improvement, weighted_l1};
use crate::state::PoseError;
use crate::trajectory::Target;
use glam::DVec3;
use rl_env_core::{Action, ActionSpace, EnvError, EnvKind, Result, Sensation};
use serde::{Deserialize, Serialize};
use sim_bridge::{BodySample, TwistCommand};
use std::f64::consts::PI;

/// Altitude task action indices
const UP: i64 = 0;
const DOWN: i64 = 1;
const STAY: i64 = 2;

/// Which quadrotor task an environment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuadTask {
    /// Reach and hold the target altitude with UP/DOWN/STAY
    Altitude,
    /// Track the target pose with continuous twist commands
    PoseTracking,
}

impl QuadTask {
    pub fn for_kind(kind: EnvKind) -> Self {
        match kind {
            EnvKind::HectorQuad => QuadTask::Altitude,
            EnvKind::HectorQuadPose => QuadTask::PoseTracking,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuadTask::Altitude => "Environment: HectorQuad",
            QuadTask::PoseTracking => "Environment: HectorQuad pose tracking",
        }
    }

    /// Observation length, fixed per task
    pub fn observation_len(self) -> usize {
        match self {
            QuadTask::Altitude => 2,
            QuadTask::PoseTracking => 8,
        }
    }

    /// Goal-relative observation of `sample`
    pub fn observe(self, sample: &BodySample, target: &Target) -> Sensation {
        match self {
            QuadTask::Altitude => {
                let error = sample.position.z - target.position.z;
                vec![
                    if error >= 0.0 { 1.0 } else { 0.0 },
                    if error <= 0.0 { 1.0 } else { 0.0 },
                ]
            }
            QuadTask::PoseTracking => PoseError::between(sample, target).to_vec(),
        }
    }

    /// Reward for moving from `previous` to `current`
    pub fn reward(
        self,
        config: &QuadConfig,
        previous: &BodySample,
        current: &BodySample,
        target: &Target,
    ) -> f64 {
        match self {
            QuadTask::Altitude => sign_of_improvement(
                (target.position.z - previous.position.z).abs(),
                (target.position.z - current.position.z).abs(),
            ),
            QuadTask::PoseTracking => {
                weighted_l1(&PoseError::between(current, target), config.yaw_weight)
            }
        }
    }

    pub fn action_space(self, config: &QuadConfig) -> ActionSpace {
        match self {
            QuadTask::Altitude => ActionSpace::Discrete {
                n: 3,
                names: Some(vec!["Up".into(), "Down".into(), "Stay".into()]),
            },
            QuadTask::PoseTracking => {
                let s = config.max_linear_speed;
                let r = config.max_yaw_rate;
                ActionSpace::Continuous {
                    shape: vec![4],
                    low: vec![-s, -s, -s, -r],
                    high: vec![s, s, s, r],
                }
            }
        }
    }

    /// Map a validated action to the velocity command it stands for
    pub fn command(self, config: &QuadConfig, action: &Action) -> Result<TwistCommand> {
        match (self, action) {
            (QuadTask::Altitude, Action::Discrete(UP)) => {
                Ok(TwistCommand::vertical(config.climb_speed))
            }
            (QuadTask::Altitude, Action::Discrete(DOWN)) => {
                Ok(TwistCommand::vertical(-config.climb_speed))
            }
            (QuadTask::Altitude, Action::Discrete(STAY)) => Ok(TwistCommand::ZERO),
            (QuadTask::PoseTracking, Action::Continuous(values)) if values.len() == 4 => {
                let s = config.max_linear_speed;
                let r = config.max_yaw_rate;
                Ok(TwistCommand {
                    linear: DVec3::new(values[0], values[1], values[2]).clamp(
                        DVec3::splat(-s),
                        DVec3::splat(s),
                    ),
                    angular: DVec3::new(0.0, 0.0, values[3].clamp(-r, r)),
                })
            }
            _ => {
                let space = self.action_space(config);
                space.validate(action)?;
                Err(EnvError::ActionArity {
                    expected: format!("{:?}", space),
                    got: format!("{:?}", action),
                })
            }
        }
    }

    /// Per-dimension observation bounds
    pub fn feature_bounds(self, config: &QuadConfig) -> (Vec<f64>, Vec<f64>) {
        match self {
            QuadTask::Altitude => (vec![0.0, 0.0], vec![1.0, 1.0]),
            QuadTask::PoseTracking => {
                let p = config.position_bound;
                let v = config.velocity_bound;
                (
                    vec![-p, -p, -p, -v, -v, -v, -PI, -PI],
                    vec![p, p, p, v, v, v, PI, PI],
                )
            }
        }
    }

    pub fn reward_bounds(self, config: &QuadConfig) -> (f64, f64) {
        match self {
            QuadTask::Altitude => (-1.0, 1.0),
            QuadTask::PoseTracking => (
                -(3.0 * config.position_bound + config.yaw_weight * PI),
                0.0,
            ),
        }
    }

    /// Whether `sample` left the workspace (pose task only)
    pub fn out_of_bounds(self, config: &QuadConfig, sample: &BodySample, target: &Target) -> bool {
        match self {
            QuadTask::Altitude => false,
            QuadTask::PoseTracking => {
                let error = sample.position - target.position;
                error.abs().max_element() > config.position_bound
            }
        }
    }

    /// Whether `sample` is within the altitude tolerance of `target`
    pub fn converged(self, config: &QuadConfig, sample: &BodySample, target: &Target) -> bool {
        (target.position.z - sample.position.z).abs() < config.tolerance
    }
}
