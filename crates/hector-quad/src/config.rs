//! Quadrotor environment configuration

use crate::task::QuadTask;
use crate::trajectory::{CircleConfig, TrajectoryConfig};
use glam::DVec3;
use rl_env_core::{EnvError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How the environment learns the body state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensingMode {
    /// Latest sample from the free-running ground-truth feed
    GroundTruth,
    /// Explicit physics stepping followed by a model-state read
    Stepping,
}

impl SensingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensingMode::GroundTruth => "ground-truth",
            SensingMode::Stepping => "stepping",
        }
    }
}

impl fmt::Display for SensingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ground-truth" | "groundtruth" => Ok(SensingMode::GroundTruth),
            "stepping" | "step" => Ok(SensingMode::Stepping),
            _ => Err(format!(
                "Invalid sensing mode: {} (expected ground-truth or stepping)",
                s
            )),
        }
    }
}

/// Controller engagement handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Actuation controller name in the controller manager
    pub controller: String,
    /// First status poll interval (ms)
    pub poll_initial_ms: u64,
    /// Poll interval cap (ms)
    pub poll_max_ms: u64,
    /// Give up engaging after this long (ms)
    pub timeout_ms: u64,
    /// Also poll the controller manager before every command
    pub verify_status_on_apply: bool,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            controller: "controller/twist".into(),
            poll_initial_ms: 20,
            poll_max_ms: 320,
            timeout_ms: 10_000,
            verify_status_on_apply: false,
        }
    }
}

impl EngagementConfig {
    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Capped exponential backoff for transient simulator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// First retry delay (ms)
    pub initial_ms: u64,
    /// Delay cap (ms)
    pub max_ms: u64,
    /// Total attempts before giving up
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_ms: 50,
            max_ms: 1000,
            max_attempts: 20,
        }
    }
}

/// Full quadrotor environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadConfig {
    pub task: QuadTask,
    pub sensing: SensingMode,
    /// Model name in the simulator
    pub model: String,
    /// Canonical start position (m)
    pub start_position: DVec3,
    /// Canonical start heading (rad)
    pub start_yaw: f64,
    /// Physics sub-steps per decision
    pub steps_per_decision: u32,
    /// Longest wait for a ground-truth sample after a command (ms)
    pub decision_period_ms: u64,
    pub trajectory: TrajectoryConfig,
    /// Altitude convergence tolerance (m)
    pub tolerance: f64,
    /// Consecutive in-tolerance samples that end an altitude episode
    pub dwell_samples: u64,
    /// UP/DOWN vertical speed (m/s)
    pub climb_speed: f64,
    /// Linear velocity command bound (m/s)
    pub max_linear_speed: f64,
    /// Yaw rate command bound (rad/s)
    pub max_yaw_rate: f64,
    /// Workspace bound on each position error (m)
    pub position_bound: f64,
    /// Reported bound on each velocity error (m/s)
    pub velocity_bound: f64,
    /// Weight of the yaw error in the pose reward
    pub yaw_weight: f64,
    /// Decisions per episode; 0 means unlimited
    pub max_decisions: u64,
    /// Recorded transitions handed to the agent before the live loop
    pub seed_file: Option<PathBuf>,
    pub engagement: EngagementConfig,
    pub retry: RetryPolicy,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self::altitude()
    }
}

impl QuadConfig {
    /// Reach and hold 5 m with UP/DOWN/STAY, fed by ground truth
    pub fn altitude() -> Self {
        Self {
            task: QuadTask::Altitude,
            sensing: SensingMode::GroundTruth,
            model: "quadrotor".into(),
            start_position: DVec3::ZERO,
            start_yaw: 0.0,
            steps_per_decision: 10,
            decision_period_ms: 1000,
            trajectory: TrajectoryConfig::default(),
            tolerance: 0.2,
            dwell_samples: 1000,
            climb_speed: 2.0,
            max_linear_speed: 2.0,
            max_yaw_rate: 1.0,
            position_bound: 10.0,
            velocity_bound: 5.0,
            yaw_weight: 10.0,
            max_decisions: 0,
            seed_file: None,
            engagement: EngagementConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Hover then circle with continuous twist commands, explicit stepping
    pub fn pose_tracking() -> Self {
        Self {
            task: QuadTask::PoseTracking,
            sensing: SensingMode::Stepping,
            trajectory: TrajectoryConfig {
                yaw_offset: 0.2,
                circle: Some(CircleConfig::default()),
                ..TrajectoryConfig::default()
            },
            max_decisions: 5000,
            ..Self::altitude()
        }
    }

    /// Preset for `task`
    pub fn preset(task: QuadTask) -> Self {
        match task {
            QuadTask::Altitude => Self::altitude(),
            QuadTask::PoseTracking => Self::pose_tracking(),
        }
    }

    pub fn decision_period(&self) -> Duration {
        Duration::from_millis(self.decision_period_ms)
    }

    /// Apply a partial JSON object on top of `self`.
    ///
    /// Nested objects merge field by field; any other value replaces.
    pub fn with_overrides(self, overrides: &serde_json::Value) -> Result<Self> {
        let mut merged = serde_json::to_value(&self)?;
        merge_json(&mut merged, overrides);
        let config: QuadConfig = serde_json::from_value(merged)
            .map_err(|e| EnvError::Config(format!("Invalid configuration: {}", e)))?;
        Ok(config)
    }

    /// Reject values that would stall or divide the episode loop
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(EnvError::Config(msg.to_string()));
        if self.steps_per_decision == 0 {
            return fail("steps_per_decision must be positive");
        }
        if self.decision_period_ms == 0 {
            return fail("decision_period_ms must be positive");
        }
        if self.dwell_samples == 0 {
            return fail("dwell_samples must be positive");
        }
        if !(self.tolerance > 0.0) {
            return fail("tolerance must be positive");
        }
        if !(self.position_bound > 0.0) {
            return fail("position_bound must be positive");
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least 1");
        }
        if self.engagement.poll_initial_ms == 0
            || self.engagement.poll_max_ms < self.engagement.poll_initial_ms
        {
            return fail("engagement poll interval must be positive and below its cap");
        }
        if self.engagement.controller.is_empty() {
            return fail("engagement.controller must be set");
        }
        Ok(())
    }
}

fn merge_json(base: &mut serde_json::Value, overrides: &serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, value) => *base = value.clone(),
    }
}
