//! Quadrotor state tracking

use crate::trajectory::Target;
use glam::DVec3;
use sim_bridge::BodySample;
use std::f64::consts::{PI, TAU};

/// Current and previous body sample plus the simulated-time counters.
///
/// `previous` only moves when a new sample is recorded, never on `apply`.
#[derive(Debug, Clone)]
pub struct StateTracker {
    current: BodySample,
    previous: BodySample,
    elapsed_steps: u64,
    samples: u64,
}

impl StateTracker {
    pub fn new(canonical: BodySample) -> Self {
        Self {
            current: canonical,
            previous: canonical,
            elapsed_steps: 0,
            samples: 0,
        }
    }

    /// Return to the canonical pose with zeroed counters
    pub fn reset(&mut self, canonical: BodySample) {
        *self = Self::new(canonical);
    }

    /// Take in a new sample
    pub fn record(&mut self, sample: BodySample) {
        self.previous = self.current;
        self.current = sample;
        self.samples += 1;
    }

    /// Credit `steps` physics steps to simulated time
    pub fn advance(&mut self, steps: u64) {
        self.elapsed_steps += steps;
    }

    pub fn current(&self) -> &BodySample {
        &self.current
    }

    pub fn previous(&self) -> &BodySample {
        &self.previous
    }

    /// Physics steps since the last reset
    pub fn elapsed_steps(&self) -> u64 {
        self.elapsed_steps
    }

    /// Samples recorded since the last reset
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// Signed `current - target` pose and twist errors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseError {
    pub position: DVec3,
    pub linear_velocity: DVec3,
    /// Wrapped to [-pi, pi]
    pub yaw: f64,
    pub yaw_rate: f64,
}

impl PoseError {
    pub fn between(sample: &BodySample, target: &Target) -> Self {
        Self {
            position: sample.position - target.position,
            linear_velocity: sample.linear_velocity - target.linear_velocity,
            yaw: wrap_angle(sample.yaw() - target.yaw),
            yaw_rate: sample.angular_velocity.z - target.yaw_rate,
        }
    }

    /// Observation layout: position, velocity, yaw, yaw rate
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.position.x,
            self.position.y,
            self.position.z,
            self.linear_velocity.x,
            self.linear_velocity.y,
            self.linear_velocity.z,
            self.yaw,
            self.yaw_rate,
        ]
    }
}

/// Wrap an angle to [-pi, pi]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI && angle > 0.0 { PI } else { wrapped }
}
