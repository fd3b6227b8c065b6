//! Target trajectory as a pure function of elapsed simulated steps

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Horizontal circle flown after the hover phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    /// Radius around the hover point (m)
    pub radius: f64,
    /// Angular rate (rad per physics step)
    pub angular_rate: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            angular_rate: 1e-3,
        }
    }
}

/// Hover setpoint, optionally followed by a circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Hover setpoint (m)
    pub hover: DVec3,
    /// Fixed yaw offset held for the whole trajectory (rad)
    pub yaw_offset: f64,
    /// Steps spent hovering before the circle starts
    pub hold_steps: u64,
    /// Circle flown after `hold_steps`; `None` hovers forever
    pub circle: Option<CircleConfig>,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            hover: DVec3::new(0.0, 0.0, 5.0),
            yaw_offset: 0.0,
            hold_steps: 5000,
            circle: None,
        }
    }
}

/// Target pose and twist at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: DVec3,
    pub yaw: f64,
    pub linear_velocity: DVec3,
    pub yaw_rate: f64,
}

impl TrajectoryConfig {
    /// Target after `t` cumulative physics steps.
    ///
    /// The target twist is always zero, even on the circle.
    pub fn target_at(&self, t: u64) -> Target {
        let position = match self.circle {
            Some(circle) if t >= self.hold_steps => {
                let angle = circle.angular_rate * (t - self.hold_steps) as f64;
                self.hover + circle.radius * DVec3::new(angle.cos(), angle.sin(), 0.0)
            }
            _ => self.hover,
        };

        Target {
            position,
            yaw: self.yaw_offset,
            linear_velocity: DVec3::ZERO,
            yaw_rate: 0.0,
        }
    }
}
