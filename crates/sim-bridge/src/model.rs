//! Rigid-body samples, twist commands and controller listings

use glam::{DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

/// Pose and twist of a rigid body at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BodySample {
    /// World-frame position (m)
    pub position: DVec3,
    /// World-frame orientation
    pub orientation: DQuat,
    /// World-frame linear velocity (m/s)
    pub linear_velocity: DVec3,
    /// Angular velocity (rad/s)
    pub angular_velocity: DVec3,
}

impl BodySample {
    /// A body at rest at `position`, rotated by `yaw` around the vertical axis
    pub fn at_rest(position: DVec3, yaw: f64) -> Self {
        Self {
            position,
            orientation: DQuat::from_rotation_z(yaw),
            linear_velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
        }
    }

    /// Heading around the vertical axis, in (-pi, pi]
    pub fn yaw(&self) -> f64 {
        let (yaw, _pitch, _roll) = self.orientation.to_euler(EulerRot::ZYX);
        yaw
    }
}

impl Default for BodySample {
    fn default() -> Self {
        Self::at_rest(DVec3::ZERO, 0.0)
    }
}

/// Velocity command sent to the actuation controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwistCommand {
    /// Linear velocity setpoint (m/s)
    pub linear: DVec3,
    /// Angular velocity setpoint (rad/s)
    pub angular: DVec3,
}

impl TwistCommand {
    /// Neutral command: hold still
    pub const ZERO: TwistCommand = TwistCommand {
        linear: DVec3::ZERO,
        angular: DVec3::ZERO,
    };

    /// Vertical velocity only
    pub fn vertical(speed: f64) -> Self {
        Self {
            linear: DVec3::new(0.0, 0.0, speed),
            angular: DVec3::ZERO,
        }
    }
}

/// One entry of the controller manager listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControllerInfo {
    /// Controller name
    pub name: String,
    /// Manager-reported state ("running", "stopped", "initialized", ...)
    pub state: String,
}

impl ControllerInfo {
    /// Whether the manager reports this controller as active
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}
