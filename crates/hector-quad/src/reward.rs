//! Reward shaping

use crate::state::PoseError;

/// +1 if the distance to the target shrank, -1 if it grew, 0 if unchanged
pub fn sign_of_improvement(previous_distance: f64, current_distance: f64) -> f64 {
    if current_distance < previous_distance {
        1.0
    } else if current_distance > previous_distance {
        -1.0
    } else {
        0.0
    }
}

/// Negative weighted L1 of position and yaw error, unnormalized and unclipped
pub fn weighted_l1(error: &PoseError, yaw_weight: f64) -> f64 {
    -(error.position.x.abs() + error.position.y.abs() + error.position.z.abs())
        - yaw_weight * error.yaw.abs()
}
