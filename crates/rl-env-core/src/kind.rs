//! Enumerated environment identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variants the host can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvKind {
    /// Quadrotor holding a target altitude with UP/DOWN/STAY commands
    #[serde(rename = "hectorquad", alias = "hector-quad")]
    HectorQuad,
    /// Quadrotor tracking a hover setpoint, then a circle, with twist commands
    #[serde(rename = "hectorquad-pose")]
    HectorQuadPose,
}

impl EnvKind {
    /// Every kind, in the order shown to users
    pub const ALL: [EnvKind; 2] = [EnvKind::HectorQuad, EnvKind::HectorQuadPose];

    /// Command-line name
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKind::HectorQuad => "hectorquad",
            EnvKind::HectorQuadPose => "hectorquad-pose",
        }
    }
}

impl fmt::Display for EnvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown environment name
#[derive(Debug, thiserror::Error)]
#[error("Invalid env type: {name} (expected one of: {expected})")]
pub struct ParseEnvKindError {
    name: String,
    expected: String,
}

impl FromStr for EnvKind {
    type Err = ParseEnvKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hectorquad" | "hector-quad" => Ok(EnvKind::HectorQuad),
            "hectorquad-pose" | "hectorquadpose" => Ok(EnvKind::HectorQuadPose),
            _ => Err(ParseEnvKindError {
                name: s.to_string(),
                expected: EnvKind::ALL
                    .iter()
                    .map(EnvKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}
