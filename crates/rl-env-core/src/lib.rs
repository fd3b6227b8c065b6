//! # rl-env-core
//!
//! Core types for the rl-env environment protocol.
//!
//! This crate provides the foundational types shared by the host, the
//! simulator bridge and every environment:
//! - Actions and action spaces
//! - Environment description
//! - Observations and seed experiences
//! - Enumerated environment kinds
//! - Error types

pub mod action;
pub mod description;
pub mod error;
pub mod experience;
pub mod kind;

pub use action::{Action, ActionSpace};
pub use description::EnvDescription;
pub use error::{EnvError, Result};
pub use experience::{Experience, Sensation};
pub use kind::{EnvKind, ParseEnvKindError};
