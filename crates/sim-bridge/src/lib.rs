//! Bridge between rl-env and a physics simulator
//!
//! This crate provides:
//! - The [`SimulatorLink`] boundary (world reset, physics pause/step, model
//!   state, controller manager, command publishing, ground-truth feed)
//! - Wire protocol for requests, responses and pushed samples
//! - Transport abstractions (AsyncReader/AsyncWriter traits)
//! - TCP and Unix socket transports
//! - Background reader task routing responses by id

pub mod error;
pub mod link;
pub mod model;
pub mod protocol;
pub mod tcp;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use error::{LinkError, LinkResult};
pub use link::{BridgeConfig, BridgeLink, SimEndpoint, SimulatorLink};
pub use model::{BodySample, ControllerInfo, TwistCommand};
pub use protocol::{Frame, SimMessage, deserialize, serialize};
pub use transport::{AsyncReader, AsyncWriter, FramedReader, FramedWriter, reader_task};
