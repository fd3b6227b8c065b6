//! Agent transports

pub mod stdio;
