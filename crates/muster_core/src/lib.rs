//! Ambient infrastructure for Muster binaries.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left
//! to the binary, through [`TracingSetup`].

pub mod logging;

pub use logging::{ParseFormatError, TracingConfig, TracingFormat, TracingSetup};
