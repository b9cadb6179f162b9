//! Backend abstraction layer
//!
//! Provides the device capability surface the renderer consumes, plus a
//! dummy backend that records instead of executing.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{Command, DummyDevice, DummyStats, RecordingCommandList};
pub use traits::*;
pub use types::*;
