//! Backend implementations of the `waypoint_core` connection traits.

pub mod memory;

pub use memory::{InstanceStatus, MemoryBackend, ProcessLogic};
