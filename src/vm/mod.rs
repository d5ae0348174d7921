//! Virtual machine state
//!
//! Markers the engine keeps about what the current thread is doing, read by
//! profilers, stack walkers and GC heuristics.

pub mod state;

pub use state::{ExternalCallbackScope, VmState, VmStateScope};
