//! Callback argument frames
//!
//! A frame is a fixed block of GC-visible slots pushed on the native frame
//! stack for exactly one native call. It carries the receiver, holder, data
//! and context the callback sees, plus a return-value slot the callback may
//! write once. The collector scans and relocates the slots like any other
//! root, so objects stay reachable and addressable while the callback runs,
//! even if it triggers a collection.

mod frame;
pub mod function;
pub mod property;

pub use frame::{ArgumentsFrame, FrameLayout};
pub use function::{ArgumentVector, Callee, FunctionCallbackArguments, FunctionLayout, FunctionSlot};
pub use property::{PropertyCallbackArguments, PropertyLayout, PropertySlot, ShouldThrow};
