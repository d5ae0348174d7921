//! Garbage collector module
//!
//! A tracing and compacting garbage collector over an arena heap.
//! Compaction moves objects, so every slot that holds a managed reference
//! across an allocation must be visible to the collector: handles, frame
//! slot blocks and argument vectors are all visited as roots and rewritten
//! in place when the objects they reference slide.

mod allocator;
mod collector;
pub mod relocatable;

pub use allocator::{BlockHeader, Heap, MemoryTag};
pub use collector::{GcStats, ObjectVisitor, Roots};
pub use relocatable::{RootBlock, RootRange, register_relocatable, unregister_relocatable};

impl Heap {
    /// Run garbage collection with the given roots
    pub fn collect(&self, roots: &dyn Roots) -> GcStats {
        collector::collect(self, roots)
    }
}
