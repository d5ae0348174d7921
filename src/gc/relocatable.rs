//! Relocatable root blocks
//!
//! A relocatable is a fixed-length run of words on the heap's stack region
//! that the collector treats as roots for as long as it is registered.
//! Registration is strictly LIFO, mirroring the stack it lives on.

use std::cell::Cell;

use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::value::{Value, WORD_SIZE};

/// A registered range of stack words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootRange {
    offset: usize,
    len: usize,
}

impl RootRange {
    pub fn new(offset: usize, len: usize) -> Self {
        RootRange { offset, len }
    }

    /// Byte offset of the first word from the heap base
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of words
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of word `index`
    #[inline]
    pub fn word_offset(&self, index: usize) -> usize {
        assert!(index < self.len, "slot {index} out of range for a block of {}", self.len);
        self.offset + index * WORD_SIZE
    }
}

/// Register `range` for root scanning
pub fn register_relocatable(context: &Context, range: RootRange) {
    context.relocatables().borrow_mut().push(range);
}

/// Unregister the most recently registered range
///
/// # Panics
/// Panics if `range` is not the most recent registration.
pub fn unregister_relocatable(context: &Context, range: RootRange) {
    let top = context.relocatables().borrow_mut().pop();
    assert_eq!(top, Some(range), "relocatables must be unregistered in LIFO order");
}

/// A block of root slots on the heap stack, registered for its whole lifetime
///
/// Every slot starts out as the hole, so the block is scannable from the
/// moment it exists.
pub struct RootBlock<'c> {
    context: &'c Context,
    range: RootRange,
    slots: &'c [Cell<Value>],
}

impl<'c> RootBlock<'c> {
    /// Push and register a block of `len` slots
    ///
    /// If the stack region is exhausted, one collection is run before giving up.
    pub fn new(context: &'c Context, len: usize) -> ApiResult<Self> {
        let heap = context.heap();
        let offset = match heap.stack_push(len, Value::hole()) {
            Some(offset) => offset,
            None => {
                context.collect_garbage();
                heap.stack_push(len, Value::hole())
                    .ok_or(ApiError::StackOverflow { words: len })?
            }
        };

        let range = RootRange::new(offset, len);
        // The words stay reserved until Drop pops them
        let slots = unsafe {
            std::slice::from_raw_parts(heap.word_ptr(offset) as *const Cell<Value>, len)
        };
        register_relocatable(context, range);
        tracing::trace!(offset, len, "registered root block");

        Ok(RootBlock {
            context,
            range,
            slots,
        })
    }

    #[inline]
    pub fn context(&self) -> &'c Context {
        self.context
    }

    #[inline]
    pub fn range(&self) -> RootRange {
        self.range
    }

    #[inline]
    pub fn slots(&self) -> &[Cell<Value>] {
        self.slots
    }

    #[inline]
    pub fn get(&self, index: usize) -> Value {
        self.slots[index].get()
    }

    #[inline]
    pub fn set(&self, index: usize, value: Value) {
        self.slots[index].set(value);
    }
}

impl Drop for RootBlock<'_> {
    fn drop(&mut self) {
        unregister_relocatable(self.context, self.range);
        self.context.heap().stack_pop(self.range.len());
    }
}
