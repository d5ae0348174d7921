//! JavaScript execution context
//!
//! The Context owns all memory used by the engine: the arena heap, the handle
//! area, and the registry of relocatable root blocks. Argument frames bind to
//! exactly one Context and store its address in one of their slots.

use std::cell::{Cell, RefCell};
use std::slice;

use crate::api::FunctionCallback;
use crate::error::{ApiError, ApiResult};
use crate::gc::{GcStats, Heap, MemoryTag, ObjectVisitor, RootRange, Roots};
use crate::handles::HandleArea;
use crate::log::{ApiLogger, TracingLogger};
use crate::value::Value;
use crate::vm::{VmState, VmStateScope};

/// Context configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Total arena size in bytes (heap and frame stack share it)
    pub heap_size: usize,
    /// Number of handles per handle block
    pub handle_block_size: usize,
    /// Collect before every allocation, so every allocation can relocate objects
    pub gc_on_every_allocation: bool,
}

impl ContextConfig {
    /// Smallest arena a context accepts
    pub const MIN_HEAP_SIZE: usize = 4096;
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            heap_size: 64 * 1024,
            handle_block_size: 256,
            gc_on_every_allocation: cfg!(feature = "debug-gc"),
        }
    }
}

/// JavaScript execution context
pub struct Context {
    /// The memory heap for GC-managed objects and native frames
    heap: Heap,

    /// Handle slots of all open handle scopes
    handles: RefCell<HandleArea>,

    /// Registered relocatable blocks, innermost last
    relocatables: RefCell<Vec<RootRange>>,

    /// What the engine is doing
    vm_state: Cell<VmState>,

    /// Address of the innermost native callback being run
    external_callback: Cell<Option<usize>>,

    /// Exception thrown by a native callback (the hole when none)
    pending_exception: Cell<Value>,

    /// Exceptions thrown so far
    throw_count: Cell<u64>,

    /// Global object of the current realm (undefined when none)
    realm: Cell<Value>,

    /// Native functions referenced by function templates
    callbacks: RefCell<Vec<FunctionCallback>>,

    /// Receiver of API access events
    logger: RefCell<Box<dyn ApiLogger>>,

    /// Stress mode: collect before every allocation
    gc_on_every_allocation: bool,

    /// Whether a collection is running
    in_gc: Cell<bool>,

    /// Number of completed collections
    gc_count: Cell<usize>,
}

impl Context {
    /// Create a new context with the given memory size
    ///
    /// # Panics
    /// Panics if mem_size is below [`ContextConfig::MIN_HEAP_SIZE`].
    pub fn new(mem_size: usize) -> Self {
        Self::with_config(ContextConfig {
            heap_size: mem_size,
            ..ContextConfig::default()
        })
    }

    /// Create a context from a full configuration
    pub fn with_config(config: ContextConfig) -> Self {
        assert!(
            config.heap_size >= ContextConfig::MIN_HEAP_SIZE,
            "Memory size must be at least {} bytes",
            ContextConfig::MIN_HEAP_SIZE
        );
        assert!(config.handle_block_size > 0, "handle blocks must hold at least one handle");

        Context {
            heap: Heap::new(config.heap_size),
            handles: RefCell::new(HandleArea::new(config.handle_block_size)),
            relocatables: RefCell::new(Vec::new()),
            vm_state: Cell::new(VmState::default()),
            external_callback: Cell::new(None),
            pending_exception: Cell::new(Value::hole()),
            throw_count: Cell::new(0),
            realm: Cell::new(Value::undefined()),
            callbacks: RefCell::new(Vec::new()),
            logger: RefCell::new(Box::new(TracingLogger)),
            gc_on_every_allocation: config.gc_on_every_allocation,
            in_gc: Cell::new(false),
            gc_count: Cell::new(0),
        }
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub(crate) fn handles(&self) -> &RefCell<HandleArea> {
        &self.handles
    }

    #[inline]
    pub(crate) fn relocatables(&self) -> &RefCell<Vec<RootRange>> {
        &self.relocatables
    }

    #[inline]
    pub(crate) fn vm_state_cell(&self) -> &Cell<VmState> {
        &self.vm_state
    }

    #[inline]
    pub(crate) fn external_callback_cell(&self) -> &Cell<Option<usize>> {
        &self.external_callback
    }

    /// Current VM state
    #[inline]
    pub fn vm_state(&self) -> VmState {
        self.vm_state.get()
    }

    /// Address of the native callback currently running, if any
    #[inline]
    pub fn external_callback(&self) -> Option<usize> {
        self.external_callback.get()
    }

    /// Number of registered relocatable blocks
    pub fn relocatable_count(&self) -> usize {
        self.relocatables.borrow().len()
    }

    /// Install the receiver of API access events
    pub fn set_logger(&self, logger: impl ApiLogger + 'static) {
        *self.logger.borrow_mut() = Box::new(logger);
    }

    /// Run `f` with the installed logger
    pub(crate) fn with_logger<R>(&self, f: impl FnOnce(&dyn ApiLogger) -> R) -> R {
        f(self.logger.borrow().as_ref())
    }

    /// Run the garbage collector
    ///
    /// # Panics
    /// Panics if called while a collection is already running.
    pub fn collect_garbage(&self) -> GcStats {
        assert!(!self.in_gc.get(), "garbage collection is not reentrant");
        let _state = VmStateScope::new(self, VmState::Gc);
        self.in_gc.set(true);
        let stats = self.heap.collect(self);
        self.in_gc.set(false);
        self.gc_count.set(self.gc_count.get() + 1);

        #[cfg(feature = "dump")]
        tracing::debug!(
            objects_before = stats.objects_before,
            objects_after = stats.objects_after,
            bytes_freed = stats.bytes_freed,
            bytes_moved = stats.bytes_moved,
            "gc"
        );
        #[cfg(not(feature = "dump"))]
        tracing::trace!(bytes_freed = stats.bytes_freed, bytes_moved = stats.bytes_moved, "gc");

        stats
    }

    /// Number of completed collections
    #[inline]
    pub fn gc_count(&self) -> usize {
        self.gc_count.get()
    }

    /// Allocate a heap block, collecting once if the heap is full
    pub(crate) fn allocate(&self, size: usize, tag: MemoryTag, aux: u8) -> ApiResult<*mut u8> {
        if self.gc_on_every_allocation {
            self.collect_garbage();
        }
        if let Some(ptr) = self.heap.alloc(size, tag, aux) {
            return Ok(ptr);
        }
        self.collect_garbage();
        self.heap
            .alloc(size, tag, aux)
            .ok_or(ApiError::OutOfMemory { requested: size })
    }

    /// Whether a native callback left an exception behind
    #[inline]
    pub fn has_pending_exception(&self) -> bool {
        !self.pending_exception.get().is_hole()
    }

    pub(crate) fn set_pending_exception(&self, value: Value) {
        debug_assert!(!value.is_hole());
        self.pending_exception.set(value);
        self.throw_count.set(self.throw_count.get() + 1);
    }

    /// Bumped on every throw, so a caller can tell a fresh exception from
    /// one that was already pending
    #[inline]
    pub(crate) fn throw_count(&self) -> u64 {
        self.throw_count.get()
    }

    pub(crate) fn take_pending_exception(&self) -> Option<Value> {
        let value = self.pending_exception.replace(Value::hole());
        (!value.is_hole()).then_some(value)
    }

    /// Discard any pending exception
    pub fn clear_exception(&self) {
        self.pending_exception.set(Value::hole());
    }

    /// Global object of the current realm, undefined when none was entered
    #[inline]
    pub(crate) fn realm(&self) -> Value {
        self.realm.get()
    }

    pub(crate) fn set_realm(&self, global: Value) {
        self.realm.set(global);
    }

    /// Register a native function, returning its index
    pub(crate) fn register_callback(&self, callback: FunctionCallback) -> u32 {
        let mut callbacks = self.callbacks.borrow_mut();
        callbacks.push(callback);
        (callbacks.len() - 1) as u32
    }

    /// Number of registered native callbacks
    pub(crate) fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub(crate) fn callback(&self, index: u32) -> FunctionCallback {
        self.callbacks.borrow()[index as usize]
    }

    /// Get memory usage statistics
    pub fn memory_stats(&self) -> MemoryStats {
        MemoryStats {
            total: self.heap.total_size,
            heap_used: self.heap.heap_used(),
            stack_used: self.heap.stack_used(),
            free: self.heap.free_space(),
            handles: self.handles.borrow().len(),
        }
    }
}

impl Roots for Context {
    fn iterate_roots(&self, visitor: &mut dyn ObjectVisitor) {
        self.handles.borrow().iterate(visitor);

        for range in self.relocatables.borrow().iter() {
            if range.is_empty() {
                continue;
            }
            // Registered ranges stay reserved on the stack until unregistered
            let slots = unsafe {
                slice::from_raw_parts(self.heap.word_ptr(range.offset()) as *const Cell<Value>, range.len())
            };
            visitor.visit_pointers(slots);
        }

        visitor.visit_pointers(slice::from_ref(&self.pending_exception));
        visitor.visit_pointers(slice::from_ref(&self.realm));
    }
}

/// Memory usage statistics
#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    /// Total memory size
    pub total: usize,
    /// Currently used heap memory
    pub heap_used: usize,
    /// Currently used stack memory
    pub stack_used: usize,
    /// Free memory available
    pub free: usize,
    /// Live handles across all open scopes
    pub handles: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::HandleScope;

    #[test]
    fn test_create_context() {
        let ctx = Context::new(64 * 1024);
        let stats = ctx.memory_stats();
        assert_eq!(stats.total, 64 * 1024);
        assert_eq!(stats.heap_used, 0);
        assert_eq!(stats.stack_used, 0);
        assert_eq!(ctx.vm_state(), VmState::Other);
        assert!(!ctx.has_pending_exception());
    }

    #[test]
    #[should_panic(expected = "Memory size must be at least")]
    fn test_too_small_context() {
        Context::new(1024);
    }

    #[test]
    fn test_collect_frees_unrooted_objects() {
        let ctx = Context::new(16 * 1024);
        {
            let scope = HandleScope::new(&ctx);
            scope.new_object(8).unwrap();
        }
        assert!(ctx.memory_stats().heap_used > 0);
        let stats = ctx.collect_garbage();
        assert_eq!(stats.objects_after, 0);
        assert_eq!(ctx.memory_stats().heap_used, 0);
        assert!(ctx.gc_count() >= 1);
        assert_eq!(ctx.vm_state(), VmState::Other);
    }

    #[test]
    fn test_allocation_collects_when_full() {
        let ctx = Context::new(8 * 1024);
        for _ in 0..64 {
            let scope = HandleScope::new(&ctx);
            scope.new_object(16).unwrap();
        }
        assert!(ctx.gc_count() > 0);
    }

    #[test]
    fn test_out_of_memory_when_everything_is_live() {
        let ctx = Context::new(8 * 1024);
        let scope = HandleScope::new(&ctx);
        let err = loop {
            if let Err(err) = scope.new_object(16) {
                break err;
            }
        };
        assert!(matches!(err, ApiError::OutOfMemory { .. }));
    }

    #[test]
    fn test_stress_mode_collects_on_every_allocation() {
        let ctx = Context::with_config(ContextConfig {
            heap_size: 16 * 1024,
            gc_on_every_allocation: true,
            ..ContextConfig::default()
        });
        let scope = HandleScope::new(&ctx);
        scope.new_object(1).unwrap();
        scope.new_string("x").unwrap();
        assert_eq!(ctx.gc_count(), 2);
    }

    #[test]
    fn test_pending_exception_is_a_root() {
        let ctx = Context::new(16 * 1024);
        {
            let scope = HandleScope::new(&ctx);
            scope.new_object(4).unwrap();
            let error = scope.new_string("boom").unwrap();
            scope.throw_exception(error);
        }
        ctx.collect_garbage();

        let scope = HandleScope::new(&ctx);
        let thrown = scope.take_exception().unwrap();
        assert_eq!(thrown.cast::<crate::api::Name>().to_rust_string(), "boom");
        assert!(!ctx.has_pending_exception());
    }
}
