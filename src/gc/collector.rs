//! Mark-compact garbage collector
//!
//! The GC works in three phases:
//! 1. Mark: Traverse all reachable objects starting from roots, set mark bit
//! 2. Forward: Compute where each live block slides to, rewrite every
//!    root slot and every object field that points at a moving block
//! 3. Compact: Slide all marked objects down to eliminate gaps
//!
//! Roots are visited through [`ObjectVisitor`]. Anything that holds Values
//! across an allocation (handles, frame slot blocks, argument vectors) must be
//! reachable from [`Roots::iterate_roots`], or it will dangle after a move.

use std::cell::Cell;

use super::allocator::{BlockHeader, Heap, MemoryTag};
use crate::value::{Value, WORD_SIZE};

/// Visitor over slots that hold managed references
///
/// Slots are visited in place: a visitor may rewrite any of them.
pub trait ObjectVisitor {
    fn visit_pointers(&mut self, slots: &[Cell<Value>]);
}

/// A set of root slots
pub trait Roots {
    fn iterate_roots(&self, visitor: &mut dyn ObjectVisitor);
}

/// Statistics about a GC run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of objects before collection
    pub objects_before: usize,
    /// Number of objects after collection
    pub objects_after: usize,
    /// Bytes freed
    pub bytes_freed: usize,
    /// Bytes moved during compaction
    pub bytes_moved: usize,
}

/// Run garbage collection on the heap
pub fn collect(heap: &Heap, roots: &dyn Roots) -> GcStats {
    let used_before = heap.heap_used();
    let objects_before = heap.iter_blocks().count();

    // Phase 1: Mark reachable objects
    clear_marks(heap);
    let mut marker = Marker {
        heap,
        worklist: Vec::new(),
    };
    roots.iterate_roots(&mut marker);
    marker.drain();

    // Phase 2: Compute forwarding and update pointers
    let (forwarding, live_end, objects_after) = compute_forwarding(heap);
    if !forwarding.is_empty() {
        let mut updater = Updater {
            heap,
            forwarding: &forwarding,
        };
        roots.iterate_roots(&mut updater);
        update_heap_fields(heap, &mut updater);
    }

    // Phase 3: Slide objects to new positions
    let bytes_moved = compact(heap, &forwarding);
    heap.set_heap_used(live_end);
    clear_marks(heap);

    GcStats {
        objects_before,
        objects_after,
        bytes_freed: used_before - live_end,
        bytes_moved,
    }
}

/// Clear all mark bits
fn clear_marks(heap: &Heap) {
    for (ptr, _) in heap.iter_blocks() {
        unsafe { heap.get_header(ptr).set_marked(false) };
    }
}

/// Slots of a block body
///
/// # Safety
/// `ptr` must be the data pointer of a live block whose body is made of Values.
unsafe fn body<'a>(ptr: *mut u8, header: BlockHeader) -> &'a [Cell<Value>] {
    unsafe { std::slice::from_raw_parts(ptr as *const Cell<Value>, header.size_words()) }
}

struct Marker<'h> {
    heap: &'h Heap,
    worklist: Vec<*mut u8>,
}

impl Marker<'_> {
    fn mark(&mut self, value: Value) {
        let Some(ptr) = value.to_ptr::<u8>() else {
            return;
        };
        if !self.heap.is_heap_ptr(ptr) {
            return;
        }

        let header = unsafe { self.heap.get_header(ptr) };
        if header.is_marked() {
            return;
        }
        header.set_marked(true);
        if header.tag().has_pointers() {
            self.worklist.push(ptr);
        }
    }

    fn drain(&mut self) {
        while let Some(ptr) = self.worklist.pop() {
            let header = unsafe { *self.heap.get_header(ptr) };
            for slot in unsafe { body(ptr, header) } {
                self.mark(slot.get());
            }
        }
    }
}

impl ObjectVisitor for Marker<'_> {
    fn visit_pointers(&mut self, slots: &[Cell<Value>]) {
        for slot in slots {
            self.mark(slot.get());
        }
    }
}

/// Compute new data offsets for every moving live block
///
/// Returns the `(old, new)` data offsets sorted by old offset, the end of the
/// live heap after compaction, and the number of live blocks.
fn compute_forwarding(heap: &Heap) -> (Vec<(usize, usize)>, usize, usize) {
    let mut forwarding = Vec::new();
    let mut write_offset = 0usize;
    let mut live = 0usize;

    for (ptr, header) in heap.iter_blocks() {
        if !header.is_marked() || header.tag() == MemoryTag::Free {
            continue;
        }
        let read_offset = heap.offset_of(ptr) - WORD_SIZE;
        if read_offset != write_offset {
            forwarding.push((read_offset + WORD_SIZE, write_offset + WORD_SIZE));
        }
        write_offset += header.size_bytes();
        live += 1;
    }

    (forwarding, write_offset, live)
}

struct Updater<'h, 'f> {
    heap: &'h Heap,
    forwarding: &'f [(usize, usize)],
}

impl Updater<'_, '_> {
    fn forward(&self, value: Value) -> Value {
        let Some(ptr) = value.to_ptr::<u8>() else {
            return value;
        };
        if !self.heap.is_heap_ptr(ptr) {
            return value;
        }
        let old = self.heap.offset_of(ptr);
        match self.forwarding.binary_search_by_key(&old, |&(from, _)| from) {
            Ok(i) => {
                let new = self.forwarding[i].1;
                Value::from_ptr(unsafe { self.heap.base().add(new) })
            }
            Err(_) => value,
        }
    }
}

impl ObjectVisitor for Updater<'_, '_> {
    fn visit_pointers(&mut self, slots: &[Cell<Value>]) {
        for slot in slots {
            slot.set(self.forward(slot.get()));
        }
    }
}

/// Rewrite the fields of every live object, in place at their old addresses
fn update_heap_fields(heap: &Heap, updater: &mut Updater<'_, '_>) {
    for (ptr, header) in heap.iter_blocks() {
        if header.is_marked() && header.tag().has_pointers() {
            updater.visit_pointers(unsafe { body(ptr, header) });
        }
    }
}

/// Slide moving blocks to their new offsets, lowest first
fn compact(heap: &Heap, forwarding: &[(usize, usize)]) -> usize {
    let mut moved = 0;
    for &(old, new) in forwarding {
        unsafe {
            let src = heap.base().add(old - WORD_SIZE);
            let dst = heap.base().add(new - WORD_SIZE);
            let size = (*(src as *const BlockHeader)).size_bytes();
            std::ptr::copy(src, dst, size);
            moved += size;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fixed list of root slots
    struct SlotRoots(Vec<Cell<Value>>);

    impl Roots for SlotRoots {
        fn iterate_roots(&self, visitor: &mut dyn ObjectVisitor) {
            visitor.visit_pointers(&self.0);
        }
    }

    fn alloc_fields(heap: &Heap, fields: &[Value]) -> Value {
        let ptr = heap
            .alloc(fields.len() * WORD_SIZE, MemoryTag::Object, 0)
            .unwrap();
        for (i, field) in fields.iter().enumerate() {
            unsafe { (ptr as *mut Value).add(i).write(*field) };
        }
        Value::from_ptr(ptr)
    }

    fn field(value: Value, i: usize) -> Value {
        unsafe { value.to_ptr::<Value>().unwrap().add(i).read() }
    }

    #[test]
    fn test_collect_empty_heap() {
        let heap = Heap::new(4096);
        let stats = collect(&heap, &SlotRoots(Vec::new()));
        assert_eq!(stats, GcStats::default());
    }

    #[test]
    fn test_unreachable_objects_are_freed() {
        let heap = Heap::new(4096);
        alloc_fields(&heap, &[Value::int(1)]);
        alloc_fields(&heap, &[Value::int(2), Value::int(3)]);

        let stats = collect(&heap, &SlotRoots(Vec::new()));
        assert_eq!(stats.objects_before, 2);
        assert_eq!(stats.objects_after, 0);
        assert_eq!(heap.heap_used(), 0);
    }

    #[test]
    fn test_live_object_slides_and_root_is_rewritten() {
        let heap = Heap::new(4096);
        alloc_fields(&heap, &[Value::int(0); 4]);
        let live = alloc_fields(&heap, &[Value::int(42)]);

        let roots = SlotRoots(vec![Cell::new(live), Cell::new(Value::int(7))]);
        let stats = collect(&heap, &roots);

        let moved = roots.0[0].get();
        assert_ne!(moved, live);
        assert_eq!(field(moved, 0).to_i32(), Some(42));
        assert_eq!(roots.0[1].get().to_i32(), Some(7));
        assert_eq!(stats.objects_after, 1);
        assert_eq!(stats.bytes_moved, 2 * WORD_SIZE);
    }

    #[test]
    fn test_interior_pointers_follow_moves() {
        let heap = Heap::new(4096);
        alloc_fields(&heap, &[Value::null(); 3]);
        let child = alloc_fields(&heap, &[Value::int(5)]);
        let parent = alloc_fields(&heap, &[child, Value::hole()]);

        let roots = SlotRoots(vec![Cell::new(parent)]);
        collect(&heap, &roots);

        let parent = roots.0[0].get();
        let child = field(parent, 0);
        assert_eq!(field(child, 0).to_i32(), Some(5));
        assert!(field(parent, 1).is_hole());
        assert!(heap.is_heap_ptr(child.to_ptr::<u8>().unwrap()));
    }

    #[test]
    fn test_cycles_are_collected_or_kept_whole() {
        let heap = Heap::new(4096);
        let a = alloc_fields(&heap, &[Value::undefined()]);
        let b = alloc_fields(&heap, &[a]);
        unsafe { a.to_ptr::<Value>().unwrap().write(b) };

        let roots = SlotRoots(vec![Cell::new(b)]);
        let stats = collect(&heap, &roots);
        assert_eq!(stats.objects_after, 2);

        let roots = SlotRoots(Vec::new());
        let stats = collect(&heap, &roots);
        assert_eq!(stats.objects_after, 0);
    }

    #[test]
    fn test_marks_are_cleared_after_collection() {
        let heap = Heap::new(4096);
        let live = alloc_fields(&heap, &[Value::int(1)]);
        collect(&heap, &SlotRoots(vec![Cell::new(live)]));
        assert!(heap.iter_blocks().all(|(_, h)| !h.is_marked()));
    }
}
