//! Arena allocator for the JavaScript heap
//!
//! Memory layout:
//! ```text
//! +------------------+
//! |   Heap (grows ↓) |  <- base
//! |       ...        |
//! |   [allocated]    |  <- heap_ptr
//! +------------------+
//! |   Free space     |
//! +------------------+
//! |   [stack top]    |  <- stack_ptr
//! |       ...        |
//! |  Stack (grows ↑) |  <- total_size
//! +------------------+
//! ```
//!
//! Heap allocations are word-aligned and have a block header in the first word.
//! The stack region holds native frame slot blocks and argument vectors. Every
//! word in it is a `Value`; only ranges registered as relocatable are traced.

use std::cell::Cell;
use std::ptr::NonNull;

use crate::value::{Value, WORD_SIZE};

/// Memory block tags - stored in bits 1-3 of each block header
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTag {
    /// Free block
    Free = 0,
    /// JavaScript object (class id in the header's aux byte, fields are Values)
    Object = 1,
    /// 64-bit float (boxed)
    Float64 = 2,
    /// String (byte length word followed by UTF-8 bytes)
    String = 3,
}

impl MemoryTag {
    pub const COUNT: usize = 4;

    /// Whether the block body is made of Values the collector must trace
    #[inline]
    pub const fn has_pointers(self) -> bool {
        matches!(self, MemoryTag::Object)
    }

    #[inline]
    const fn from_bits(bits: u8) -> Self {
        match bits {
            1 => MemoryTag::Object,
            2 => MemoryTag::Float64,
            3 => MemoryTag::String,
            _ => MemoryTag::Free,
        }
    }
}

/// Number of bits reserved for mark bit and memory tag
const MTAG_BITS: u32 = 4;

/// Number of bits reserved for block-specific data (object class id)
const AUX_BITS: u32 = 8;

/// Shift of the size field
const SIZE_SHIFT: u32 = MTAG_BITS + AUX_BITS;

/// Memory block header
///
/// Every allocated block starts with this header.
/// Layout (in a single word):
/// - Bit 0: GC mark bit
/// - Bits 1-3: Memory tag
/// - Bits 4-11: Aux byte (class id for objects)
/// - Remaining bits: Size in words, excluding the header
#[repr(C)]
#[derive(Clone, Copy)]
pub struct BlockHeader {
    pub bits: usize,
}

impl BlockHeader {
    /// Create a new block header
    #[inline]
    pub const fn new(tag: MemoryTag, aux: u8, size_words: usize) -> Self {
        BlockHeader {
            bits: ((tag as usize) << 1) | ((aux as usize) << MTAG_BITS) | (size_words << SIZE_SHIFT),
        }
    }

    /// Get the GC mark bit
    #[inline]
    pub const fn is_marked(&self) -> bool {
        (self.bits & 1) != 0
    }

    /// Set the GC mark bit
    #[inline]
    pub fn set_marked(&mut self, marked: bool) {
        if marked {
            self.bits |= 1;
        } else {
            self.bits &= !1;
        }
    }

    /// Get the memory tag
    #[inline]
    pub const fn tag(&self) -> MemoryTag {
        MemoryTag::from_bits(((self.bits >> 1) & 0x7) as u8)
    }

    /// Get the aux byte
    #[inline]
    pub const fn aux(&self) -> u8 {
        ((self.bits >> MTAG_BITS) & ((1 << AUX_BITS) - 1)) as u8
    }

    /// Get the block size in words (excluding header)
    #[inline]
    pub const fn size_words(&self) -> usize {
        self.bits >> SIZE_SHIFT
    }

    /// Get the block size in bytes (including header)
    #[inline]
    pub const fn size_bytes(&self) -> usize {
        (self.size_words() + 1) * WORD_SIZE
    }
}

/// The JavaScript heap
///
/// Owns one word-aligned buffer. All access goes through `base`, a pointer
/// taken once at construction, so shared references to the heap can read and
/// write words while the collector relocates blocks.
pub struct Heap {
    /// Backing storage; only kept alive, never touched directly
    _buffer: Vec<usize>,

    /// Base pointer of the buffer
    base: NonNull<u8>,

    /// Total size of the buffer
    pub total_size: usize,

    /// Current heap pointer (end of allocated heap)
    heap_ptr: Cell<usize>,

    /// Current stack pointer (bottom of stack)
    stack_ptr: Cell<usize>,

    /// Minimum free space to maintain
    min_free_size: usize,
}

/// Minimum free space between heap and stack
const MIN_FREE_SIZE: usize = 512;

impl Heap {
    /// Create a new heap with the given total size (rounded down to words)
    pub fn new(total_size: usize) -> Self {
        let words = total_size / WORD_SIZE;
        let mut buffer = vec![0usize; words];
        // The Vec's allocation never moves, so the pointer stays valid for the heap's lifetime
        let base = NonNull::new(buffer.as_mut_ptr() as *mut u8).unwrap_or(NonNull::dangling());
        let total_size = words * WORD_SIZE;

        Heap {
            _buffer: buffer,
            base,
            total_size,
            heap_ptr: Cell::new(0),
            stack_ptr: Cell::new(total_size),
            min_free_size: MIN_FREE_SIZE.min(total_size / 4),
        }
    }

    /// Get base pointer of the buffer
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Get the amount of heap memory used
    #[inline]
    pub fn heap_used(&self) -> usize {
        self.heap_ptr.get()
    }

    /// Get the amount of stack memory used
    #[inline]
    pub fn stack_used(&self) -> usize {
        self.total_size - self.stack_ptr.get()
    }

    /// Get the amount of free space
    #[inline]
    pub fn free_space(&self) -> usize {
        self.stack_ptr.get().saturating_sub(self.heap_ptr.get())
    }

    /// Check if we have enough free memory
    #[inline]
    fn check_free(&self, size: usize) -> bool {
        self.free_space() >= size + self.min_free_size
    }

    /// Allocate a block of memory
    ///
    /// A zero `size` yields a header-only block. Returns None if out of memory.
    /// The block body is left as-is; callers initialize it before the next
    /// allocation can trigger a collection.
    pub fn alloc(&self, size: usize, tag: MemoryTag, aux: u8) -> Option<*mut u8> {
        // Round up to word alignment, add header size
        let aligned_size = (size + WORD_SIZE - 1) & !(WORD_SIZE - 1);
        let total_size = aligned_size + WORD_SIZE; // +1 word for header

        if !self.check_free(total_size) {
            return None;
        }

        let offset = self.heap_ptr.get();
        self.heap_ptr.set(offset + total_size);

        unsafe {
            let ptr = self.base().add(offset);
            *(ptr as *mut BlockHeader) = BlockHeader::new(tag, aux, aligned_size / WORD_SIZE);

            // Return pointer to data (after header)
            Some(ptr.add(WORD_SIZE))
        }
    }

    /// Get the header for an allocated block
    ///
    /// # Safety
    /// Caller must ensure ptr points to the data of a valid allocated block.
    #[inline]
    pub unsafe fn get_header(&self, ptr: *mut u8) -> &mut BlockHeader {
        unsafe { &mut *(ptr.sub(WORD_SIZE) as *mut BlockHeader) }
    }

    /// Check if a pointer lies inside the allocated heap region
    #[inline]
    pub fn is_heap_ptr(&self, ptr: *const u8) -> bool {
        let base = self.base() as usize;
        let ptr_val = ptr as usize;
        ptr_val > base && ptr_val < base + self.heap_ptr.get()
    }

    /// Offset of a block's data from the heap base
    #[inline]
    pub fn offset_of(&self, ptr: *const u8) -> usize {
        ptr as usize - self.base() as usize
    }

    /// Reserve `words` words on the stack, each set to `fill`
    ///
    /// Returns the byte offset of the first word, or None if out of stack space.
    pub fn stack_push(&self, words: usize, fill: Value) -> Option<usize> {
        let size = words * WORD_SIZE;

        if self.stack_ptr.get() < self.heap_ptr.get() + size + self.min_free_size {
            return None;
        }

        let offset = self.stack_ptr.get() - size;
        self.stack_ptr.set(offset);
        for i in 0..words {
            self.write_word(offset + i * WORD_SIZE, fill);
        }
        Some(offset)
    }

    /// Pop words from the stack
    pub fn stack_pop(&self, words: usize) {
        let size = words * WORD_SIZE;
        self.stack_ptr.set((self.stack_ptr.get() + size).min(self.total_size));
    }

    /// Get the current stack offset
    #[inline]
    pub fn stack_offset(&self) -> usize {
        self.stack_ptr.get()
    }

    /// Pointer to the word at `offset`
    #[inline]
    pub fn word_ptr(&self, offset: usize) -> *mut Value {
        assert!(
            offset % WORD_SIZE == 0 && offset + WORD_SIZE <= self.total_size,
            "word offset {offset} outside the arena"
        );
        unsafe { self.base().add(offset) as *mut Value }
    }

    /// Read the word at `offset`
    ///
    /// Also usable after a frame is gone, to inspect what its teardown left behind.
    #[inline]
    pub fn read_word(&self, offset: usize) -> Value {
        unsafe { self.word_ptr(offset).read() }
    }

    /// Write the word at `offset`
    #[inline]
    pub fn write_word(&self, offset: usize, value: Value) {
        unsafe { self.word_ptr(offset).write(value) }
    }

    /// Move the end of the allocated heap after compaction
    pub(crate) fn set_heap_used(&self, offset: usize) {
        debug_assert!(offset <= self.heap_ptr.get());
        self.heap_ptr.set(offset);
    }

    /// Iterator over all allocated blocks in the heap
    pub fn iter_blocks(&self) -> BlockIterator<'_> {
        BlockIterator {
            heap: self,
            offset: 0,
        }
    }
}

/// Iterator over allocated blocks in the heap
///
/// Yields the data pointer and a copy of the header of each block.
pub struct BlockIterator<'a> {
    heap: &'a Heap,
    offset: usize,
}

impl Iterator for BlockIterator<'_> {
    type Item = (*mut u8, BlockHeader);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.heap.heap_used() {
            return None;
        }

        unsafe {
            let header = *(self.heap.base().add(self.offset) as *const BlockHeader);
            let data_ptr = self.heap.base().add(self.offset + WORD_SIZE);

            self.offset += header.size_bytes();

            Some((data_ptr, header))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_creation() {
        let heap = Heap::new(1024);
        assert_eq!(heap.total_size, 1024);
        assert_eq!(heap.heap_used(), 0);
        assert!(heap.free_space() > 0);
        assert_eq!(heap.base() as usize % WORD_SIZE, 0);
    }

    #[test]
    fn test_alloc() {
        let heap = Heap::new(4096);

        let ptr = heap.alloc(64, MemoryTag::Object, 3);
        assert!(ptr.is_some());
        assert!(heap.heap_used() > 0);

        unsafe {
            let header = heap.get_header(ptr.unwrap());
            assert_eq!(header.tag(), MemoryTag::Object);
            assert_eq!(header.aux(), 3);
            assert_eq!(header.size_words(), 64 / WORD_SIZE);
            assert!(!header.is_marked());
        }
    }

    #[test]
    fn test_zero_sized_alloc() {
        let heap = Heap::new(4096);
        let ptr = heap.alloc(0, MemoryTag::Object, 0).unwrap();
        assert_eq!(heap.heap_used(), WORD_SIZE);
        assert!(heap.is_heap_ptr(ptr));
    }

    #[test]
    fn test_out_of_memory() {
        let heap = Heap::new(1024);
        assert!(heap.alloc(2048, MemoryTag::Object, 0).is_none());
    }

    #[test]
    fn test_block_iterator() {
        let heap = Heap::new(4096);

        heap.alloc(32, MemoryTag::Object, 0);
        heap.alloc(64, MemoryTag::String, 0);
        heap.alloc(16, MemoryTag::Float64, 0);

        let tags: Vec<_> = heap.iter_blocks().map(|(_, h)| h.tag()).collect();
        assert_eq!(tags, vec![MemoryTag::Object, MemoryTag::String, MemoryTag::Float64]);
    }

    #[test]
    fn test_stack_operations() {
        let heap = Heap::new(4096);

        let initial_free = heap.free_space();

        let offset = heap.stack_push(4, Value::hole()).unwrap();
        assert!(heap.free_space() < initial_free);
        for i in 0..4 {
            assert!(heap.read_word(offset + i * WORD_SIZE).is_hole());
        }

        heap.stack_pop(4);
        assert_eq!(heap.free_space(), initial_free);

        // Popped words are still readable
        assert!(heap.read_word(offset).is_hole());
    }

    #[test]
    fn test_stack_meets_heap() {
        let heap = Heap::new(1024);
        assert!(heap.stack_push(1024 / WORD_SIZE, Value::undefined()).is_none());
    }

    #[test]
    fn test_header_mark_bit() {
        let mut header = BlockHeader::new(MemoryTag::Object, 7, 8);
        assert!(!header.is_marked());

        header.set_marked(true);
        assert!(header.is_marked());
        assert_eq!(header.tag(), MemoryTag::Object);
        assert_eq!(header.aux(), 7);
        assert_eq!(header.size_words(), 8);

        header.set_marked(false);
        assert!(!header.is_marked());
    }
}
