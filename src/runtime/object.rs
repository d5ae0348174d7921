//! JavaScript object representation
//!
//! Every heap block carries a [`BlockHeader`](crate::gc::BlockHeader). Objects
//! use the `Object` memory tag, keep their class id in the header's aux byte,
//! and store their fields as a run of `Value`s after the header. Strings and
//! boxed numbers use their own memory tags and hold raw bytes.
//!
//! A [`HeapObject`] is a raw view of one block. It is only valid until the
//! next allocation, which may move the block; code that allocates must read
//! its inputs through handles again afterwards.

use crate::context::Context;
use crate::error::ApiResult;
use crate::gc::{BlockHeader, MemoryTag};
use crate::value::{Value, WORD_SIZE};

/// JavaScript class IDs
///
/// These identify the kind of an `Object`-tagged block.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassId {
    /// Plain object, fields are internal fields
    Object = 0,
    /// Dense array, fields are the elements
    Array = 1,
    /// Function instantiated from a template
    Function = 2,
    /// Function template: native callback plus data
    FunctionTemplate = 3,
}

impl ClassId {
    #[inline]
    pub const fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(ClassId::Object),
            1 => Some(ClassId::Array),
            2 => Some(ClassId::Function),
            3 => Some(ClassId::FunctionTemplate),
            _ => None,
        }
    }

    /// Whether instances are JS receivers (objects visible to script)
    #[inline]
    pub const fn is_receiver(self) -> bool {
        matches!(self, ClassId::Object | ClassId::Array | ClassId::Function)
    }
}

/// Raw view of a heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapObject {
    ptr: *mut u8,
}

impl HeapObject {
    /// View the block a pointer value refers to
    #[inline]
    pub fn from_value(value: Value) -> Option<Self> {
        value.to_ptr::<u8>().map(|ptr| HeapObject { ptr })
    }

    /// View a freshly allocated block
    #[inline]
    pub(crate) fn from_raw(ptr: *mut u8) -> Self {
        HeapObject { ptr }
    }

    #[inline]
    pub fn value(self) -> Value {
        Value::from_ptr(self.ptr)
    }

    #[inline]
    fn header(self) -> BlockHeader {
        // Pointer values always refer to the data of an allocated block
        unsafe { *(self.ptr.sub(WORD_SIZE) as *const BlockHeader) }
    }

    #[inline]
    pub fn tag(self) -> MemoryTag {
        self.header().tag()
    }

    /// Class of an object block, None for strings and numbers
    #[inline]
    pub fn class_id(self) -> Option<ClassId> {
        match self.tag() {
            MemoryTag::Object => ClassId::from_u8(self.header().aux()),
            _ => None,
        }
    }

    /// Number of fields of an object block
    #[inline]
    pub fn field_count(self) -> usize {
        debug_assert_eq!(self.tag(), MemoryTag::Object);
        self.header().size_words()
    }

    pub fn field(self, index: usize) -> Value {
        assert!(index < self.field_count(), "field {index} out of range");
        unsafe { (self.ptr as *const Value).add(index).read() }
    }

    pub fn set_field(self, index: usize, value: Value) {
        assert!(index < self.field_count(), "field {index} out of range");
        unsafe { (self.ptr as *mut Value).add(index).write(value) }
    }

    /// Payload of a boxed number
    pub fn as_f64(self) -> Option<f64> {
        (self.tag() == MemoryTag::Float64).then(|| unsafe { (self.ptr as *const f64).read_unaligned() })
    }

    /// Bytes of a string
    pub(crate) fn string_bytes(&self) -> Option<&[u8]> {
        if self.tag() != MemoryTag::String {
            return None;
        }
        unsafe {
            let len = (self.ptr as *const usize).read();
            Some(std::slice::from_raw_parts(self.ptr.add(WORD_SIZE), len))
        }
    }
}

/// Class of the object `value` refers to, if it is one
#[inline]
pub fn class_of(value: Value) -> Option<ClassId> {
    HeapObject::from_value(value).and_then(HeapObject::class_id)
}

/// Whether `value` is a JS receiver
#[inline]
pub fn is_receiver(value: Value) -> bool {
    class_of(value).is_some_and(ClassId::is_receiver)
}

/// Allocate an object of `class` with `fields` fields, all undefined
pub fn allocate_object(context: &Context, class: ClassId, fields: usize) -> ApiResult<HeapObject> {
    let ptr = context.allocate(fields * WORD_SIZE, MemoryTag::Object, class as u8)?;
    let object = HeapObject::from_raw(ptr);
    for i in 0..fields {
        object.set_field(i, Value::undefined());
    }
    Ok(object)
}
