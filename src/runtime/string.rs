//! JavaScript string representation
//!
//! Strings are stored as UTF-8. The block body is the byte length in one
//! word followed by the bytes; the collector never looks inside.

use crate::context::Context;
use crate::error::ApiResult;
use crate::gc::MemoryTag;
use crate::value::{Value, WORD_SIZE};

use super::object::HeapObject;

/// Maximum string length in bytes
pub const MAX_STRING_LENGTH: usize = (1 << 30) - 1;

/// Allocate a string holding `s`
pub fn allocate_string(context: &Context, s: &str) -> ApiResult<HeapObject> {
    assert!(s.len() <= MAX_STRING_LENGTH, "string of {} bytes is too long", s.len());
    let ptr = context.allocate(WORD_SIZE + s.len(), MemoryTag::String, 0)?;
    unsafe {
        (ptr as *mut usize).write(s.len());
        std::ptr::copy_nonoverlapping(s.as_ptr(), ptr.add(WORD_SIZE), s.len());
    }
    Ok(HeapObject::from_raw(ptr))
}

/// Whether `value` is a string
#[inline]
pub fn is_string(value: Value) -> bool {
    HeapObject::from_value(value).is_some_and(|object| object.tag() == MemoryTag::String)
}

/// Copy a string's contents out of the heap
///
/// Returns None if `value` is not a string.
pub fn to_rust_string(value: Value) -> Option<String> {
    let object = HeapObject::from_value(value)?;
    let bytes = object.string_bytes()?;
    // Only allocate_string writes string blocks, always from a &str
    Some(String::from_utf8_lossy(bytes).into_owned())
}
