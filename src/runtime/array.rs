//! JavaScript Array implementation
//!
//! Arrays use "no-hole" semantics: every element from index 0 to length-1
//! is defined. An array is an `Array`-class object whose fields are its
//! elements, so its length is fixed at allocation.

use crate::context::Context;
use crate::error::ApiResult;
use crate::value::Value;

use super::object::{ClassId, HeapObject, allocate_object, class_of};

/// Maximum array length (2^30 - 1)
pub const MAX_ARRAY_LENGTH: u32 = (1 << 30) - 1;

/// Allocate an array of `length` undefined elements
pub fn allocate_array(context: &Context, length: u32) -> ApiResult<HeapObject> {
    assert!(length <= MAX_ARRAY_LENGTH, "array length {length} too large");
    allocate_object(context, ClassId::Array, length as usize)
}

#[inline]
pub fn is_array(value: Value) -> bool {
    class_of(value) == Some(ClassId::Array)
}

/// Length of an array
#[inline]
pub fn array_length(array: HeapObject) -> u32 {
    debug_assert_eq!(array.class_id(), Some(ClassId::Array));
    array.field_count() as u32
}

/// Element at `index`, None past the end
pub fn array_get(array: HeapObject, index: u32) -> Option<Value> {
    (index < array_length(array)).then(|| array.field(index as usize))
}
