//! Numbers
//!
//! Integral values in the 31-bit range are stored inline as small integers;
//! everything else is boxed in a `Float64` block.

use crate::context::Context;
use crate::error::ApiResult;
use crate::gc::MemoryTag;
use crate::value::{Value, fits_in_short_int};

use super::object::HeapObject;

/// Small integer for `value`, if it has an exact one
#[inline]
pub fn short_int_for(value: f64) -> Option<Value> {
    let truncated = value as i64;
    let exact = truncated as f64 == value && !(value == 0.0 && value.is_sign_negative());
    (exact && fits_in_short_int(truncated)).then(|| Value::int(truncated as i32))
}

/// Encode a number, boxing it when it is not a small integer
pub fn new_number(context: &Context, value: f64) -> ApiResult<Value> {
    if let Some(int) = short_int_for(value) {
        return Ok(int);
    }
    let ptr = context.allocate(size_of::<f64>(), MemoryTag::Float64, 0)?;
    unsafe { (ptr as *mut f64).write_unaligned(value) };
    Ok(HeapObject::from_raw(ptr).value())
}

/// Whether `value` is a number
#[inline]
pub fn is_number(value: Value) -> bool {
    value.is_int() || HeapObject::from_value(value).is_some_and(|object| object.tag() == MemoryTag::Float64)
}

/// Numeric value of a small integer or boxed number
pub fn number_value(value: Value) -> Option<f64> {
    match value.to_i32() {
        Some(i) => Some(f64::from(i)),
        None => HeapObject::from_value(value)?.as_f64(),
    }
}
