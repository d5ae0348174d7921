//! Views of an argument frame handed to native callbacks
//!
//! The views read straight from the frame's slots, so every Local they hand
//! out is rooted by the frame and follows relocation.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::arguments::{FunctionSlot, PropertySlot};
use crate::context::Context;
use crate::error::ApiResult;
use crate::handles::{HandleScope, Local};
use crate::runtime;
use crate::value::{SHORT_INT_MAX, Value};

use super::types::{Any, Boolean, Integer, Object, PropertyAttribute};

/// What a property interceptor sees
pub struct PropertyCallbackInfo<'s, T> {
    slots: &'s [Cell<Value>],
    context: &'s Context,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T> PropertyCallbackInfo<'s, T> {
    pub(crate) fn new(slots: &'s [Cell<Value>], context: &'s Context) -> Self {
        PropertyCallbackInfo {
            slots,
            context,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn slot(&self, slot: PropertySlot) -> &'s Cell<Value> {
        &self.slots[slot as usize]
    }

    /// The receiver of the property access
    #[inline]
    pub fn this(&self) -> Local<'s, Any> {
        Local::from_slot(self.slot(PropertySlot::This))
    }

    /// The object the interceptor is installed on
    #[inline]
    pub fn holder(&self) -> Local<'s, Object> {
        Local::from_slot(self.slot(PropertySlot::Holder))
    }

    /// Data the interceptor was registered with
    #[inline]
    pub fn data(&self) -> Local<'s, Any> {
        Local::from_slot(self.slot(PropertySlot::Data))
    }

    #[inline]
    pub fn get_context(&self) -> &'s Context {
        self.context
    }

    /// Whether a failed write should throw (strict mode)
    pub fn should_throw_on_error(&self) -> bool {
        self.slot(PropertySlot::ShouldThrow).get() == Value::int(1)
    }

    #[inline]
    pub fn get_return_value(&self) -> ReturnValue<'s, T> {
        ReturnValue::new(
            self.slot(PropertySlot::ReturnValue),
            self.slot(PropertySlot::ReturnValueDefault),
            self.context,
        )
    }
}

/// What a function callback sees
pub struct FunctionCallbackInfo<'s, T> {
    slots: &'s [Cell<Value>],
    /// Receiver followed by the arguments
    argv: &'s [Cell<Value>],
    context: &'s Context,
    is_construct_call: bool,
    undefined: Cell<Value>,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T> FunctionCallbackInfo<'s, T> {
    pub(crate) fn new(
        slots: &'s [Cell<Value>],
        argv: &'s [Cell<Value>],
        context: &'s Context,
        is_construct_call: bool,
    ) -> Self {
        debug_assert!(!argv.is_empty(), "argument vector without a receiver");
        FunctionCallbackInfo {
            slots,
            argv,
            context,
            is_construct_call,
            undefined: Cell::new(Value::undefined()),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn slot(&self, slot: FunctionSlot) -> &'s Cell<Value> {
        &self.slots[slot as usize]
    }

    /// Number of arguments
    #[inline]
    pub fn length(&self) -> usize {
        self.argv.len() - 1
    }

    /// Argument `index`, undefined past the end
    pub fn get(&self, index: usize) -> Local<'_, Any> {
        match self.argv.get(index + 1) {
            Some(slot) => Local::from_slot(slot),
            None => Local::from_slot(&self.undefined),
        }
    }

    /// The receiver
    #[inline]
    pub fn this(&self) -> Local<'s, Any> {
        Local::from_slot(&self.argv[0])
    }

    #[inline]
    pub fn holder(&self) -> Local<'s, Object> {
        Local::from_slot(self.slot(FunctionSlot::Holder))
    }

    /// The function or template being called
    #[inline]
    pub fn callee(&self) -> Local<'s, Any> {
        Local::from_slot(self.slot(FunctionSlot::Callee))
    }

    #[inline]
    pub fn data(&self) -> Local<'s, Any> {
        Local::from_slot(self.slot(FunctionSlot::Data))
    }

    /// Whether the call came from `new`
    #[inline]
    pub fn is_construct_call(&self) -> bool {
        self.is_construct_call
    }

    #[inline]
    pub fn get_context(&self) -> &'s Context {
        self.context
    }

    #[inline]
    pub fn get_return_value(&self) -> ReturnValue<'s, T> {
        ReturnValue::new(
            self.slot(FunctionSlot::ReturnValue),
            self.slot(FunctionSlot::ReturnValueDefault),
            self.context,
        )
    }
}

/// Writer for a frame's return-value slot
///
/// The slot starts out as the hole, which the caller reads as "no value".
pub struct ReturnValue<'s, T> {
    value: &'s Cell<Value>,
    default: &'s Cell<Value>,
    context: &'s Context,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T> ReturnValue<'s, T> {
    fn new(value: &'s Cell<Value>, default: &'s Cell<Value>, context: &'s Context) -> Self {
        ReturnValue {
            value,
            default,
            context,
            _marker: PhantomData,
        }
    }

    /// The current result, undefined while none is set
    pub fn get<'t>(&self, scope: &'t HandleScope<'_>) -> Local<'t, Any> {
        let value = self.value.get();
        scope.local(if value.is_hole() { Value::undefined() } else { value })
    }

    /// Forget any result set so far
    pub fn reset(&self) {
        self.value.set(self.default.get());
    }

    #[inline]
    fn store(&self, value: Value) {
        self.value.set(value);
    }
}

impl ReturnValue<'_, Any> {
    pub fn set<U>(&self, value: Local<'_, U>) {
        self.store(value.value());
    }

    /// May box the value on the heap
    pub fn set_int(&self, value: i32) -> ApiResult<()> {
        self.set_number(f64::from(value))
    }

    /// May box the value on the heap
    pub fn set_uint(&self, value: u32) -> ApiResult<()> {
        self.set_number(f64::from(value))
    }

    /// May box the value on the heap
    pub fn set_number(&self, value: f64) -> ApiResult<()> {
        // The slot is a root, so a collection during boxing is harmless
        let number = runtime::new_number(self.context, value)?;
        self.store(number);
        Ok(())
    }

    pub fn set_bool(&self, value: bool) {
        self.store(Value::bool(value));
    }

    pub fn set_null(&self) {
        self.store(Value::null());
    }

    pub fn set_undefined(&self) {
        self.store(Value::undefined());
    }
}

impl ReturnValue<'_, Integer> {
    pub fn set(&self, value: Local<'_, Integer>) {
        self.store(value.value());
    }

    /// # Panics
    /// Panics outside the small-integer range.
    pub fn set_int(&self, value: i32) {
        self.store(Value::int(value));
    }

    /// # Panics
    /// Panics outside the small-integer range.
    pub fn set_uint(&self, value: u32) {
        assert!(value <= SHORT_INT_MAX as u32, "{value} does not fit in a small integer");
        self.store(Value::int(value as i32));
    }

    /// Report a present property with `attributes`
    pub fn set_attributes(&self, attributes: PropertyAttribute) {
        self.store(Value::int(attributes.bits() as i32));
    }
}

impl ReturnValue<'_, Boolean> {
    pub fn set(&self, value: Local<'_, Boolean>) {
        self.store(value.value());
    }

    pub fn set_bool(&self, value: bool) {
        self.store(Value::bool(value));
    }
}
