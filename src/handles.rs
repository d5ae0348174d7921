//! Handles and handle scopes
//!
//! A [`Local`] is a reference to a slot that the collector knows about: a
//! handle-area slot, a frame slot or an argument-vector slot. Reading a
//! Local always goes through the slot, so a Local taken before a collection
//! observes the object's new address afterwards.
//!
//! Handles live in fixed-size blocks owned by the context. A [`HandleScope`]
//! remembers the fill level at creation and releases everything above it on
//! drop. Scopes must close in LIFO order.

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::api::FunctionCallback;
use crate::api::types::{Any, ApiType, Array, Boolean, Function, FunctionTemplate, Integer, Name, Number, Object};
use crate::context::Context;
use crate::error::ApiResult;
use crate::gc::ObjectVisitor;
use crate::runtime::{self, ClassId, function};
use crate::value::Value;

/// Storage for handles of every open scope
pub(crate) struct HandleArea {
    blocks: Vec<Box<[Cell<Value>]>>,
    block_size: usize,
    /// Number of handles in use
    next: usize,
    /// Number of open scopes
    level: usize,
}

impl HandleArea {
    pub(crate) fn new(block_size: usize) -> Self {
        HandleArea {
            blocks: Vec::new(),
            block_size,
            next: 0,
            level: 0,
        }
    }

    /// Store `value` in a fresh slot
    ///
    /// Blocks are never freed while the context lives, so the slot address
    /// stays valid until the owning scope releases it.
    fn create(&mut self, value: Value) -> NonNull<Cell<Value>> {
        assert!(self.level > 0, "cannot create a handle without a HandleScope");
        let (block, index) = (self.next / self.block_size, self.next % self.block_size);
        if block == self.blocks.len() {
            self.blocks
                .push((0..self.block_size).map(|_| Cell::new(Value::undefined())).collect());
        }
        let slot = &self.blocks[block][index];
        slot.set(value);
        self.next += 1;
        NonNull::from(slot)
    }

    /// Release handles down to `level`
    fn release_to(&mut self, next: usize) {
        for i in next..self.next {
            let slot = &self.blocks[i / self.block_size][i % self.block_size];
            slot.set(if cfg!(debug_assertions) {
                Value::zapped()
            } else {
                Value::undefined()
            });
        }
        self.next = next;
    }

    /// Number of handles in use
    pub(crate) fn len(&self) -> usize {
        self.next
    }

    pub(crate) fn iterate(&self, visitor: &mut dyn ObjectVisitor) {
        let mut remaining = self.next;
        for block in &self.blocks {
            if remaining == 0 {
                break;
            }
            let used = remaining.min(self.block_size);
            visitor.visit_pointers(&block[..used]);
            remaining -= used;
        }
    }
}

/// A GC-visible reference to a value of type `T`
pub struct Local<'s, T> {
    slot: &'s Cell<Value>,
    _marker: PhantomData<T>,
}

impl<T> Clone for Local<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Local<'_, T> {}

impl<T> std::fmt::Debug for Local<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Local").field(&self.slot.get()).finish()
    }
}

impl<'s, T> Local<'s, T> {
    /// Wrap a rooted slot
    #[inline]
    pub(crate) fn from_slot(slot: &'s Cell<Value>) -> Self {
        Local {
            slot,
            _marker: PhantomData,
        }
    }

    /// The current word in the slot
    #[inline]
    pub fn value(&self) -> Value {
        self.slot.get()
    }

    /// Forget the static type
    #[inline]
    pub fn as_any(self) -> Local<'s, Any> {
        Local::from_slot(self.slot)
    }

    /// Check the runtime type and narrow
    pub fn try_cast<U: ApiType>(self) -> Option<Local<'s, U>> {
        U::is_instance(self.value()).then(|| Local::from_slot(self.slot))
    }

    /// Narrow to `U`
    ///
    /// # Panics
    /// Panics if the value is not a `U`.
    pub fn cast<U: ApiType>(self) -> Local<'s, U> {
        match self.try_cast() {
            Some(local) => local,
            None => panic!("Local::cast: {:?} is not a {}", self.value(), U::NAME),
        }
    }

    /// Whether both locals currently hold the same word
    #[inline]
    pub fn same_value<U>(&self, other: &Local<'_, U>) -> bool {
        self.value() == other.value()
    }
}

/// Scope owning every handle created through it
pub struct HandleScope<'c> {
    context: &'c Context,
    prev_next: usize,
    level: usize,
}

impl<'c> HandleScope<'c> {
    pub fn new(context: &'c Context) -> Self {
        let mut area = context.handles().borrow_mut();
        area.level += 1;
        HandleScope {
            context,
            prev_next: area.next,
            level: area.level,
        }
    }

    #[inline]
    pub fn context(&self) -> &'c Context {
        self.context
    }

    /// Root `value` in this scope
    ///
    /// # Panics
    /// Panics if an inner scope is open, since the handle would land in it.
    pub(crate) fn local<T>(&self, value: Value) -> Local<'_, T> {
        let mut area = self.context.handles().borrow_mut();
        assert_eq!(
            area.level, self.level,
            "handles must be created in the innermost open HandleScope"
        );
        let slot = area.create(value);
        // The slot lives in a block that outlives this scope
        Local::from_slot(unsafe { slot.as_ref() })
    }

    /// Re-root the value another local refers to
    pub fn handle<T>(&self, other: Local<'_, T>) -> Local<'_, T> {
        self.local(other.value())
    }

    #[inline]
    pub fn undefined(&self) -> Local<'_, Any> {
        self.local(Value::undefined())
    }

    #[inline]
    pub fn null(&self) -> Local<'_, Any> {
        self.local(Value::null())
    }

    #[inline]
    pub fn boolean(&self, value: bool) -> Local<'_, Boolean> {
        self.local(Value::bool(value))
    }

    /// A small integer
    ///
    /// # Panics
    /// Panics outside the 31-bit range; use [`HandleScope::new_number`] there.
    #[inline]
    pub fn integer(&self, value: i32) -> Local<'_, Integer> {
        self.local(Value::int(value))
    }

    /// A number, boxed on the heap unless it is a small integer
    pub fn new_number(&self, value: f64) -> ApiResult<Local<'_, Number>> {
        let number = runtime::new_number(self.context, value)?;
        Ok(self.local(number))
    }

    /// A plain object with `internal_fields` fields, all undefined
    pub fn new_object(&self, internal_fields: usize) -> ApiResult<Local<'_, Object>> {
        let object = runtime::allocate_object(self.context, ClassId::Object, internal_fields)?;
        Ok(self.local(object.value()))
    }

    pub fn new_string(&self, value: &str) -> ApiResult<Local<'_, Name>> {
        let string = runtime::allocate_string(self.context, value)?;
        Ok(self.local(string.value()))
    }

    /// An array holding `elements`
    pub fn new_array<T>(&self, elements: &[Local<'_, T>]) -> ApiResult<Local<'_, Array>> {
        let length = u32::try_from(elements.len()).unwrap_or(u32::MAX);
        let array = runtime::allocate_array(self.context, length)?;
        // Elements are read after the allocation, which may have moved them
        for (i, element) in elements.iter().enumerate() {
            array.set_field(i, element.value());
        }
        Ok(self.local(array.value()))
    }

    /// A template whose functions run `callback` with `data`
    pub fn new_function_template(
        &self,
        callback: FunctionCallback,
        data: Option<Local<'_, Any>>,
    ) -> ApiResult<Local<'_, FunctionTemplate>> {
        let template = runtime::allocate_function_template(self.context, callback)?;
        if let Some(data) = data {
            template.set_field(function::TEMPLATE_DATA, data.value());
        }
        Ok(self.local(template.value()))
    }

    /// Instantiate a function from `template`
    pub fn new_function(&self, template: Local<'_, FunctionTemplate>) -> ApiResult<Local<'_, Function>> {
        let instance = runtime::allocate_function(self.context)?;
        instance.set_field(function::FUNCTION_TEMPLATE, template.value());
        Ok(self.local(instance.value()))
    }

    /// Raise `exception` from a native callback
    ///
    /// The frame running the callback reports [`crate::ApiError::Exception`]
    /// once the callback returns.
    pub fn throw_exception<T>(&self, exception: Local<'_, T>) {
        self.context.set_pending_exception(exception.value());
    }

    /// Take the pending exception, if any
    pub fn take_exception(&self) -> Option<Local<'_, Any>> {
        let exception = self.context.take_pending_exception()?;
        Some(self.local(exception))
    }

    /// Make `global` the current realm's global object
    pub fn enter_realm(&self, global: Local<'_, Object>) {
        self.context.set_realm(global.value());
    }

    /// Global object of the current realm
    pub fn realm(&self) -> Option<Local<'_, Object>> {
        let realm = self.context.realm();
        (!realm.is_undefined()).then(|| self.local(realm))
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        let mut area = self.context.handles().borrow_mut();
        assert_eq!(area.level, self.level, "handle scopes must be closed in LIFO order");
        area.release_to(self.prev_next);
        area.level -= 1;
    }
}
