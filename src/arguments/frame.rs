//! Typed argument frames
//!
//! An [`ArgumentsFrame`] is a [`RootBlock`] with a fixed slot layout. Frame
//! kinds describe their layout with a [`FrameLayout`]; the frame itself
//! implements what every kind shares: binding to a context, the
//! return-value protocol, and zapping the return slot on teardown.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::api::{ApiType, is_api_call_result};
use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::gc::{RootBlock, RootRange};
use crate::handles::{HandleScope, Local};
use crate::value::{RawValue, Value};
use crate::vm::{ExternalCallbackScope, VmState, VmStateScope};

/// Slot layout of one frame kind
pub trait FrameLayout {
    /// Name used in diagnostics
    const NAME: &'static str;
    /// Total number of slots
    const ARGS_LENGTH: usize;
    const RETURN_VALUE_INDEX: usize;
    const RETURN_VALUE_DEFAULT_INDEX: usize;
    const CONTEXT_INDEX: usize;
}

/// A block of root slots laid out as `L`
pub struct ArgumentsFrame<'c, L: FrameLayout> {
    block: RootBlock<'c>,
    _layout: PhantomData<L>,
}

impl<'c, L: FrameLayout> ArgumentsFrame<'c, L> {
    /// Push a frame bound to `context`
    ///
    /// Every slot starts as the hole except the context slot.
    pub fn new(context: &'c Context) -> ApiResult<Self> {
        let block = RootBlock::new(context, L::ARGS_LENGTH)?;
        // The address is word aligned, so the collector reads it as a small integer
        let address = Value(RawValue(context as *const Context as usize));
        assert!(address.is_int(), "context address must look like a small integer");
        block.set(L::CONTEXT_INDEX, address);

        Ok(ArgumentsFrame {
            block,
            _layout: PhantomData,
        })
    }

    #[inline]
    pub fn get(&self, index: usize) -> Value {
        self.block.get(index)
    }

    #[inline]
    pub fn set(&self, index: usize, value: Value) {
        self.block.set(index, value);
    }

    #[inline]
    pub fn slots(&self) -> &[Cell<Value>] {
        self.block.slots()
    }

    #[inline]
    pub fn slot_range(&self) -> RootRange {
        self.block.range()
    }

    /// Heap offset of the return-value slot
    ///
    /// The word stays readable after the frame is gone, holding
    /// [`Value::zapped`].
    #[inline]
    pub fn return_value_offset(&self) -> usize {
        self.block.range().word_offset(L::RETURN_VALUE_INDEX)
    }

    /// The context this frame is bound to, read back from its slot
    pub fn context(&self) -> &'c Context {
        let raw = self.get(L::CONTEXT_INDEX).raw().0;
        debug_assert_eq!(raw, self.block.context() as *const Context as usize);
        // The slot holds the address of the context the block borrows for 'c
        unsafe { &*(raw as *const Context) }
    }

    /// Extract the callback's result into `scope`
    ///
    /// An untouched slot yields None.
    ///
    /// # Panics
    /// Panics if the slot holds something that is not a `V`, or a value a
    /// callback may not return.
    pub fn get_return_value<'t, V: ApiType>(&self, scope: &'t HandleScope<'_>) -> Option<Local<'t, V>> {
        let value = self.get(L::RETURN_VALUE_INDEX);
        if value.is_hole() {
            return None;
        }
        assert!(
            V::is_instance(value),
            "{} return value {value:?} is not a {}",
            L::NAME,
            V::NAME
        );
        assert!(is_api_call_result(value), "{} return value {value:?} is not a legal API result", L::NAME);
        Some(scope.local(value))
    }

    /// Run the rest of a native call as external code
    ///
    /// Each call starts with both return slots holding the hole, so a result
    /// left by an earlier call on the same frame is never read back. Both
    /// markers come back off when the guard drops, on every exit path.
    pub(crate) fn enter_external(&self, callback: usize) -> ExternalCall<'c> {
        self.set(L::RETURN_VALUE_INDEX, Value::hole());
        self.set(L::RETURN_VALUE_DEFAULT_INDEX, Value::hole());
        let context = self.context();
        ExternalCall {
            context,
            throws_on_entry: context.throw_count(),
            _state: VmStateScope::new(context, VmState::External),
            _callback: ExternalCallbackScope::new(context, callback),
        }
    }

    /// Finish a native call: report an exception it threw or extract the result
    pub(crate) fn complete<'t, V: ApiType>(
        &self,
        call: ExternalCall<'c>,
        scope: &'t HandleScope<'_>,
    ) -> ApiResult<Option<Local<'t, V>>> {
        call.finish()?;
        Ok(self.get_return_value(scope))
    }
}

impl<L: FrameLayout> Drop for ArgumentsFrame<'_, L> {
    fn drop(&mut self) {
        self.block.set(L::RETURN_VALUE_INDEX, Value::zapped());
    }
}

/// Markers held for the duration of a native call
pub(crate) struct ExternalCall<'c> {
    context: &'c Context,
    throws_on_entry: u64,
    _state: VmStateScope<'c>,
    _callback: ExternalCallbackScope<'c>,
}

impl ExternalCall<'_> {
    /// Leave external code
    ///
    /// Fails only if the callback threw and left its exception pending. An
    /// exception that was already pending on entry is not the callback's.
    pub(crate) fn finish(self) -> ApiResult<()> {
        let context = self.context;
        let threw = context.throw_count() != self.throws_on_entry;
        drop(self);
        match threw && context.has_pending_exception() {
            true => Err(ApiError::Exception),
            false => Ok(()),
        }
    }
}
