//! Function callback frames
//!
//! Frame used to run the native body of a function created from a
//! template. The receiver and arguments live in a separate
//! [`ArgumentVector`], which the frame refers to but does not scan.

use std::cell::Cell;

use crate::api::{Any, Function, FunctionCallback, FunctionCallbackInfo, FunctionTemplate, Object};
use crate::context::Context;
use crate::error::ApiResult;
use crate::gc::RootBlock;
use crate::handles::{HandleScope, Local};
use crate::runtime;
use crate::value::Value;

use super::frame::{ArgumentsFrame, FrameLayout};

/// Slot indices of a function frame
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionSlot {
    Holder = 0,
    Context = 1,
    ReturnValueDefault = 2,
    ReturnValue = 3,
    Data = 4,
    Callee = 5,
    ContextSave = 6,
}

impl FunctionSlot {
    pub const COUNT: usize = 7;
}

/// Layout of [`FunctionCallbackArguments`]
pub struct FunctionLayout;

impl FrameLayout for FunctionLayout {
    const NAME: &'static str = "FunctionCallbackArguments";
    const ARGS_LENGTH: usize = FunctionSlot::COUNT;
    const RETURN_VALUE_INDEX: usize = FunctionSlot::ReturnValue as usize;
    const RETURN_VALUE_DEFAULT_INDEX: usize = FunctionSlot::ReturnValueDefault as usize;
    const CONTEXT_INDEX: usize = FunctionSlot::Context as usize;
}

/// What is being called
#[derive(Debug, Clone, Copy)]
pub enum Callee<'a> {
    Function(Local<'a, Function>),
    Template(Local<'a, FunctionTemplate>),
}

impl Callee<'_> {
    #[inline]
    fn value(&self) -> Value {
        match self {
            Callee::Function(function) => function.value(),
            Callee::Template(template) => template.value(),
        }
    }
}

/// Receiver and arguments of a call, rooted for the call's duration
pub struct ArgumentVector<'c> {
    block: RootBlock<'c>,
}

impl<'c> ArgumentVector<'c> {
    pub fn new<T>(context: &'c Context, receiver: Local<'_, T>, args: &[Local<'_, Any>]) -> ApiResult<Self> {
        let block = RootBlock::new(context, args.len() + 1)?;
        block.set(0, receiver.value());
        for (i, arg) in args.iter().enumerate() {
            block.set(i + 1, arg.value());
        }
        Ok(ArgumentVector { block })
    }

    /// Number of arguments, not counting the receiver
    #[inline]
    pub fn argc(&self) -> usize {
        self.block.range().len() - 1
    }

    #[inline]
    pub fn receiver(&self) -> Value {
        self.block.get(0)
    }

    /// Argument `index`
    ///
    /// # Panics
    /// Panics if `index >= argc`.
    #[inline]
    pub fn arg(&self, index: usize) -> Value {
        assert!(index < self.argc(), "argument {index} out of range");
        self.block.get(index + 1)
    }

    /// Receiver followed by the arguments
    #[inline]
    pub fn slots(&self) -> &[Cell<Value>] {
        self.block.slots()
    }
}

/// Frame for one function callback call
pub struct FunctionCallbackArguments<'c, 'a> {
    frame: ArgumentsFrame<'c, FunctionLayout>,
    argv: &'a [Cell<Value>],
    argc: usize,
    is_construct_call: bool,
}

impl<'c, 'a> FunctionCallbackArguments<'c, 'a> {
    pub fn new(
        context: &'c Context,
        data: Local<'_, Any>,
        callee: Callee<'_>,
        holder: Local<'_, Object>,
        argv: &'a ArgumentVector<'c>,
        is_construct_call: bool,
    ) -> ApiResult<Self> {
        let frame = ArgumentsFrame::new(context)?;
        frame.set(FunctionSlot::Data as usize, data.value());
        frame.set(FunctionSlot::Callee as usize, callee.value());
        frame.set(FunctionSlot::Holder as usize, holder.value());

        let callee = frame.get(FunctionSlot::Callee as usize);
        assert!(
            runtime::is_function(callee) || runtime::is_function_template(callee),
            "callee {callee:?} is neither a function nor a function template"
        );
        assert!(
            frame.get(FunctionSlot::Holder as usize).is_ptr(),
            "function callback holder must be a heap object"
        );
        assert!(frame.get(FunctionSlot::Context as usize).is_int());

        Ok(FunctionCallbackArguments {
            frame,
            argv: argv.slots(),
            argc: argv.argc(),
            is_construct_call,
        })
    }

    #[inline]
    pub fn frame(&self) -> &ArgumentsFrame<'c, FunctionLayout> {
        &self.frame
    }

    #[inline]
    pub fn slot(&self, slot: FunctionSlot) -> Value {
        self.frame.get(slot as usize)
    }

    #[inline]
    pub fn argc(&self) -> usize {
        self.argc
    }

    #[inline]
    pub fn is_construct_call(&self) -> bool {
        self.is_construct_call
    }

    /// Run `f`; None means it set no result
    pub fn call<'t>(&self, scope: &'t HandleScope<'_>, f: FunctionCallback) -> ApiResult<Option<Local<'t, Any>>> {
        let call = self.frame.enter_external(f as usize);
        let context = self.frame.context();
        let holder = self.slot(FunctionSlot::Holder);
        context.with_logger(|logger| {
            if logger.is_logging() {
                logger.api_object_access("call", holder);
            }
        });
        {
            let info = FunctionCallbackInfo::new(self.frame.slots(), self.argv, context, self.is_construct_call);
            f(scope, &info);
        }
        self.frame.complete(call, scope)
    }

    /// Run `f`, reading a missing result as undefined
    pub fn call_or_undefined<'t>(&self, scope: &'t HandleScope<'_>, f: FunctionCallback) -> ApiResult<Local<'t, Any>> {
        Ok(match self.call(scope, f)? {
            Some(result) => result,
            None => scope.undefined(),
        })
    }

    /// Remember the current realm for the duration of the call
    pub fn save_context(&self) {
        let realm = self.frame.context().realm();
        self.frame.set(FunctionSlot::ContextSave as usize, realm);
    }

    /// The realm stored by [`save_context`](Self::save_context)
    pub fn saved_context(&self) -> Option<Local<'_, Any>> {
        let slot = &self.frame.slots()[FunctionSlot::ContextSave as usize];
        (!slot.get().is_hole()).then(|| Local::from_slot(slot))
    }
}

impl Local<'_, Function> {
    /// Call this function with `receiver` as this and holder
    pub fn call<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        receiver: Local<'_, Object>,
        args: &[Local<'_, Any>],
    ) -> ApiResult<Local<'t, Any>> {
        let context = scope.context();
        let template = self.template(scope);
        let callback = template.callback(scope);
        let data = template.data(scope);

        let argv = ArgumentVector::new(context, receiver, args)?;
        let frame = FunctionCallbackArguments::new(context, data, Callee::Function(*self), receiver, &argv, false)?;
        frame.call_or_undefined(scope, callback)
    }
}
