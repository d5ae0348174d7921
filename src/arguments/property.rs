//! Property callback frames
//!
//! Frame used to run named and indexed interceptors and accessor setters.

use crate::api::{
    AccessorNameSetterCallback, Any, ApiType, Array, Boolean, IndexedPropertyDeleterCallback,
    IndexedPropertyEnumeratorCallback, IndexedPropertyGetterCallback, IndexedPropertyQueryCallback,
    IndexedPropertySetterCallback, Integer, Name, NamedPropertyDeleterCallback, NamedPropertyEnumeratorCallback,
    NamedPropertyGetterCallback, NamedPropertyQueryCallback, NamedPropertySetterCallback, Object,
    PropertyCallbackInfo,
};
use crate::context::Context;
use crate::error::ApiResult;
use crate::handles::{HandleScope, Local};
use crate::value::Value;

use super::frame::{ArgumentsFrame, ExternalCall, FrameLayout};

/// Slot indices of a property frame
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySlot {
    ShouldThrow = 0,
    Holder = 1,
    Context = 2,
    ReturnValueDefault = 3,
    ReturnValue = 4,
    Data = 5,
    This = 6,
}

impl PropertySlot {
    pub const COUNT: usize = 7;
}

/// Layout of [`PropertyCallbackArguments`]
pub struct PropertyLayout;

impl FrameLayout for PropertyLayout {
    const NAME: &'static str = "PropertyCallbackArguments";
    const ARGS_LENGTH: usize = PropertySlot::COUNT;
    const RETURN_VALUE_INDEX: usize = PropertySlot::ReturnValue as usize;
    const RETURN_VALUE_DEFAULT_INDEX: usize = PropertySlot::ReturnValueDefault as usize;
    const CONTEXT_INDEX: usize = PropertySlot::Context as usize;
}

/// Whether a failed property write throws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShouldThrow {
    DontThrow = 0,
    ThrowOnError = 1,
}

/// Key an interceptor is called for, as logged
#[derive(Clone, Copy)]
enum PropertyKey<'a> {
    Named(Local<'a, Name>),
    Indexed(u32),
}

/// Frame for one property interceptor call
pub struct PropertyCallbackArguments<'c> {
    frame: ArgumentsFrame<'c, PropertyLayout>,
}

impl<'c> PropertyCallbackArguments<'c> {
    pub fn new<T>(
        context: &'c Context,
        data: Local<'_, Any>,
        this: Local<'_, T>,
        holder: Local<'_, Object>,
        should_throw: ShouldThrow,
    ) -> ApiResult<Self> {
        let frame = ArgumentsFrame::new(context)?;
        // Read the handles only now: pushing the frame may have collected
        frame.set(PropertySlot::This as usize, this.value());
        frame.set(PropertySlot::Holder as usize, holder.value());
        frame.set(PropertySlot::Data as usize, data.value());
        frame.set(PropertySlot::ShouldThrow as usize, Value::int(should_throw as i32));

        assert!(
            frame.get(PropertySlot::Holder as usize).is_ptr(),
            "property callback holder must be a heap object"
        );
        assert!(frame.get(PropertySlot::Context as usize).is_int());

        Ok(PropertyCallbackArguments { frame })
    }

    #[inline]
    pub fn frame(&self) -> &ArgumentsFrame<'c, PropertyLayout> {
        &self.frame
    }

    #[inline]
    pub fn slot(&self, slot: PropertySlot) -> Value {
        self.frame.get(slot as usize)
    }

    #[inline]
    fn info<T>(&self) -> PropertyCallbackInfo<'_, T> {
        PropertyCallbackInfo::new(self.frame.slots(), self.frame.context())
    }

    /// Enter external code and log the access
    fn enter(&self, callback: usize, kind: &str, key: PropertyKey<'_>) -> ExternalCall<'c> {
        let call = self.frame.enter_external(callback);
        let context = self.frame.context();
        let holder = self.slot(PropertySlot::Holder);
        context.with_logger(|logger| {
            if !logger.is_logging() {
                return;
            }
            match key {
                PropertyKey::Named(name) => {
                    let tag = format!("interceptor-named-{kind}");
                    logger.api_named_property_access(&tag, holder, &name.to_rust_string());
                }
                PropertyKey::Indexed(index) => {
                    let tag = format!("interceptor-indexed-{kind}");
                    logger.api_indexed_property_access(&tag, holder, index);
                }
            }
        });
        call
    }

    /// Enter external code and log an enumeration
    fn enter_enumerator(&self, callback: usize, tag: &str) -> ExternalCall<'c> {
        let call = self.frame.enter_external(callback);
        let holder = self.slot(PropertySlot::Holder);
        self.frame.context().with_logger(|logger| {
            if logger.is_logging() {
                logger.api_object_access(tag, holder);
            }
        });
        call
    }

    #[inline]
    fn complete<'t, V: ApiType>(
        &self,
        call: ExternalCall<'c>,
        scope: &'t HandleScope<'_>,
    ) -> ApiResult<Option<Local<'t, V>>> {
        self.frame.complete(call, scope)
    }

    pub fn call_named_getter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertyGetterCallback,
        name: Local<'_, Name>,
    ) -> ApiResult<Option<Local<'t, Any>>> {
        let call = self.enter(f as usize, "get", PropertyKey::Named(name));
        f(scope, name, &self.info());
        self.complete(call, scope)
    }

    /// None means the setter did not intercept the write
    pub fn call_named_setter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertySetterCallback,
        name: Local<'_, Name>,
        value: Local<'_, Any>,
    ) -> ApiResult<Option<Local<'t, Any>>> {
        let call = self.enter(f as usize, "set", PropertyKey::Named(name));
        f(scope, name, value, &self.info());
        self.complete(call, scope)
    }

    /// Attributes of the property, None if the interceptor does not know it
    pub fn call_named_query<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertyQueryCallback,
        name: Local<'_, Name>,
    ) -> ApiResult<Option<Local<'t, Integer>>> {
        let call = self.enter(f as usize, "has", PropertyKey::Named(name));
        f(scope, name, &self.info());
        self.complete(call, scope)
    }

    pub fn call_named_deleter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertyDeleterCallback,
        name: Local<'_, Name>,
    ) -> ApiResult<Option<Local<'t, Boolean>>> {
        let call = self.enter(f as usize, "delete", PropertyKey::Named(name));
        f(scope, name, &self.info());
        self.complete(call, scope)
    }

    /// The enumerator returns its array directly; the return slot is not read
    pub fn call_named_enumerator<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertyEnumeratorCallback,
    ) -> ApiResult<Option<Local<'t, Array>>> {
        self.enumerate(scope, f, "interceptor-named-enum")
    }

    pub fn call_indexed_getter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: IndexedPropertyGetterCallback,
        index: u32,
    ) -> ApiResult<Option<Local<'t, Any>>> {
        let call = self.enter(f as usize, "get", PropertyKey::Indexed(index));
        f(scope, index, &self.info());
        self.complete(call, scope)
    }

    pub fn call_indexed_setter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: IndexedPropertySetterCallback,
        index: u32,
        value: Local<'_, Any>,
    ) -> ApiResult<Option<Local<'t, Any>>> {
        let call = self.enter(f as usize, "set", PropertyKey::Indexed(index));
        f(scope, index, value, &self.info());
        self.complete(call, scope)
    }

    pub fn call_indexed_query<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: IndexedPropertyQueryCallback,
        index: u32,
    ) -> ApiResult<Option<Local<'t, Integer>>> {
        let call = self.enter(f as usize, "has", PropertyKey::Indexed(index));
        f(scope, index, &self.info());
        self.complete(call, scope)
    }

    pub fn call_indexed_deleter<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: IndexedPropertyDeleterCallback,
        index: u32,
    ) -> ApiResult<Option<Local<'t, Boolean>>> {
        let call = self.enter(f as usize, "delete", PropertyKey::Indexed(index));
        f(scope, index, &self.info());
        self.complete(call, scope)
    }

    pub fn call_indexed_enumerator<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: IndexedPropertyEnumeratorCallback,
    ) -> ApiResult<Option<Local<'t, Array>>> {
        self.enumerate(scope, f, "interceptor-indexed-enum")
    }

    /// Run a legacy setter, which has no result
    pub fn call_accessor_setter(
        &self,
        scope: &HandleScope<'_>,
        f: AccessorNameSetterCallback,
        name: Local<'_, Name>,
        value: Local<'_, Any>,
    ) -> ApiResult<()> {
        let call = self.enter(f as usize, "set", PropertyKey::Named(name));
        f(scope, name, value, &self.info());
        call.finish()
    }

    fn enumerate<'t>(
        &self,
        scope: &'t HandleScope<'_>,
        f: NamedPropertyEnumeratorCallback,
        tag: &str,
    ) -> ApiResult<Option<Local<'t, Array>>> {
        let call = self.enter_enumerator(f as usize, tag);
        let result = f(scope, &self.info()).map(|array| array.value());
        call.finish()?;
        Ok(result.map(|array| scope.local(array)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PropertyAttribute;
    use crate::error::ApiError;
    use crate::log::{LogEvent, RecordingLogger};
    use crate::vm::VmState;

    fn setup(ctx: &Context) -> HandleScope<'_> {
        HandleScope::new(ctx)
    }

    #[test]
    fn test_new_initializes_slots() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let data = scope.integer(5).as_any();
        let args = PropertyCallbackArguments::new(&ctx, data, holder, holder, ShouldThrow::ThrowOnError).unwrap();

        assert_eq!(args.slot(PropertySlot::ShouldThrow), Value::int(1));
        assert_eq!(args.slot(PropertySlot::Holder), holder.value());
        assert_eq!(args.slot(PropertySlot::This), holder.value());
        assert_eq!(args.slot(PropertySlot::Data), Value::int(5));
        assert!(args.slot(PropertySlot::Context).is_int());
        assert!(args.slot(PropertySlot::ReturnValue).is_hole());
        assert!(args.slot(PropertySlot::ReturnValueDefault).is_hole());
        assert!(std::ptr::eq(args.frame().context(), &ctx));
    }

    #[test]
    #[should_panic(expected = "must be a heap object")]
    fn test_non_heap_holder_panics() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        // Bypass the static type to hand in a small integer
        let holder: Local<'_, Object> = scope.local(Value::int(1));
        let _ = PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow);
    }

    #[test]
    fn test_query_returns_attributes() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("x").unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::ThrowOnError)
                .unwrap();

        let result = args
            .call_named_query(
                &scope,
                |_, name, info| {
                    assert_eq!(name.to_rust_string(), "x");
                    assert!(info.should_throw_on_error());
                    info.get_return_value().set_int(7);
                },
                name,
            )
            .unwrap();
        assert_eq!(result.unwrap().int_value(), 7);
    }

    #[test]
    fn test_query_attributes_from_indexed_interceptor() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let result = args
            .call_indexed_query(
                &scope,
                |_, index, info| {
                    if index == 2 {
                        info.get_return_value().set_attributes(PropertyAttribute::READ_ONLY);
                    }
                },
                2,
            )
            .unwrap();
        assert_eq!(result.unwrap().attributes(), PropertyAttribute::READ_ONLY);
    }

    #[test]
    fn test_setter_that_does_not_intercept() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("y").unwrap();
        let value = scope.integer(3).as_any();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let result = args.call_named_setter(&scope, |_, _, _, _| {}, name, value).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_getter_reads_this_holder_and_data() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(1).unwrap();
        holder.set_internal_field(0, scope.integer(40));
        let this = scope.new_object(0).unwrap();
        let data = scope.integer(2).as_any();
        let name = scope.new_string("answer").unwrap();
        let args = PropertyCallbackArguments::new(&ctx, data, this, holder, ShouldThrow::DontThrow).unwrap();

        let result = args
            .call_named_getter(
                &scope,
                |scope, _, info| {
                    assert!(!info.this().same_value(&info.holder()));
                    let base = info.holder().internal_field(scope, 0).cast::<Integer>().int_value();
                    let step = info.data().cast::<Integer>().int_value();
                    info.get_return_value().set_int(base + step).unwrap();
                },
                name,
            )
            .unwrap();
        assert_eq!(result.unwrap().value(), Value::int(42));
    }

    #[test]
    fn test_deleter_and_indexed_getter() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("gone").unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let deleted = args
            .call_named_deleter(&scope, |_, _, info| info.get_return_value().set_bool(true), name)
            .unwrap();
        assert!(deleted.unwrap().is_true());

        let element = args
            .call_indexed_getter(&scope, |_, index, info| info.get_return_value().set_uint(index).unwrap(), 9)
            .unwrap();
        assert_eq!(element.unwrap().value(), Value::int(9));
    }

    #[test]
    fn test_frame_reuse_starts_without_a_result() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("p").unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let first = args
            .call_named_getter(&scope, |_, _, info| info.get_return_value().set_int(5).unwrap(), name)
            .unwrap();
        assert_eq!(first.unwrap().value(), Value::int(5));
        let second = args.call_named_getter(&scope, |_, _, _| {}, name).unwrap();
        assert!(second.is_none());

        // A boolean left by a deleter must not reach the query's Integer check
        args.call_named_deleter(&scope, |_, _, info| info.get_return_value().set_bool(true), name)
            .unwrap();
        let attributes = args.call_named_query(&scope, |_, _, _| {}, name).unwrap();
        assert!(attributes.is_none());
        assert!(args.slot(PropertySlot::ReturnValueDefault).is_hole());
    }

    #[test]
    fn test_exception_pending_before_the_call_is_not_the_callbacks() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("q").unwrap();
        let value = scope.integer(1).as_any();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();
        scope.throw_exception(scope.integer(-1));

        let deleted = args
            .call_named_deleter(&scope, |_, _, info| info.get_return_value().set_bool(true), name)
            .unwrap();
        assert!(deleted.unwrap().is_true());
        args.call_accessor_setter(&scope, |_, _, _, _| {}, name, value).unwrap();
        assert!(args.call_indexed_enumerator(&scope, |_, _| None).unwrap().is_none());
        assert_eq!(scope.take_exception().unwrap().value(), Value::int(-1));
    }

    #[test]
    fn test_enumerator_returns_array_directly() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let names = args
            .call_named_enumerator(&scope, |scope, _| {
                let a = scope.new_string("a").ok()?;
                let b = scope.new_string("b").ok()?;
                scope.new_array(&[a, b]).ok()
            })
            .unwrap()
            .unwrap();
        assert_eq!(names.length(), 2);
        assert_eq!(names.get(&scope, 1).unwrap().cast::<Name>().to_rust_string(), "b");
        assert!(args.slot(PropertySlot::ReturnValue).is_hole());

        let none = args.call_indexed_enumerator(&scope, |_, _| None).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_accessor_setter_has_no_result() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(1).unwrap();
        let name = scope.new_string("v").unwrap();
        let value = scope.integer(11).as_any();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        args.call_accessor_setter(
            &scope,
            |_, _, value, info| info.holder().set_internal_field(0, value),
            name,
            value,
        )
        .unwrap();
        assert_eq!(holder.internal_field(&scope, 0).value(), Value::int(11));
    }

    #[test]
    fn test_callback_runs_as_external_code() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let getter: IndexedPropertyGetterCallback = |_, _, info| {
            let ctx = info.get_context();
            assert_eq!(ctx.vm_state(), VmState::External);
            assert!(ctx.external_callback().is_some());
        };
        args.call_indexed_getter(&scope, getter, 0).unwrap();
        assert_eq!(ctx.vm_state(), VmState::Other);
        assert_eq!(ctx.external_callback(), None);
    }

    #[test]
    fn test_exception_skips_extraction() {
        let ctx = Context::new(16 * 1024);
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("boom").unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        let err = args
            .call_named_getter(
                &scope,
                |scope, name, info| {
                    info.get_return_value().set_bool(true);
                    scope.throw_exception(name);
                },
                name,
            )
            .unwrap_err();
        assert_eq!(err, ApiError::Exception);
        let thrown = scope.take_exception().unwrap();
        assert_eq!(thrown.cast::<Name>().to_rust_string(), "boom");
    }

    #[test]
    fn test_accesses_are_logged() {
        let ctx = Context::new(16 * 1024);
        let logger = RecordingLogger::new();
        ctx.set_logger(logger.clone());
        let scope = setup(&ctx);
        let holder = scope.new_object(0).unwrap();
        let name = scope.new_string("k").unwrap();
        let args =
            PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::DontThrow).unwrap();

        args.call_named_query(&scope, |_, _, _| {}, name).unwrap();
        args.call_indexed_deleter(&scope, |_, _, _| {}, 4).unwrap();
        args.call_named_enumerator(&scope, |_, _| None).unwrap();

        let events = logger.take();
        assert_eq!(
            events[0],
            LogEvent::Named {
                tag: "interceptor-named-has".to_string(),
                holder: holder.value(),
                name: "k".to_string()
            }
        );
        assert_eq!(
            events[1],
            LogEvent::Indexed {
                tag: "interceptor-indexed-delete".to_string(),
                holder: holder.value(),
                index: 4
            }
        );
        assert_eq!(events[2].tag(), "interceptor-named-enum");
        assert_eq!(events.len(), 3);
    }
}
