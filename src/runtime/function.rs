//! JavaScript function types
//!
//! A function template pairs a native callback with embedder data. The
//! callback itself lives in the context's callback table; the template holds
//! its index as a small integer, so the collector never sees a code address.
//! A function instantiated from a template just refers back to it.

use crate::api::FunctionCallback;
use crate::context::Context;
use crate::error::ApiResult;
use crate::value::Value;

use super::object::{ClassId, HeapObject, allocate_object, class_of};

/// Template field: callback table index
pub const TEMPLATE_CALLBACK_INDEX: usize = 0;
/// Template field: embedder data
pub const TEMPLATE_DATA: usize = 1;
const TEMPLATE_FIELDS: usize = 2;

/// Function field: the template it was instantiated from
pub const FUNCTION_TEMPLATE: usize = 0;
const FUNCTION_FIELDS: usize = 1;

/// Allocate a template for `callback`, with undefined data
///
/// The callback enters the context's table only once the template exists.
pub fn allocate_function_template(context: &Context, callback: FunctionCallback) -> ApiResult<HeapObject> {
    let template = allocate_object(context, ClassId::FunctionTemplate, TEMPLATE_FIELDS)?;
    let index = context.register_callback(callback);
    template.set_field(TEMPLATE_CALLBACK_INDEX, Value::int(index as i32));
    Ok(template)
}

/// Allocate a function with an undefined template field
pub fn allocate_function(context: &Context) -> ApiResult<HeapObject> {
    allocate_object(context, ClassId::Function, FUNCTION_FIELDS)
}

#[inline]
pub fn is_function(value: Value) -> bool {
    class_of(value) == Some(ClassId::Function)
}

#[inline]
pub fn is_function_template(value: Value) -> bool {
    class_of(value) == Some(ClassId::FunctionTemplate)
}

/// Callback table index stored in a template
pub fn template_callback_index(template: HeapObject) -> u32 {
    debug_assert_eq!(template.class_id(), Some(ClassId::FunctionTemplate));
    match template.field(TEMPLATE_CALLBACK_INDEX).to_i32() {
        Some(index) => index as u32,
        None => panic!("function template without a callback index"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &crate::HandleScope<'_>, _: &crate::FunctionCallbackInfo<'_, crate::api::Any>) {}

    #[test]
    fn test_template_layout() {
        let ctx = Context::new(8 * 1024);
        let template = allocate_function_template(&ctx, noop).unwrap();
        assert!(is_function_template(template.value()));
        assert!(!is_function(template.value()));
        assert_eq!(template_callback_index(template), 0);
        assert!(template.field(TEMPLATE_DATA).is_undefined());
        assert_eq!(ctx.callback_count(), 1);
    }

    #[test]
    fn test_failed_template_leaves_callback_table_alone() {
        let ctx = Context::new(4096);
        let scope = crate::HandleScope::new(&ctx);
        let mut live = Vec::new();
        for fields in [16, 1] {
            while let Ok(object) = scope.new_object(fields) {
                live.push(object);
            }
        }
        assert!(allocate_function_template(&ctx, noop).is_err());
        assert!(scope.new_function_template(noop, None).is_err());
        assert_eq!(ctx.callback_count(), 0);
    }

    #[test]
    fn test_function_refers_to_template() {
        let ctx = Context::new(8 * 1024);
        let scope = crate::HandleScope::new(&ctx);
        let template = scope.local::<crate::api::FunctionTemplate>(allocate_function_template(&ctx, noop).unwrap().value());
        let function = allocate_function(&ctx).unwrap();
        function.set_field(FUNCTION_TEMPLATE, template.value());
        assert!(is_function(function.value()));
        assert_eq!(function.field(FUNCTION_TEMPLATE), template.value());
    }
}
