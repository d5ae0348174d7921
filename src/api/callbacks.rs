//! Native callback signatures
//!
//! Every callback receives the caller's handle scope and an info view of
//! the frame it runs in. Results go through the info's
//! [`ReturnValue`](super::ReturnValue), except for enumerators, which return
//! their array directly.

use crate::handles::{HandleScope, Local};

use super::info::{FunctionCallbackInfo, PropertyCallbackInfo};
use super::types::{Any, Array, Boolean, Integer, Name, Void};

/// Intercepts a named property read
pub type NamedPropertyGetterCallback =
    for<'s> fn(&'s HandleScope<'s>, Local<'s, Name>, &'s PropertyCallbackInfo<'s, Any>);

/// Intercepts a named property write; leaving the result unset falls through
pub type NamedPropertySetterCallback =
    for<'s> fn(&'s HandleScope<'s>, Local<'s, Name>, Local<'s, Any>, &'s PropertyCallbackInfo<'s, Any>);

/// Reports the attributes of a named property, leaving the result unset if absent
pub type NamedPropertyQueryCallback =
    for<'s> fn(&'s HandleScope<'s>, Local<'s, Name>, &'s PropertyCallbackInfo<'s, Integer>);

/// Intercepts a named property delete
pub type NamedPropertyDeleterCallback =
    for<'s> fn(&'s HandleScope<'s>, Local<'s, Name>, &'s PropertyCallbackInfo<'s, Boolean>);

/// Lists the names of intercepted properties
pub type NamedPropertyEnumeratorCallback =
    for<'s> fn(&'s HandleScope<'s>, &'s PropertyCallbackInfo<'s, Array>) -> Option<Local<'s, Array>>;

pub type IndexedPropertyGetterCallback = for<'s> fn(&'s HandleScope<'s>, u32, &'s PropertyCallbackInfo<'s, Any>);

pub type IndexedPropertySetterCallback =
    for<'s> fn(&'s HandleScope<'s>, u32, Local<'s, Any>, &'s PropertyCallbackInfo<'s, Any>);

pub type IndexedPropertyQueryCallback = for<'s> fn(&'s HandleScope<'s>, u32, &'s PropertyCallbackInfo<'s, Integer>);

pub type IndexedPropertyDeleterCallback =
    for<'s> fn(&'s HandleScope<'s>, u32, &'s PropertyCallbackInfo<'s, Boolean>);

/// Lists the indices of intercepted elements
pub type IndexedPropertyEnumeratorCallback =
    for<'s> fn(&'s HandleScope<'s>, &'s PropertyCallbackInfo<'s, Array>) -> Option<Local<'s, Array>>;

/// Legacy accessor setter with no result
pub type AccessorNameSetterCallback =
    for<'s> fn(&'s HandleScope<'s>, Local<'s, Name>, Local<'s, Any>, &'s PropertyCallbackInfo<'s, Void>);

/// Body of a function created from a template
pub type FunctionCallback = for<'s> fn(&'s HandleScope<'s>, &'s FunctionCallbackInfo<'s, Any>);
