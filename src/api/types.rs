//! Static types of API values
//!
//! Each marker type names a set of runtime values. A [`Local`] carries one
//! as its type parameter; [`Local::cast`] checks membership at runtime.

use std::ops::BitOr;

use crate::handles::{HandleScope, Local};
use crate::runtime::{self, ClassId, HeapObject, function};
use crate::value::Value;

use super::callbacks::FunctionCallback;

/// A marker type describing a set of values
pub trait ApiType {
    /// Name used in diagnostics
    const NAME: &'static str;

    /// Whether `value` belongs to the set
    fn is_instance(value: Value) -> bool;
}

macro_rules! api_type {
    ($(#[$doc:meta])* $name:ident, |$v:ident| $check:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub enum $name {}

        impl ApiType for $name {
            const NAME: &'static str = stringify!($name);

            #[inline]
            fn is_instance($v: Value) -> bool {
                $check
            }
        }
    };
}

api_type!(
    /// Any value
    Any, |_v| true
);
api_type!(
    /// A JS receiver: plain object, array or function
    Object, |v| runtime::is_receiver(v)
);
api_type!(Array, |v| runtime::is_array(v));
api_type!(Function, |v| runtime::is_function(v));
api_type!(
    /// A native callback plus data, instantiated into functions
    FunctionTemplate, |v| runtime::is_function_template(v)
);
api_type!(
    /// A property name
    Name, |v| runtime::is_string(v)
);
api_type!(Number, |v| runtime::is_number(v));
api_type!(
    /// A small integer
    Integer, |v| v.is_int()
);
api_type!(Boolean, |v| v.is_bool());
api_type!(
    /// No value; callbacks of this type have no result
    Void, |_v| false
);

/// Whether `value` may be handed back to managed code from a callback
///
/// The hole, the exception marker and internal objects never may.
pub fn is_api_call_result(value: Value) -> bool {
    value.is_int()
        || value.is_bool()
        || value.is_null()
        || value.is_undefined()
        || runtime::is_number(value)
        || runtime::is_string(value)
        || runtime::is_receiver(value)
}

/// Property attributes, as returned by query interceptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyAttribute(u32);

impl PropertyAttribute {
    pub const NONE: PropertyAttribute = PropertyAttribute(0);
    pub const READ_ONLY: PropertyAttribute = PropertyAttribute(1 << 0);
    pub const DONT_ENUM: PropertyAttribute = PropertyAttribute(1 << 1);
    pub const DONT_DELETE: PropertyAttribute = PropertyAttribute(1 << 2);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Attributes from raw bits, ignoring unknown ones
    #[inline]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        PropertyAttribute(bits & 0b111)
    }

    #[inline]
    pub const fn contains(self, other: PropertyAttribute) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PropertyAttribute {
    type Output = PropertyAttribute;

    fn bitor(self, rhs: Self) -> Self {
        PropertyAttribute(self.0 | rhs.0)
    }
}

impl<'s> Local<'s, Object> {
    /// View of the object's current block
    #[inline]
    fn object(&self) -> HeapObject {
        match HeapObject::from_value(self.value()) {
            Some(object) => object,
            None => unreachable!("Local<Object> holds a non-object"),
        }
    }

    pub fn internal_field_count(&self) -> usize {
        self.object().field_count()
    }

    /// Read internal field `index` into a new handle
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn internal_field<'t>(&self, scope: &'t HandleScope<'_>, index: usize) -> Local<'t, Any> {
        let value = self.object().field(index);
        scope.local(value)
    }

    /// # Panics
    /// Panics if `index` is out of range.
    pub fn set_internal_field<T>(&self, index: usize, value: Local<'_, T>) {
        self.object().set_field(index, value.value());
    }
}

impl<'s> Local<'s, Array> {
    #[inline]
    fn array(&self) -> HeapObject {
        match HeapObject::from_value(self.value()) {
            Some(array) => array,
            None => unreachable!("Local<Array> holds a non-object"),
        }
    }

    pub fn length(&self) -> u32 {
        runtime::array_length(self.array())
    }

    /// Element `index`, None past the end
    pub fn get<'t>(&self, scope: &'t HandleScope<'_>, index: u32) -> Option<Local<'t, Any>> {
        let value = runtime::array_get(self.array(), index)?;
        Some(scope.local(value))
    }

    /// View as a plain object
    #[inline]
    pub fn as_object(self) -> Local<'s, Object> {
        self.cast()
    }
}

impl Local<'_, Name> {
    pub fn to_rust_string(&self) -> String {
        match runtime::to_rust_string(self.value()) {
            Some(s) => s,
            None => unreachable!("Local<Name> holds a non-string"),
        }
    }
}

impl Local<'_, Number> {
    pub fn number_value(&self) -> f64 {
        match runtime::number_value(self.value()) {
            Some(n) => n,
            None => unreachable!("Local<Number> holds a non-number"),
        }
    }
}

impl<'s> Local<'s, Integer> {
    pub fn int_value(&self) -> i32 {
        match self.value().to_i32() {
            Some(i) => i,
            None => unreachable!("Local<Integer> holds a non-integer"),
        }
    }

    /// Interpret as query-interceptor attributes
    pub fn attributes(&self) -> PropertyAttribute {
        PropertyAttribute::from_bits_truncate(self.int_value() as u32)
    }

    #[inline]
    pub fn as_number(self) -> Local<'s, Number> {
        self.cast()
    }
}

impl Local<'_, Boolean> {
    pub fn is_true(&self) -> bool {
        self.value() == Value::bool(true)
    }
}

impl Local<'_, FunctionTemplate> {
    #[inline]
    fn template(&self) -> HeapObject {
        match HeapObject::from_value(self.value()) {
            Some(template) => template,
            None => unreachable!("Local<FunctionTemplate> holds a non-object"),
        }
    }

    /// The native callback functions from this template run
    pub fn callback(&self, scope: &HandleScope<'_>) -> FunctionCallback {
        scope.context().callback(function::template_callback_index(self.template()))
    }

    pub fn data<'t>(&self, scope: &'t HandleScope<'_>) -> Local<'t, Any> {
        scope.local(self.template().field(function::TEMPLATE_DATA))
    }
}

impl Local<'_, Function> {
    /// The template this function was instantiated from
    pub fn template<'t>(&self, scope: &'t HandleScope<'_>) -> Local<'t, FunctionTemplate> {
        let object = match HeapObject::from_value(self.value()) {
            Some(object) => object,
            None => unreachable!("Local<Function> holds a non-object"),
        };
        debug_assert_eq!(object.class_id(), Some(ClassId::Function));
        scope.local(object.field(function::FUNCTION_TEMPLATE))
    }
}
