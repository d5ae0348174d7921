//! Embedder-facing API
//!
//! Static value types, native callback signatures, and the views native
//! callbacks get of the frame they run in.

pub mod callbacks;
pub mod info;
pub mod types;

pub use callbacks::{
    AccessorNameSetterCallback, FunctionCallback, IndexedPropertyDeleterCallback,
    IndexedPropertyEnumeratorCallback, IndexedPropertyGetterCallback, IndexedPropertyQueryCallback,
    IndexedPropertySetterCallback, NamedPropertyDeleterCallback, NamedPropertyEnumeratorCallback,
    NamedPropertyGetterCallback, NamedPropertyQueryCallback, NamedPropertySetterCallback,
};
pub use info::{FunctionCallbackInfo, PropertyCallbackInfo, ReturnValue};
pub use types::{
    Any, ApiType, Array, Boolean, Function, FunctionTemplate, Integer, Name, Number, Object, PropertyAttribute,
    Void, is_api_call_result,
};
