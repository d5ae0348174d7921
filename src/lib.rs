//! mquickjs-api - callback argument frames for the MQuickJS engine
//!
//! Native code plugs into the engine through callbacks: property
//! interceptors (getters, setters, queries, deleters, enumerators), accessor
//! setters and function bodies. Each call runs inside an argument frame, a
//! fixed block of slots on the native frame stack that the garbage
//! collector scans and relocates. Whatever the callback does, including
//! triggering a compacting collection, the receiver, holder, data and
//! result it works with stay valid.
//!
//! # Features
//! - Word-tagged values with 31-bit small integers
//! - Arena heap with a downward-growing native frame stack
//! - Mark-compact garbage collector with relocatable roots
//! - Handle scopes whose handles follow relocation
//! - Property and function callback frames with a typed return-value protocol
//!
//! # Example
//! ```
//! use mquickjs_api::{Context, HandleScope, PropertyCallbackArguments, ShouldThrow};
//!
//! let ctx = Context::new(64 * 1024);
//! let scope = HandleScope::new(&ctx);
//! let holder = scope.new_object(0).unwrap();
//! let name = scope.new_string("x").unwrap();
//!
//! let args = PropertyCallbackArguments::new(&ctx, scope.undefined(), holder, holder, ShouldThrow::ThrowOnError)
//!     .unwrap();
//! let result = args
//!     .call_named_query(&scope, |_, _, info| info.get_return_value().set_int(7), name)
//!     .unwrap();
//! assert_eq!(result.unwrap().int_value(), 7);
//! ```

// Core modules
pub mod context;
pub mod error;
pub mod value;

// Garbage collector
pub mod gc;

// Handles and handle scopes
pub mod handles;

// Runtime support
pub mod runtime;

// Embedder API and callback frames
pub mod api;
pub mod arguments;

// VM state and API logging
pub mod log;
pub mod vm;

// Re-export main types
pub use api::{ApiType, FunctionCallbackInfo, PropertyAttribute, PropertyCallbackInfo, ReturnValue};
pub use arguments::{
    ArgumentVector, ArgumentsFrame, Callee, FunctionCallbackArguments, FunctionSlot, PropertyCallbackArguments,
    PropertySlot, ShouldThrow,
};
pub use context::{Context, ContextConfig, MemoryStats};
pub use error::{ApiError, ApiResult};
pub use handles::{HandleScope, Local};
pub use log::{ApiLogger, NullLogger, RecordingLogger, TracingLogger};
pub use value::Value;
pub use vm::VmState;
