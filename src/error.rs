//! Recoverable errors
//!
//! Contract violations (a wrong callee variant, a non-heap holder, a return
//! slot holding the wrong type, scopes torn down out of order) are not
//! represented here: they are engine or embedder bugs and panic.

use thiserror::Error;

/// Error from an API operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The heap is full even after a collection
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The native frame stack is full even after a collection
    #[error("stack overflow: no room for {words} frame slots")]
    StackOverflow { words: usize },

    /// A native callback threw; the exception is pending on the context
    #[error("native callback threw an exception")]
    Exception,
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
