//! API access logging
//!
//! Frames report every interceptor and function callback they run to an
//! [`ApiLogger`]. Loggers are a side channel: their methods cannot fail and
//! nothing they do affects the call.

use crate::value::Value;

/// Receiver of API access events
pub trait ApiLogger {
    /// Whether events should be produced at all
    ///
    /// Frames skip building event arguments (such as the property name
    /// as a Rust string) when this returns false.
    fn is_logging(&self) -> bool {
        true
    }

    /// A named interceptor ran, e.g. `interceptor-named-get`
    fn api_named_property_access(&self, tag: &str, holder: Value, name: &str);

    /// An indexed interceptor ran, e.g. `interceptor-indexed-set`
    fn api_indexed_property_access(&self, tag: &str, holder: Value, index: u32);

    /// Some other API callback ran, e.g. `call` or an enumerator
    fn api_object_access(&self, tag: &str, object: Value);
}

/// Forwards events to `tracing` at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ApiLogger for TracingLogger {
    fn is_logging(&self) -> bool {
        tracing::enabled!(tracing::Level::TRACE)
    }

    fn api_named_property_access(&self, tag: &str, holder: Value, name: &str) {
        tracing::trace!(target: "mquickjs_api::api", tag, holder = ?holder, name, "api named property access");
    }

    fn api_indexed_property_access(&self, tag: &str, holder: Value, index: u32) {
        tracing::trace!(target: "mquickjs_api::api", tag, holder = ?holder, index, "api indexed property access");
    }

    fn api_object_access(&self, tag: &str, object: Value) {
        tracing::trace!(target: "mquickjs_api::api", tag, object = ?object, "api object access");
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl ApiLogger for NullLogger {
    fn is_logging(&self) -> bool {
        false
    }

    fn api_named_property_access(&self, _tag: &str, _holder: Value, _name: &str) {}

    fn api_indexed_property_access(&self, _tag: &str, _holder: Value, _index: u32) {}

    fn api_object_access(&self, _tag: &str, _object: Value) {}
}

/// One recorded API access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Named { tag: String, holder: Value, name: String },
    Indexed { tag: String, holder: Value, index: u32 },
    Object { tag: String, object: Value },
}

impl LogEvent {
    pub fn tag(&self) -> &str {
        match self {
            LogEvent::Named { tag, .. } | LogEvent::Indexed { tag, .. } | LogEvent::Object { tag, .. } => tag,
        }
    }
}

/// Keeps every event in memory; clones share the same event list
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    events: std::rc::Rc<std::cell::RefCell<Vec<LogEvent>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all events recorded so far
    pub fn take(&self) -> Vec<LogEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl ApiLogger for RecordingLogger {
    fn api_named_property_access(&self, tag: &str, holder: Value, name: &str) {
        self.events.borrow_mut().push(LogEvent::Named {
            tag: tag.to_string(),
            holder,
            name: name.to_string(),
        });
    }

    fn api_indexed_property_access(&self, tag: &str, holder: Value, index: u32) {
        self.events.borrow_mut().push(LogEvent::Indexed {
            tag: tag.to_string(),
            holder,
            index,
        });
    }

    fn api_object_access(&self, tag: &str, object: Value) {
        self.events.borrow_mut().push(LogEvent::Object {
            tag: tag.to_string(),
            object,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_shares_events_between_clones() {
        let logger = RecordingLogger::new();
        let installed = logger.clone();

        installed.api_indexed_property_access("interceptor-indexed-get", Value::null(), 3);
        installed.api_object_access("call", Value::undefined());

        let events = logger.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tag(), "interceptor-indexed-get");
        assert_eq!(
            events[1],
            LogEvent::Object {
                tag: "call".to_string(),
                object: Value::undefined()
            }
        );
        assert!(logger.take().is_empty());
    }

    #[test]
    fn test_null_logger_is_disabled() {
        assert!(!NullLogger.is_logging());
        NullLogger.api_named_property_access("interceptor-named-get", Value::null(), "x");
    }
}
