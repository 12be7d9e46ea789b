//! Opaque per-stream settings blob.
//!
//! The supervisor never interprets settings; they are resolved elsewhere and
//! handed to the worker entry point unchanged.

use std::sync::Arc;

use serde_json::Value;

/// Immutable, cheaply cloneable settings passed to a stream at `add`.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSettings(Arc<Value>);

impl StreamSettings {
    /// Wraps a settings value.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Looks up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl From<Value> for StreamSettings {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
