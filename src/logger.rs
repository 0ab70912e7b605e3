//! Leveled logger sink injected into API clients.

use serde_json::Value;

/// Receives the client's error and warning records together with a
/// free-form context mapping.
#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    fn error(&self, message: &str, extra: &Value);
    fn warning(&self, message: &str, extra: &Value);
}

/// Forwards records to `tracing`, with the context as a structured field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str, extra: &Value) {
        tracing::error!(extra = %extra, "{}", message);
    }

    fn warning(&self, message: &str, extra: &Value) {
        tracing::warn!(extra = %extra, "{}", message);
    }
}
