//! Per-dispatch instrumentation events
//!
//! Exactly one event is emitted for every request the dispatcher sees,
//! whatever its outcome.

use {
    crate::error::ErrorKind,
    serde::Serialize,
    serde_json::Value,
    std::{panic::AssertUnwindSafe, sync::Arc, time::Duration},
    tracing::error,
};

/// Observer invoked once per dispatch
pub type InstrumentationHook = Arc<dyn Fn(&InstrumentationEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentationEvent {
    /// Method name, empty when the envelope carried none
    pub method: String,
    /// Tool or prompt name, or resource URI, for capability methods
    pub capability: Option<String>,
    pub request_id: Option<Value>,
    pub session_id: Option<String>,
    pub duration: Duration,
    pub error_kind: Option<ErrorKind>,
}

impl InstrumentationEvent {
    pub fn is_error(&self) -> bool {
        self.error_kind.is_some()
    }

    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

/// Run the hook, containing any panic so dispatch carries on.
pub(crate) fn emit(hook: Option<&InstrumentationHook>, event: &InstrumentationEvent) {
    let Some(hook) = hook else {
        return;
    };
    if std::panic::catch_unwind(AssertUnwindSafe(|| hook(event))).is_err() {
        error!(
            method = %event.method,
            event = "instrumentation_panic",
            "Instrumentation hook panicked"
        );
    }
}
