use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::error;

/// Errors raised by command handlers, event listeners and scheduled callbacks
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, turning a panic into `HandlerError::Panic`
pub fn guarded(f: impl FnOnce() -> HandlerResult) -> HandlerResult {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(HandlerError::Panic(panic_message(payload))))
}

/// Run one handler invocation at the dispatch boundary
///
/// Errors and panics are logged and swallowed so that one failing handler
/// never stops the event loop or the handlers that come after it.
pub fn isolate(label: &str, f: impl FnOnce() -> HandlerResult) -> bool {
    match guarded(f) {
        Ok(()) => true,
        Err(e) => {
            error!(handler = label, error = %e, "Handler failed");
            false
        }
    }
}
