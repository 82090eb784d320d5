//! Containment of panics raised by user code

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Convert a panic payload to a human-readable string
///
/// Handles the common payload types (&str, String) and provides
/// a fallback for unknown types.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `f`, logging and swallowing a panic
///
/// Returns `None` if `f` panicked. `context` names the caller in the log line.
pub fn catch_logged<F, R>(context: &str, f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Some(result),
        Err(payload) => {
            tracing::error!("{} panicked: {}", context, panic_message(payload.as_ref()));
            None
        }
    }
}
