//! depman-runtime - Serial execution of lifecycle transitions
//!
//! This crate provides:
//! - [`SerialTaskQueue`] for running tasks one at a time in FIFO order
//! - [`catch_logged`] and [`panic_message`] for containing panics from user code

mod panic;
mod serial;

pub use panic::{catch_logged, panic_message};
pub use serial::SerialTaskQueue;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{SerialTaskQueue, catch_logged};
}
