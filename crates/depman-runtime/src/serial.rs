//! Single-runner FIFO task queue
//!
//! Any thread may enqueue. Exactly one thread at a time drains; a thread that
//! calls [`SerialTaskQueue::run_pending`] while another is draining returns
//! immediately and leaves its tasks to the active runner.

use crate::panic::panic_message;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
}

/// FIFO queue whose tasks never run concurrently with each other
pub struct SerialTaskQueue {
    name: String,
    state: Mutex<QueueState>,
}

impl SerialTaskQueue {
    /// Create an empty queue; `name` only appears in log output
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a task. Never runs it on the calling thread.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.state.lock().tasks.push_back(Box::new(task));
    }

    /// Drain the queue on the calling thread unless another thread is already
    /// draining it.
    ///
    /// Tasks run outside the internal lock, so a task may enqueue more work;
    /// that work is picked up by the same drain. A panicking task is logged and
    /// the drain moves on to the next task.
    ///
    /// Returns the number of tasks this call executed.
    pub fn run_pending(&self) -> usize {
        {
            let mut state = self.state.lock();
            if state.running {
                return 0;
            }
            state.running = true;
        }

        let mut guard = RunningGuard {
            queue: self,
            armed: true,
        };
        let mut executed = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let next = state.tasks.pop_front();
                if next.is_none() {
                    // Cleared under the same lock as the empty check so a concurrent
                    // enqueue is never stranded.
                    state.running = false;
                    guard.armed = false;
                }
                next
            };
            let Some(task) = next else {
                return executed;
            };

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                tracing::error!(
                    queue = %self.name,
                    "Queued task panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
            executed += 1;
        }
    }

    /// Whether some thread is currently draining
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Number of tasks waiting to run
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SerialTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SerialTaskQueue")
            .field("name", &self.name)
            .field("pending", &state.tasks.len())
            .field("running", &state.running)
            .finish()
    }
}

/// Clears the running flag if a drain unwinds
struct RunningGuard<'a> {
    queue: &'a SerialTaskQueue,
    armed: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.queue.state.lock().running = false;
        }
    }
}
