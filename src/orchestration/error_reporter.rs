//! Sink for failures the scheduler observes but never retries.

use crate::error::{TaskRunError, TaskerError};
use crate::logging::log_error;
use crate::models::Task;

/// Receives task and loop failures
///
/// Implementations must not block: they are called inline on a worker's
/// cycle.
pub trait ErrorReporter: Send + Sync {
    /// A task's run logic failed; the task is retired regardless
    fn report_task_error(&self, task: &Task, error: &TaskRunError);

    /// A worker cycle was aborted; the loop continues on the next tick
    fn report_loop_error(&self, error: &TaskerError);
}

/// Default reporter: structured `error!` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_task_error(&self, task: &Task, error: &TaskRunError) {
        let context = format!("task_id={} task_name={}", task.id, task.name);
        log_error("task", "run", &error.to_string(), Some(&context));
    }

    fn report_loop_error(&self, error: &TaskerError) {
        log_error("task_processor", "cycle", &error.to_string(), None);
    }
}
