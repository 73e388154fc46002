use parking_lot::Mutex;
use tasker_cluster::error::{TaskRunError, TaskerError};
use tasker_cluster::models::Task;
use tasker_cluster::orchestration::ErrorReporter;

/// Keeps every reported error for later assertions
#[derive(Debug, Default)]
pub struct RecordingErrorReporter {
    task_errors: Mutex<Vec<(String, String)>>,
    loop_errors: Mutex<Vec<String>>,
}

impl RecordingErrorReporter {
    /// `(task name, error message)` pairs
    pub fn task_errors(&self) -> Vec<(String, String)> {
        self.task_errors.lock().clone()
    }

    pub fn loop_errors(&self) -> Vec<String> {
        self.loop_errors.lock().clone()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report_task_error(&self, task: &Task, error: &TaskRunError) {
        self.task_errors
            .lock()
            .push((task.name.clone(), error.to_string()));
    }

    fn report_loop_error(&self, error: &TaskerError) {
        self.loop_errors.lock().push(error.to_string());
    }
}
