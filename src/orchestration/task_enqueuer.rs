//! # Task Enqueuer
//!
//! The dispatch path: periodic gate, queue resolution, one merged record
//! write, one list append. There is no rollback; a record persisted without
//! its list append is an orphan left for external maintenance.

use crate::error::Result;
use crate::logging::log_task_operation;
use crate::models::Task;
use crate::orchestration::core::SchedulerCore;
use crate::orchestration::periodic_gate::{GateDecision, PeriodicGate};
use crate::state_machine::TaskState;
use tracing::{debug, instrument};

/// Result of a dispatch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// Persisted and appended; carries the task as written
    Enqueued(Task),
    /// Not enqueued, periodic instance already pending
    SkippedPeriodic { existing_id: String },
}

impl EnqueueOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued(_))
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            Self::Enqueued(task) => Some(task),
            Self::SkippedPeriodic { .. } => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task().map(|task| task.id.as_str())
    }
}

pub struct TaskEnqueuer<'a> {
    core: &'a SchedulerCore,
}

impl<'a> TaskEnqueuer<'a> {
    pub fn new(core: &'a SchedulerCore) -> Self {
        Self { core }
    }

    /// Gate, resolve the queue, persist, append
    ///
    /// A future `runAt` forces the delayed queue regardless of `target_queue`.
    #[instrument(skip(self, task), fields(task_id = %task.id, task_name = %task.name))]
    pub async fn enqueue(&self, task: Task, target_queue: Option<&str>) -> Result<EnqueueOutcome> {
        if let GateDecision::Blocked { existing_id, .. } =
            PeriodicGate::new(self.core).check(&task).await?
        {
            log_task_operation("enqueue", &task.id, &task.name, None, "skipped_periodic");
            return Ok(EnqueueOutcome::SkippedPeriodic { existing_id });
        }

        let queues = self.core.queues();
        let now = self.core.now_ms();
        let (queue, state) = if task.is_scheduled_after(now) {
            (queues.delayed(), TaskState::Delayed)
        } else {
            (target_queue.unwrap_or(queues.global()), TaskState::Pending)
        };

        let task = self.persist_and_push(task, queue, state, now).await?;
        log_task_operation("enqueue", &task.id, &task.name, Some(queue), "enqueued");
        Ok(EnqueueOutcome::Enqueued(task))
    }

    /// Place a task straight into `queue` as pending
    ///
    /// Skips the periodic gate and the delayed queue; used for fan-out copies
    /// whose original already passed both.
    pub async fn enqueue_direct(&self, task: Task, queue: &str) -> Result<Task> {
        let now = self.core.now_ms();
        let task = self
            .persist_and_push(task, queue, TaskState::Pending, now)
            .await?;
        debug!(task_id = %task.id, queue = %queue, "Task placed directly");
        Ok(task)
    }

    async fn persist_and_push(
        &self,
        mut task: Task,
        queue: &str,
        state: TaskState,
        now: i64,
    ) -> Result<Task> {
        task.queue = queue.to_string();
        task.state = state;
        task.enqueued_at = Some(now);

        self.core
            .data_store()
            .hash_set(self.core.queues().data(), &task.id, task.to_record()?)
            .await?;
        self.core.queue_store().push_tail(queue, &task.id).await?;
        Ok(task)
    }
}
