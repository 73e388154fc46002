//! # Queue Transitions
//!
//! Every move of a task between lists goes through here. A move is always
//! "write the new queue name into the record, then move the id"; when the two
//! disagree after a partial failure, list membership is authoritative.
//!
//! Only single-key atomic store operations are used. The claim is the list
//! pop: whichever processor pops an id owns it.
//!
//! A claimed id must not stay in processing past the cycle that claimed it.
//! When a step after the claim fails, [`QueueTransitions::recover`] and
//! [`QueueTransitions::retire_retrying`] move it out again.

use crate::constants::{fields, system};
use crate::error::{Result, TaskerError};
use crate::logging::log_queue_transition;
use crate::messaging::TaskRecord;
use crate::models::Task;
use crate::orchestration::core::SchedulerCore;
use crate::state_machine::TaskState;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, warn};

/// Result of popping an id off a queue
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// Queue was empty; another processor got there first
    Empty,
    /// Id popped but its record is gone; the id has been dropped
    Orphaned { task_id: String },
    Claimed(Task),
}

pub struct QueueTransitions<'a> {
    core: &'a SchedulerCore,
}

impl<'a> QueueTransitions<'a> {
    pub fn new(core: &'a SchedulerCore) -> Self {
        Self { core }
    }

    /// Pop the head of `queue` and load its record without placing it anywhere
    ///
    /// The caller owns the id afterwards and must push it somewhere or retire it.
    pub async fn pop_record(&self, queue: &str) -> Result<Claim> {
        let Some(task_id) = self.core.queue_store().pop_head(queue).await? else {
            return Ok(Claim::Empty);
        };

        let data = self.core.queues().data();
        let record = match self.core.data_store().hash_get(data, &task_id).await {
            Ok(record) => record,
            Err(e) => {
                self.push_back(&task_id, queue).await;
                return Err(e.into());
            }
        };
        let Some(record) = record else {
            warn!(task_id = %task_id, queue = %queue, "Dropping queue entry with no task record");
            return Ok(Claim::Orphaned { task_id });
        };

        match Task::from_record(&task_id, record) {
            Ok(task) => Ok(Claim::Claimed(task)),
            Err(e) => {
                // unreadable records would otherwise poison every gate scan
                self.core.data_store().hash_delete(data, &task_id).await?;
                Err(TaskerError::Validation(e))
            }
        }
    }

    /// Claim the head of `from` into the processing queue
    pub async fn claim(&self, from: &str) -> Result<Claim> {
        match self.pop_record(from).await? {
            Claim::Claimed(mut task) => {
                let processing = self.core.queues().processing().to_string();
                if let Err(e) = self.place(&mut task, &processing, None).await {
                    // the id is in no list yet; the record may already say processing
                    if let Err(restore) = self.write_queue(&mut task, from, None).await {
                        warn!(task_id = %task.id, error = %restore, "Could not restore queue field after failed claim");
                    }
                    self.push_back(&task.id, from).await;
                    return Err(e);
                }
                Ok(Claim::Claimed(task))
            }
            other => Ok(other),
        }
    }

    /// Record `to` (and optionally a new state), then append the id to `to`
    ///
    /// For ids that are currently in no list: freshly popped or never queued.
    pub async fn place(&self, task: &mut Task, to: &str, state: Option<TaskState>) -> Result<()> {
        let from = task.queue.clone();
        self.write_queue(task, to, state).await?;
        self.core.queue_store().push_tail(to, &task.id).await?;
        log_queue_transition(&task.id, &from, to);
        Ok(())
    }

    /// Record `to`, then move the id from `from` to `to`
    pub async fn relocate(
        &self,
        task: &mut Task,
        from: &str,
        to: &str,
        state: Option<TaskState>,
    ) -> Result<()> {
        self.write_queue(task, to, state).await?;
        let removed = self.core.queue_store().remove_one(from, &task.id).await?;
        if removed == 0 {
            warn!(task_id = %task.id, queue = %from, "Task id was not in its source queue");
        }
        self.core.queue_store().push_tail(to, &task.id).await?;
        log_queue_transition(&task.id, from, to);
        Ok(())
    }

    /// Remove the id from `queue` and delete its record
    ///
    /// Safe to repeat: a second call finds nothing to remove.
    pub async fn retire(&self, task_id: &str, queue: &str) -> Result<()> {
        self.core.queue_store().remove_one(queue, task_id).await?;
        self.core
            .data_store()
            .hash_delete(self.core.queues().data(), task_id)
            .await?;
        Ok(())
    }

    /// Move a claimed task from processing to `to`, retrying with backoff
    ///
    /// Used when a step after the claim failed. Each attempt is a full
    /// [`relocate`](Self::relocate), so a partly applied earlier attempt is
    /// completed rather than duplicated.
    pub async fn recover(&self, task: &mut Task, to: &str, state: Option<TaskState>) -> Result<()> {
        let processing = self.core.queues().processing().to_string();
        let mut attempt = 1;
        loop {
            match self.relocate(task, &processing, to, state).await {
                Ok(()) => {
                    warn!(task_id = %task.id, queue = %to, attempt, "Recovered task out of processing");
                    return Ok(());
                }
                Err(e) if attempt < system::RECOVERY_ATTEMPTS => {
                    warn!(task_id = %task.id, attempt, error = %e, "Recovery out of processing failed, retrying");
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(task_id = %task.id, attempts = attempt, error = %e, "Task left in processing");
                    return Err(e);
                }
            }
        }
    }

    /// [`retire`](Self::retire) with the same retry policy as [`recover`](Self::recover)
    pub async fn retire_retrying(&self, task_id: &str, queue: &str) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.retire(task_id, queue).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < system::RECOVERY_ATTEMPTS => {
                    warn!(task_id = %task_id, attempt, error = %e, "Retire failed, retrying");
                    backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(task_id = %task_id, queue = %queue, attempts = attempt, error = %e, "Task could not be retired");
                    return Err(e);
                }
            }
        }
    }

    async fn push_back(&self, task_id: &str, queue: &str) {
        match self.core.queue_store().push_tail(queue, task_id).await {
            Ok(()) => warn!(task_id = %task_id, queue = %queue, "Returned popped id after a failed claim"),
            Err(e) => error!(task_id = %task_id, queue = %queue, error = %e, "Popped id is in no queue"),
        }
    }

    async fn write_queue(&self, task: &mut Task, to: &str, state: Option<TaskState>) -> Result<()> {
        let mut update = TaskRecord::new();
        update.insert(fields::QUEUE.to_string(), Value::String(to.to_string()));
        if let Some(state) = state {
            update.insert(fields::STATE.to_string(), Value::String(state.to_string()));
            task.state = state;
        }

        self.core
            .data_store()
            .hash_set(self.core.queues().data(), &task.id, update)
            .await?;
        task.queue = to.to_string();
        Ok(())
    }
}

async fn backoff(attempt: u32) {
    let delay = system::RECOVERY_BACKOFF_MS << (attempt - 1).min(6);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
