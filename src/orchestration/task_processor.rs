//! # Task Processor
//!
//! One polling worker. Each cycle looks at the node's local queue, then the
//! global queue, then the delayed queue, and does one unit of work from the
//! first non-empty one:
//!
//! | queue   | work                                                    |
//! |---------|---------------------------------------------------------|
//! | local   | claim into processing, run, retire                      |
//! | global  | claim into processing, distribute, retire if fanned out |
//! | delayed | pop, promote to global when due, else push back         |
//!
//! Store calls within a cycle run strictly one after another. A failed cycle
//! is reported and the next one is scheduled anyway; stopping only prevents
//! new cycles and never interrupts a running task. A task that fails to
//! distribute goes back to the global queue instead of staying in processing.

use crate::error::{Result, TaskerError};
use crate::logging::log_task_operation;
use crate::models::Task;
use crate::orchestration::core::SchedulerCore;
use crate::orchestration::distributor::{Distribution, Distributor};
use crate::orchestration::queue_transitions::{Claim, QueueTransitions};
use crate::state_machine::{ProcessorState, TaskState};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// What a single cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Ran a task from the local queue and retired it
    Executed { task_id: String, ok: bool },
    /// Claimed a task from the global queue and handed it on
    Distributed {
        task_id: String,
        distribution: Distribution,
    },
    /// Moved a due task from delayed to global
    Promoted { task_id: String },
    /// Put a not-yet-due task back on the delayed queue
    Requeued { task_id: String },
    /// All three queues were empty
    Idle,
    /// Lost the pop to another processor, or popped an orphaned id
    Raced,
}

/// A polling worker bound to one scheduler core
pub struct TaskProcessor {
    id: usize,
    core: Arc<SchedulerCore>,
    state: RwLock<ProcessorState>,
    running: AtomicBool,
    shutdown_notify: Mutex<Option<Arc<Notify>>>,
    current_task: RwLock<Option<Task>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskProcessor {
    pub fn new(id: usize, core: Arc<SchedulerCore>) -> Self {
        Self {
            id,
            core,
            state: RwLock::new(ProcessorState::Idle),
            running: AtomicBool::new(false),
            shutdown_notify: Mutex::new(None),
            current_task: RwLock::new(None),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> ProcessorState {
        *self.state.read()
    }

    /// Task handled by the cycle in progress, if any
    pub fn current_task(&self) -> Option<Task> {
        self.current_task.read().clone()
    }

    /// Spawn the polling loop on the current tokio runtime
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.write();
            if !state.can_start() {
                return Err(TaskerError::invalid_state(format!(
                    "task processor {} cannot start from state {}",
                    self.id, *state
                )));
            }
            *state = ProcessorState::Running;
        }

        // fresh per run so a permit left by an earlier stop cannot end this one
        let shutdown = Arc::new(Notify::new());
        *self.shutdown_notify.lock() = Some(shutdown.clone());

        self.running.store(true, Ordering::Release);
        let processor = Arc::clone(self);
        let handle = tokio::spawn(async move { processor.run_loop(shutdown).await });
        *self.handle.lock() = Some(handle);

        info!(processor_id = self.id, "Task processor started");
        Ok(())
    }

    /// Stop scheduling cycles and wait up to `timeout` for the current one
    ///
    /// A cycle still running after `timeout` is left to finish on its own.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            *self.state.write() = ProcessorState::Stopped;
            return Ok(());
        }

        *self.state.write() = ProcessorState::Stopped;
        if let Some(shutdown) = self.shutdown_notify.lock().take() {
            shutdown.notify_one();
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(processor_id = self.id, error = %e, "Processing loop ended abnormally"),
                Err(_) => warn!(
                    processor_id = self.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "In-flight cycle still running after stop timeout"
                ),
            }
        }

        info!(processor_id = self.id, "Task processor stopped");
        Ok(())
    }

    async fn run_loop(self: Arc<Self>, shutdown: Arc<Notify>) {
        let cycle_time = self.core.config().cycle_time();

        while self.running.load(Ordering::Acquire) {
            match self.process_once().await {
                Ok(CycleOutcome::Idle) => {}
                Ok(outcome) => debug!(processor_id = self.id, ?outcome, "Cycle complete"),
                Err(e) => self.core.error_reporter().report_loop_error(&e),
            }

            self.current_task.write().take();

            tokio::select! {
                _ = tokio::time::sleep(cycle_time) => {}
                _ = shutdown.notified() => break,
            }
        }
    }

    /// Run exactly one cycle
    #[instrument(skip(self), fields(processor_id = self.id))]
    pub async fn process_once(&self) -> Result<CycleOutcome> {
        let queues = self.core.queues();
        let store = self.core.queue_store();

        let local_len = store.length(queues.local()).await?;
        let global_len = store.length(queues.global()).await?;
        let delayed_len = store.length(queues.delayed()).await?;

        if local_len > 0 {
            self.work_local().await
        } else if global_len > 0 {
            self.work_global().await
        } else if delayed_len > 0 {
            self.work_delayed().await
        } else {
            Ok(CycleOutcome::Idle)
        }
    }

    async fn work_local(&self) -> Result<CycleOutcome> {
        let transitions = QueueTransitions::new(&self.core);
        let task = match transitions.claim(self.core.queues().local()).await? {
            Claim::Claimed(task) => task,
            Claim::Empty | Claim::Orphaned { .. } => return Ok(CycleOutcome::Raced),
        };

        *self.current_task.write() = Some(task.clone());
        self.announce(&task, "starting task", "started");

        let result = task.run(self.core.definitions()).await;
        if let Some(error) = &result.error {
            self.core.error_reporter().report_task_error(&task, error);
        }

        transitions
            .retire_retrying(&task.id, self.core.queues().processing())
            .await?;
        self.announce(
            &task,
            "completed task",
            if result.is_ok() { "completed" } else { "failed" },
        );

        Ok(CycleOutcome::Executed {
            task_id: task.id,
            ok: result.is_ok(),
        })
    }

    async fn work_global(&self) -> Result<CycleOutcome> {
        let transitions = QueueTransitions::new(&self.core);
        let task = match transitions.claim(self.core.queues().global()).await? {
            Claim::Claimed(task) => task,
            Claim::Empty | Claim::Orphaned { .. } => return Ok(CycleOutcome::Raced),
        };

        *self.current_task.write() = Some(task.clone());
        let task_id = task.id.clone();

        let distribution = match Distributor::new(&self.core).distribute(task.clone()).await {
            Ok(distribution) => distribution,
            Err(e) => {
                // hand the original back so any node can try again next cycle
                let mut task = task;
                if let Err(recovery) = transitions
                    .recover(&mut task, self.core.queues().global(), Some(TaskState::Pending))
                    .await
                {
                    self.core.error_reporter().report_loop_error(&recovery);
                }
                return Err(e);
            }
        };
        if distribution.retires_original() {
            transitions
                .retire_retrying(&task_id, self.core.queues().processing())
                .await?;
        }

        Ok(CycleOutcome::Distributed {
            task_id,
            distribution,
        })
    }

    async fn work_delayed(&self) -> Result<CycleOutcome> {
        let queues = self.core.queues();
        let transitions = QueueTransitions::new(&self.core);
        let mut task = match transitions.pop_record(queues.delayed()).await? {
            Claim::Claimed(task) => task,
            Claim::Empty | Claim::Orphaned { .. } => return Ok(CycleOutcome::Raced),
        };

        if task.is_due(self.core.now_ms()) {
            transitions
                .place(&mut task, queues.global(), Some(TaskState::Pending))
                .await?;
            debug!(processor_id = self.id, task_id = %task.id, "Promoted delayed task");
            Ok(CycleOutcome::Promoted { task_id: task.id })
        } else {
            self.core
                .queue_store()
                .push_tail(queues.delayed(), &task.id)
                .await?;
            Ok(CycleOutcome::Requeued { task_id: task.id })
        }
    }

    fn announce(&self, task: &Task, message: &str, status: &str) {
        if task.to_announce {
            info!(processor_id = self.id, task_id = %task.id, task_name = %task.name, "{message}");
            log_task_operation("run", &task.id, &task.name, None, status);
        } else {
            debug!(processor_id = self.id, task_id = %task.id, task_name = %task.name, "{message}");
        }
    }
}

impl std::fmt::Debug for TaskProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProcessor")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("node_id", &self.core.node_id())
            .finish()
    }
}
