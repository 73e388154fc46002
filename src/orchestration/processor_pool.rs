//! # Processor Pool
//!
//! The fixed set of [`TaskProcessor`]s a node runs, one per configured worker.
//! Processors share the node's [`SchedulerCore`] and race freely on the shared
//! queues; the pool only starts and stops them together.

use crate::error::Result;
use crate::orchestration::core::SchedulerCore;
use crate::orchestration::task_processor::TaskProcessor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub struct ProcessorPool {
    core: Arc<SchedulerCore>,
    processors: Vec<Arc<TaskProcessor>>,
}

impl ProcessorPool {
    /// Processors with ids `0..workers`, not yet started
    pub fn new(core: Arc<SchedulerCore>) -> Self {
        let processors = (0..core.config().workers)
            .map(|id| Arc::new(TaskProcessor::new(id, core.clone())))
            .collect();
        Self { core, processors }
    }

    /// Build the pool and start every processor
    pub fn start(core: Arc<SchedulerCore>) -> Result<Self> {
        let pool = Self::new(core);
        pool.start_all()?;
        Ok(pool)
    }

    /// Start every processor that is not already running
    ///
    /// Keeps going past individual failures so no started processor is left
    /// without its siblings. Errors only when nothing could be started.
    #[instrument(skip(self), fields(node_id = %self.core.node_id()))]
    pub fn start_all(&self) -> Result<()> {
        let mut started = 0usize;
        let mut first_error = None;

        for processor in &self.processors {
            match processor.start() {
                Ok(()) => started += 1,
                Err(e) => {
                    error!(processor_id = processor.id(), error = %e, "Failed to start task processor");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if started == 0 => Err(e),
            _ => {
                info!(
                    workers = self.processors.len(),
                    started, "Task processors started"
                );
                Ok(())
            }
        }
    }

    /// Stop every processor, splitting `timeout` between them
    ///
    /// Keeps going past individual failures.
    #[instrument(skip(self), fields(node_id = %self.core.node_id()))]
    pub async fn stop_all(&self, timeout: Duration) -> Result<()> {
        let individual_timeout = timeout / (self.processors.len() as u32).max(1);

        for processor in &self.processors {
            if let Err(e) = processor.stop(individual_timeout).await {
                warn!(processor_id = processor.id(), error = %e, "Failed to stop task processor");
            }
        }

        info!(workers = self.processors.len(), "All task processors stopped");
        Ok(())
    }

    pub fn processors(&self) -> &[Arc<TaskProcessor>] {
        &self.processors
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Whether any processor is still polling
    pub fn is_running(&self) -> bool {
        self.processors.iter().any(|p| p.state().is_running())
    }
}
