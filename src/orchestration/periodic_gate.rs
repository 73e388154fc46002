//! # Periodic Gate
//!
//! Keeps at most one outstanding instance of a periodic definition in play.
//!
//! - scope `any`: any persisted task with the same name blocks, wherever it is
//! - broadcast: only a same-name task still in the global queue blocks, since
//!   that one is about to be fanned out to every node anyway
//! - non-periodic tasks always pass
//!
//! The check scans the whole record bucket and is not atomic with the write
//! that follows it; two nodes racing the same periodic enqueue can both pass.

use crate::error::Result;
use crate::messaging::QueueNames;
use crate::models::Task;
use crate::orchestration::core::SchedulerCore;
use tracing::debug;

/// Result of consulting the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    /// An earlier instance is still outstanding
    Blocked { existing_id: String, queue: String },
}

impl GateDecision {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Pure gate rule over the tasks currently persisted
pub fn evaluate<'a, I>(task: &Task, persisted: I, queues: &QueueNames) -> GateDecision
where
    I: IntoIterator<Item = &'a Task>,
{
    if !task.periodic {
        return GateDecision::Open;
    }

    let blocking = persisted.into_iter().find(|existing| {
        existing.name == task.name
            && existing.id != task.id
            && (task.is_scope_any() || existing.queue == queues.global())
    });

    match blocking {
        Some(existing) => GateDecision::Blocked {
            existing_id: existing.id.clone(),
            queue: existing.queue.clone(),
        },
        None => GateDecision::Open,
    }
}

/// Store-backed gate bound to one scheduler core
pub struct PeriodicGate<'a> {
    core: &'a SchedulerCore,
}

impl<'a> PeriodicGate<'a> {
    pub fn new(core: &'a SchedulerCore) -> Self {
        Self { core }
    }

    pub async fn check(&self, task: &Task) -> Result<GateDecision> {
        if !task.periodic {
            return Ok(GateDecision::Open);
        }

        let same_name = self.core.all_tasks(Some(&task.name)).await?;
        let decision = evaluate(task, same_name.values(), self.core.queues());

        if let GateDecision::Blocked { existing_id, queue } = &decision {
            debug!(
                task_name = %task.name,
                existing_id = %existing_id,
                queue = %queue,
                "Periodic instance already outstanding"
            );
        }
        Ok(decision)
    }
}
