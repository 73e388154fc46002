//! # Fan-out Distributor
//!
//! Hands a task claimed from the global queue to the node(s) that must run it.
//! Scope `any` keeps the single instance and moves it to this node's local
//! queue. Broadcast tasks get one fresh-id copy per live peer other than this
//! node; the caller retires the original once every copy is appended. A
//! fan-out that fails part way withdraws the copies it already placed.

use crate::constants::fields;
use crate::error::Result;
use crate::models::Task;
use crate::orchestration::core::SchedulerCore;
use crate::orchestration::queue_transitions::QueueTransitions;
use crate::orchestration::task_enqueuer::TaskEnqueuer;
use crate::state_machine::TaskState;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Where a claimed task ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    /// Scope `any`: the original now waits in this node's local queue
    Localized { task_id: String, queue: String },
    /// Broadcast: one copy per peer; the original is ready for retirement
    FannedOut { copies: Vec<FanOutCopy> },
}

/// One duplicated broadcast task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutCopy {
    pub peer_id: String,
    pub task_id: String,
}

impl Distribution {
    /// Whether the original should be retired by the caller
    pub fn retires_original(&self) -> bool {
        matches!(self, Self::FannedOut { .. })
    }
}

pub struct Distributor<'a> {
    core: &'a SchedulerCore,
}

impl<'a> Distributor<'a> {
    pub fn new(core: &'a SchedulerCore) -> Self {
        Self { core }
    }

    /// `task` must currently be in the processing queue
    #[instrument(skip(self, task), fields(task_id = %task.id, scope = %task.scope))]
    pub async fn distribute(&self, mut task: Task) -> Result<Distribution> {
        let queues = self.core.queues();

        if task.is_scope_any() {
            QueueTransitions::new(self.core)
                .relocate(
                    &mut task,
                    queues.processing(),
                    queues.local(),
                    Some(TaskState::Pending),
                )
                .await?;
            return Ok(Distribution::Localized {
                task_id: task.id,
                queue: queues.local().to_string(),
            });
        }

        let mut peers = self.core.peers().list_live_peer_ids().await?;
        let mut seen = HashSet::new();
        peers.retain(|peer| peer != self.core.node_id() && seen.insert(peer.clone()));

        let enqueuer = TaskEnqueuer::new(self.core);
        let mut copies = Vec::with_capacity(peers.len());
        for peer_id in peers {
            let copy = task.duplicate(self.core.node_id());
            let copy_id = copy.id.clone();
            match enqueuer.enqueue_direct(copy, &queues.local_for(&peer_id)).await {
                Ok(copy) => copies.push(FanOutCopy {
                    peer_id,
                    task_id: copy.id,
                }),
                Err(e) => {
                    // the record may have been written before the push failed
                    copies.push(FanOutCopy {
                        peer_id,
                        task_id: copy_id,
                    });
                    self.withdraw(&copies).await;
                    return Err(e);
                }
            }
        }

        debug!(copies = copies.len(), "Broadcast task fanned out");
        Ok(Distribution::FannedOut { copies })
    }

    /// Take back copies of an unfinished fan-out so a retry does not double them
    ///
    /// A copy a peer has already popped is left alone.
    async fn withdraw(&self, copies: &[FanOutCopy]) {
        let queues = self.core.queues();
        for copy in copies {
            let local = queues.local_for(&copy.peer_id);
            let withdrawn = match self.core.queue_store().remove_one(&local, &copy.task_id).await {
                Ok(0) => {
                    // never pushed, or already claimed by the peer
                    match self.core.data_store().hash_get(queues.data(), &copy.task_id).await {
                        Ok(Some(record)) => record.get(fields::QUEUE).and_then(|q| q.as_str()) == Some(local.as_str()),
                        Ok(None) => false,
                        Err(e) => {
                            warn!(task_id = %copy.task_id, error = %e, "Could not inspect fan-out copy");
                            false
                        }
                    }
                }
                Ok(_) => true,
                Err(e) => {
                    warn!(task_id = %copy.task_id, peer_id = %copy.peer_id, error = %e, "Could not withdraw fan-out copy");
                    false
                }
            };
            if withdrawn {
                if let Err(e) = self.core.data_store().hash_delete(queues.data(), &copy.task_id).await {
                    warn!(task_id = %copy.task_id, error = %e, "Fan-out copy record left behind");
                }
            }
        }
    }
}
