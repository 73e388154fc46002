//! Store key layout: four kinds of list keys and one hash bucket, all under a
//! shared prefix.

use crate::constants::queues::{DATA_SUFFIX, DELAYED_SUFFIX, GLOBAL_SUFFIX, PROCESSING_SUFFIX};
use serde::{Deserialize, Serialize};

/// Resolved key names for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueNames {
    prefix: String,
    node_id: String,
    global: String,
    delayed: String,
    processing: String,
    local: String,
    data: String,
}

impl QueueNames {
    pub fn new(prefix: impl Into<String>, node_id: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let node_id = node_id.into();
        Self {
            global: format!("{prefix}:{GLOBAL_SUFFIX}"),
            delayed: format!("{prefix}:{DELAYED_SUFFIX}"),
            processing: format!("{prefix}:{PROCESSING_SUFFIX}"),
            local: format!("{prefix}:{node_id}"),
            data: format!("{prefix}:{DATA_SUFFIX}"),
            prefix,
            node_id,
        }
    }

    /// Tasks not yet claimed by any node
    pub fn global(&self) -> &str {
        &self.global
    }

    /// Tasks whose `runAt` has not elapsed
    pub fn delayed(&self) -> &str {
        &self.delayed
    }

    /// Transient holding area for claimed tasks
    pub fn processing(&self) -> &str {
        &self.processing
    }

    /// This node's local queue
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Hash bucket for task records
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Local queue of any node
    pub fn local_for(&self, node_id: &str) -> String {
        format!("{}:{node_id}", self.prefix)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Whether a node id would collide with one of the shared keys
    pub fn is_reserved_node_id(node_id: &str) -> bool {
        matches!(
            node_id,
            GLOBAL_SUFFIX | DELAYED_SUFFIX | PROCESSING_SUFFIX | DATA_SUFFIX
        )
    }
}
