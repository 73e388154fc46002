//! # Shared Store Contracts
//!
//! The scheduler core talks to the shared store only through these two traits.
//! Every method is a single atomic single-key operation; the core never needs a
//! multi-key transaction.
//!
//! Implementations must be safe to call concurrently from any number of
//! workers on any number of nodes.

use super::errors::MessagingResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A task record as persisted: a flat JSON map
pub type TaskRecord = Map<String, Value>;

/// Atomic FIFO list primitives
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append `id` to the tail of `queue`
    async fn push_tail(&self, queue: &str, id: &str) -> MessagingResult<()>;

    /// Remove and return the head of `queue`, if any
    async fn pop_head(&self, queue: &str) -> MessagingResult<Option<String>>;

    /// Remove the first occurrence of `id` from `queue`, returning how many were removed
    async fn remove_one(&self, queue: &str, id: &str) -> MessagingResult<usize>;

    /// Current length of `queue`
    async fn length(&self, queue: &str) -> MessagingResult<usize>;
}

/// Hash bucket primitives for task records
#[async_trait]
pub trait TaskDataStore: Send + Sync {
    /// Read-merge-write: fields present in `record` overwrite, all others are
    /// preserved. Returns the merged record.
    async fn hash_set(&self, bucket: &str, id: &str, record: TaskRecord)
        -> MessagingResult<TaskRecord>;

    /// Fetch the record stored under `id`
    async fn hash_get(&self, bucket: &str, id: &str) -> MessagingResult<Option<TaskRecord>>;

    /// Delete the record stored under `id`, returning whether one existed
    async fn hash_delete(&self, bucket: &str, id: &str) -> MessagingResult<bool>;

    /// Every record in `bucket`, keyed by id
    async fn hash_scan(&self, bucket: &str) -> MessagingResult<HashMap<String, TaskRecord>>;
}

/// Merge `update` into `existing`, overwriting only the keys present in `update`
pub fn merge_record(existing: &mut TaskRecord, update: TaskRecord) {
    for (key, value) in update {
        existing.insert(key, value);
    }
}
