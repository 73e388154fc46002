//! # In-Memory Store
//!
//! Process-local implementation of [`QueueStore`] and [`TaskDataStore`].
//! Each list and each hash bucket is a single DashMap entry, so every
//! operation holds exactly one shard lock and is atomic with respect to
//! other callers, matching the single-key guarantees of a shared list/hash
//! server. Suitable for single-process deployments, simulations and tests.

use super::errors::MessagingResult;
use super::store::{merge_record, QueueStore, TaskDataStore, TaskRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use tracing::trace;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    lists: DashMap<String, VecDeque<String>>,
    hashes: DashMap<String, HashMap<String, TaskRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a list, head first
    pub fn list_contents(&self, queue: &str) -> Vec<String> {
        self.lists
            .get(queue)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `id` is present anywhere in `queue`
    pub fn list_contains(&self, queue: &str, id: &str) -> bool {
        self.lists
            .get(queue)
            .map(|list| list.iter().any(|entry| entry == id))
            .unwrap_or(false)
    }

    /// Number of records in a bucket
    pub fn bucket_len(&self, bucket: &str) -> usize {
        self.hashes.get(bucket).map(|h| h.len()).unwrap_or(0)
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn push_tail(&self, queue: &str, id: &str) -> MessagingResult<()> {
        trace!(queue = queue, id = id, "rpush");
        self.lists
            .entry(queue.to_string())
            .or_default()
            .push_back(id.to_string());
        Ok(())
    }

    async fn pop_head(&self, queue: &str) -> MessagingResult<Option<String>> {
        let popped = self
            .lists
            .get_mut(queue)
            .and_then(|mut list| list.pop_front());
        trace!(queue = queue, popped = ?popped, "lpop");
        Ok(popped)
    }

    async fn remove_one(&self, queue: &str, id: &str) -> MessagingResult<usize> {
        let removed = match self.lists.get_mut(queue) {
            Some(mut list) => match list.iter().position(|entry| entry == id) {
                Some(index) => {
                    list.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };
        trace!(queue = queue, id = id, removed = removed, "lrem");
        Ok(removed)
    }

    async fn length(&self, queue: &str) -> MessagingResult<usize> {
        Ok(self.lists.get(queue).map(|list| list.len()).unwrap_or(0))
    }
}

#[async_trait]
impl TaskDataStore for InMemoryStore {
    async fn hash_set(
        &self,
        bucket: &str,
        id: &str,
        record: TaskRecord,
    ) -> MessagingResult<TaskRecord> {
        let mut entries = self.hashes.entry(bucket.to_string()).or_default();
        let existing = entries.entry(id.to_string()).or_default();
        merge_record(existing, record);
        Ok(existing.clone())
    }

    async fn hash_get(&self, bucket: &str, id: &str) -> MessagingResult<Option<TaskRecord>> {
        Ok(self
            .hashes
            .get(bucket)
            .and_then(|entries| entries.get(id).cloned()))
    }

    async fn hash_delete(&self, bucket: &str, id: &str) -> MessagingResult<bool> {
        Ok(self
            .hashes
            .get_mut(bucket)
            .map(|mut entries| entries.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn hash_scan(&self, bucket: &str) -> MessagingResult<HashMap<String, TaskRecord>> {
        Ok(self
            .hashes
            .get(bucket)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }
}
