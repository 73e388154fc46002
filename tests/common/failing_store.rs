//! Store and peer-registry wrappers that fail on demand.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tasker_cluster::messaging::{
    InMemoryStore, MessagingError, MessagingResult, QueueStore, TaskDataStore, TaskRecord,
};
use tasker_cluster::registry::{PeerRegistry, StaticPeerRegistry};

/// Delegates to an [`InMemoryStore`] until `fail_lists` / `fail_hashes` is set
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    fail_lists: AtomicBool,
    fail_hashes: AtomicBool,
    /// Queue value and remaining count for targeted hash_set failures
    fail_moves_to: Mutex<Option<(String, usize)>>,
    fail_deletes: AtomicUsize,
    failures: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_lists: AtomicBool::new(false),
            fail_hashes: AtomicBool::new(false),
            fail_moves_to: Mutex::new(None),
            fail_deletes: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fail the next `times` record writes that set the queue field to `queue`
    pub fn fail_moves_to(&self, queue: &str, times: usize) {
        *self.fail_moves_to.lock() = Some((queue.to_string(), times));
    }

    /// Fail the next `times` record deletions
    pub fn fail_deletes(&self, times: usize) {
        self.fail_deletes.store(times, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_hashes(&self, fail: bool) {
        self.fail_hashes.store(fail, Ordering::SeqCst);
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn check_list(&self, queue: &str, operation: &str) -> MessagingResult<()> {
        if self.fail_lists.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(MessagingError::queue_operation(queue, operation, "store unavailable"));
        }
        Ok(())
    }

    fn check_hash(&self, bucket: &str, operation: &str) -> MessagingResult<()> {
        if self.fail_hashes.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(MessagingError::hash_operation(bucket, operation, "store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for FailingStore {
    async fn push_tail(&self, queue: &str, id: &str) -> MessagingResult<()> {
        self.check_list(queue, "push_tail")?;
        self.inner.push_tail(queue, id).await
    }

    async fn pop_head(&self, queue: &str) -> MessagingResult<Option<String>> {
        self.check_list(queue, "pop_head")?;
        self.inner.pop_head(queue).await
    }

    async fn remove_one(&self, queue: &str, id: &str) -> MessagingResult<usize> {
        self.check_list(queue, "remove_one")?;
        self.inner.remove_one(queue, id).await
    }

    async fn length(&self, queue: &str) -> MessagingResult<usize> {
        self.check_list(queue, "length")?;
        self.inner.length(queue).await
    }
}

#[async_trait]
impl TaskDataStore for FailingStore {
    async fn hash_set(
        &self,
        bucket: &str,
        id: &str,
        record: TaskRecord,
    ) -> MessagingResult<TaskRecord> {
        self.check_hash(bucket, "hash_set")?;
        {
            let mut target = self.fail_moves_to.lock();
            if let Some((queue, remaining)) = target.as_mut() {
                let moves_there = record.get("queue").and_then(|q| q.as_str()) == Some(queue.as_str());
                if moves_there && *remaining > 0 {
                    *remaining -= 1;
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    return Err(MessagingError::hash_operation(bucket, "hash_set", "transient"));
                }
            }
        }
        self.inner.hash_set(bucket, id, record).await
    }

    async fn hash_get(&self, bucket: &str, id: &str) -> MessagingResult<Option<TaskRecord>> {
        self.check_hash(bucket, "hash_get")?;
        self.inner.hash_get(bucket, id).await
    }

    async fn hash_delete(&self, bucket: &str, id: &str) -> MessagingResult<bool> {
        self.check_hash(bucket, "hash_delete")?;
        let armed = self
            .fail_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(MessagingError::hash_operation(bucket, "hash_delete", "transient"));
        }
        self.inner.hash_delete(bucket, id).await
    }

    async fn hash_scan(&self, bucket: &str) -> MessagingResult<HashMap<String, TaskRecord>> {
        self.check_hash(bucket, "hash_scan")?;
        self.inner.hash_scan(bucket).await
    }
}

/// Static peer list that can be switched off
#[derive(Debug)]
pub struct FlakyPeerRegistry {
    inner: Arc<StaticPeerRegistry>,
    down: AtomicBool,
}

impl FlakyPeerRegistry {
    pub fn new(inner: Arc<StaticPeerRegistry>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerRegistry for FlakyPeerRegistry {
    async fn list_live_peer_ids(&self) -> MessagingResult<Vec<String>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(MessagingError::connection("peer list unavailable"));
        }
        self.inner.list_live_peer_ids().await
    }
}
