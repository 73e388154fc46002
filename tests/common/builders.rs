//! Test cluster builders: several scheduler nodes sharing one in-memory store,
//! one peer registry and one simulated clock.

use super::failing_store::FlakyPeerRegistry;
use super::recording_reporter::RecordingErrorReporter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tasker_cluster::config::SchedulerConfig;
use tasker_cluster::messaging::{InMemoryStore, QueueStore, TaskDataStore};
use tasker_cluster::orchestration::SchedulerCore;
use tasker_cluster::registry::{StaticPeerRegistry, TaskDefinition, TaskDefinitionRegistry};
use tasker_cluster::utils::ManualClock;

pub const START_MS: i64 = 1_700_000_000_000;

/// Per-name run counters shared by every node's handlers
#[derive(Debug, Default, Clone)]
pub struct RunCounter {
    counts: Arc<parking_lot::Mutex<HashMap<String, usize>>>,
    total: Arc<AtomicUsize>,
}

impl RunCounter {
    pub fn record(&self, name: &str) {
        *self.counts.lock().entry(name.to_string()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.lock().get(name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

fn counting(name: &str, counter: &RunCounter) -> TaskDefinition {
    let counter = counter.clone();
    let task_name = name.to_string();
    TaskDefinition::from_fn(name, move |_| {
        let counter = counter.clone();
        let task_name = task_name.clone();
        async move {
            counter.record(&task_name);
            Ok(())
        }
    })
}

/// Definitions used across the integration tests
///
/// - `ping`: scope any, not periodic
/// - `heartbeat`: scope any, every 5s
/// - `flush`: broadcast, not periodic
/// - `sync`: broadcast, every 1s
/// - `explode`: returns an error
/// - `panics`: panics
pub fn test_definitions(counter: &RunCounter) -> TaskDefinitionRegistry {
    let mut registry = TaskDefinitionRegistry::new();
    registry.register(counting("ping", counter)).unwrap();
    registry
        .register(counting("heartbeat", counter).with_frequency(5000))
        .unwrap();
    registry
        .register(counting("flush", counter).with_scope("all"))
        .unwrap();
    registry
        .register(counting("sync", counter).with_scope("all").with_frequency(1000))
        .unwrap();
    registry
        .register(TaskDefinition::from_fn("explode", |_| async {
            Err(anyhow::anyhow!("explode handler failed"))
        }))
        .unwrap();
    registry
        .register(TaskDefinition::from_fn("panics", |_| async {
            if true {
                panic!("panics handler blew up");
            }
            Ok(())
        }))
        .unwrap();
    registry
}

/// Several nodes over one shared store
pub struct TestCluster {
    pub store: Arc<InMemoryStore>,
    pub peers: Arc<StaticPeerRegistry>,
    /// What the nodes actually query; wraps `peers`
    pub peer_source: Arc<FlakyPeerRegistry>,
    pub clock: Arc<ManualClock>,
    pub reporter: Arc<RecordingErrorReporter>,
    pub counter: RunCounter,
    pub nodes: Vec<Arc<SchedulerCore>>,
}

impl TestCluster {
    pub fn new(node_ids: &[&str]) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::with_stores(node_ids, store.clone(), store.clone(), store)
    }

    /// Cluster whose nodes talk to the store through the given wrappers
    pub fn with_stores(
        node_ids: &[&str],
        store: Arc<InMemoryStore>,
        queue_store: Arc<dyn QueueStore>,
        data_store: Arc<dyn TaskDataStore>,
    ) -> Self {
        let peers = Arc::new(StaticPeerRegistry::new(node_ids.iter().copied()));
        let peer_source = Arc::new(FlakyPeerRegistry::new(peers.clone()));
        let clock = Arc::new(ManualClock::new(START_MS));
        let reporter = Arc::new(RecordingErrorReporter::default());
        let counter = RunCounter::default();
        let definitions = Arc::new(test_definitions(&counter));

        let nodes = node_ids
            .iter()
            .map(|node_id| {
                SchedulerCore::builder(
                    SchedulerConfig::for_node(*node_id).with_cycle_time_ms(10),
                    definitions.clone(),
                )
                .with_queue_store(queue_store.clone())
                .with_data_store(data_store.clone())
                .with_peer_registry(peer_source.clone())
                .with_error_reporter(reporter.clone())
                .with_clock(clock.clone())
                .build()
                .unwrap()
            })
            .collect();

        Self {
            store,
            peers,
            peer_source,
            clock,
            reporter,
            counter,
            nodes,
        }
    }

    pub fn node(&self, index: usize) -> &Arc<SchedulerCore> {
        &self.nodes[index]
    }

    /// Every queue key any node could use
    pub fn all_queue_keys(&self) -> Vec<String> {
        let queues = self.nodes[0].queues();
        let mut keys = vec![
            queues.global().to_string(),
            queues.delayed().to_string(),
            queues.processing().to_string(),
        ];
        keys.extend(self.nodes.iter().map(|node| node.queues().local().to_string()));
        keys
    }

    /// Queues currently holding `task_id`
    pub fn queues_holding(&self, task_id: &str) -> Vec<String> {
        self.all_queue_keys()
            .into_iter()
            .filter(|queue| self.store.list_contains(queue, task_id))
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.store.bucket_len(self.nodes[0].queues().data())
    }
}

/// Single-node cluster
pub fn single_node() -> TestCluster {
    TestCluster::new(&["node-a"])
}
