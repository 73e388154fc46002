//! # Scheduler Core
//!
//! The explicitly constructed context every processor and dispatch call works
//! against: configuration, key layout, the shared store, the definition
//! lookup, the peer registry, the error sink and the clock. Nothing in the
//! scheduler reaches for ambient global state; a host builds one
//! [`SchedulerCore`] per node and hands `Arc` clones to its processors.
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_cluster::config::SchedulerConfig;
//! use tasker_cluster::orchestration::SchedulerCore;
//! use tasker_cluster::registry::{TaskDefinition, TaskDefinitionRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> tasker_cluster::error::Result<()> {
//! let definitions = TaskDefinitionRegistry::new()
//!     .with_definition(TaskDefinition::from_fn("ping", |_| async { Ok(()) }))?;
//!
//! let core = SchedulerCore::builder(SchedulerConfig::for_node("node-a"), Arc::new(definitions))
//!     .build()?;
//!
//! let outcome = core.enqueue_named("ping", None, Default::default(), true).await?;
//! assert!(outcome.is_enqueued());
//! # Ok(())
//! # }
//! ```

use crate::config::{ConfigManager, SchedulerConfig};
use crate::error::Result;
use crate::messaging::{InMemoryStore, QueueNames, QueueStore, TaskDataStore};
use crate::models::{Task, TaskRequest};
use crate::orchestration::error_reporter::{ErrorReporter, TracingErrorReporter};
use crate::orchestration::task_enqueuer::{EnqueueOutcome, TaskEnqueuer};
use crate::registry::{PeerRegistry, StaticPeerRegistry, TaskDefinitionLookup};
use crate::utils::{Clock, SystemClock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-node scheduler context
pub struct SchedulerCore {
    config: SchedulerConfig,
    queues: QueueNames,
    queue_store: Arc<dyn QueueStore>,
    data_store: Arc<dyn TaskDataStore>,
    definitions: Arc<dyn TaskDefinitionLookup>,
    peers: Arc<dyn PeerRegistry>,
    error_reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
}

impl SchedulerCore {
    pub fn builder(
        config: SchedulerConfig,
        definitions: Arc<dyn TaskDefinitionLookup>,
    ) -> SchedulerCoreBuilder {
        SchedulerCoreBuilder::new(config, definitions)
    }

    /// Core with default collaborators from a loaded configuration
    pub fn from_config(
        config_manager: Arc<ConfigManager>,
        definitions: Arc<dyn TaskDefinitionLookup>,
    ) -> Result<Arc<Self>> {
        Self::builder(config_manager.config().clone(), definitions).build()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    pub fn queues(&self) -> &QueueNames {
        &self.queues
    }

    pub fn queue_store(&self) -> &dyn QueueStore {
        self.queue_store.as_ref()
    }

    pub fn data_store(&self) -> &dyn TaskDataStore {
        self.data_store.as_ref()
    }

    pub fn definitions(&self) -> &dyn TaskDefinitionLookup {
        self.definitions.as_ref()
    }

    pub fn peers(&self) -> &dyn PeerRegistry {
        self.peers.as_ref()
    }

    pub fn error_reporter(&self) -> &dyn ErrorReporter {
        self.error_reporter.as_ref()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Build a task owned by this node; no store access
    pub fn create_task(&self, request: TaskRequest) -> Result<Task> {
        Ok(Task::create(self.definitions(), self.node_id(), request)?)
    }

    /// Dispatch a task, defaulting to the global queue
    pub async fn enqueue(&self, task: Task, target_queue: Option<&str>) -> Result<EnqueueOutcome> {
        TaskEnqueuer::new(self).enqueue(task, target_queue).await
    }

    /// Create and dispatch in one call
    pub async fn enqueue_named(
        &self,
        name: &str,
        run_at: Option<i64>,
        params: Map<String, Value>,
        to_announce: bool,
    ) -> Result<EnqueueOutcome> {
        let mut request = TaskRequest::new(name)
            .with_params(params)
            .with_announce(to_announce);
        request.run_at = run_at;

        let task = self.create_task(request)?;
        self.enqueue(task, None).await
    }

    /// Every persisted task, optionally restricted to one name
    ///
    /// Records that fail to decode are skipped with a warning.
    pub async fn all_tasks(&self, name_filter: Option<&str>) -> Result<HashMap<String, Task>> {
        let records = self.data_store.hash_scan(self.queues.data()).await?;

        let mut tasks = HashMap::with_capacity(records.len());
        for (id, record) in records {
            match Task::from_record(&id, record) {
                Ok(task) if name_filter.map_or(true, |name| task.name == name) => {
                    tasks.insert(id, task);
                }
                Ok(_) => {}
                Err(e) => warn!(task_id = %id, error = %e, "Skipping undecodable task record"),
            }
        }
        Ok(tasks)
    }
}

impl fmt::Debug for SchedulerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("node_id", &self.config.node_id)
            .field("key_prefix", &self.config.key_prefix)
            .field("workers", &self.config.workers)
            .field("cycle_time_ms", &self.config.cycle_time_ms)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`SchedulerCore`]
///
/// Unset collaborators default to a private [`InMemoryStore`], a peer
/// registry listing only this node, [`TracingErrorReporter`] and
/// [`SystemClock`].
pub struct SchedulerCoreBuilder {
    config: SchedulerConfig,
    definitions: Arc<dyn TaskDefinitionLookup>,
    queue_store: Option<Arc<dyn QueueStore>>,
    data_store: Option<Arc<dyn TaskDataStore>>,
    peers: Option<Arc<dyn PeerRegistry>>,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SchedulerCoreBuilder {
    pub fn new(config: SchedulerConfig, definitions: Arc<dyn TaskDefinitionLookup>) -> Self {
        Self {
            config,
            definitions,
            queue_store: None,
            data_store: None,
            peers: None,
            error_reporter: None,
            clock: None,
        }
    }

    /// Use one store for both lists and the record bucket
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: QueueStore + TaskDataStore + 'static,
    {
        self.queue_store = Some(store.clone());
        self.data_store = Some(store);
        self
    }

    pub fn with_queue_store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.queue_store = Some(store);
        self
    }

    pub fn with_data_store(mut self, store: Arc<dyn TaskDataStore>) -> Self {
        self.data_store = Some(store);
        self
    }

    pub fn with_peer_registry(mut self, peers: Arc<dyn PeerRegistry>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Arc<SchedulerCore>> {
        self.config.validate()?;

        let (queue_store, data_store) = match (self.queue_store, self.data_store) {
            (Some(queue_store), Some(data_store)) => (queue_store, data_store),
            (queue_store, data_store) => {
                let fallback = Arc::new(InMemoryStore::new());
                (
                    queue_store.unwrap_or_else(|| fallback.clone()),
                    data_store.unwrap_or(fallback),
                )
            }
        };

        let peers = self.peers.unwrap_or_else(|| {
            Arc::new(StaticPeerRegistry::new([self.config.node_id.clone()]))
        });

        let queues = self.config.queue_names();

        info!(
            node_id = %self.config.node_id,
            local_queue = %queues.local(),
            workers = self.config.workers,
            cycle_time_ms = self.config.cycle_time_ms,
            "Scheduler core initialized"
        );

        Ok(Arc::new(SchedulerCore {
            queues,
            config: self.config,
            queue_store,
            data_store,
            definitions: self.definitions,
            peers,
            error_reporter: self
                .error_reporter
                .unwrap_or_else(|| Arc::new(TracingErrorReporter)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }))
    }
}
