#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Cluster
//!
//! Distributed, store-backed task scheduler. Any number of nodes poll a shared
//! list/hash store, claim tasks from it, run them, and coordinate so that
//! scoped and periodic work runs where and when intended, using nothing but
//! atomic single-key list and hash operations.
//!
//! ## Queues
//!
//! Four FIFO lists under a shared key prefix, plus one hash bucket of task
//! records keyed by task id:
//!
//! - `global`: not yet claimed by any node
//! - `delayed`: `runAt` still in the future, scanned round-robin
//! - one local queue per node: claimed for, or broadcast to, that node
//! - `processing`: held for the duration of a single worker cycle
//!
//! ## Guarantees
//!
//! At-least-once execution with best-effort periodic deduplication. Task
//! failures are reported, never retried. A failed worker cycle never stops
//! the polling loop.
//!
//! ## Module Organization
//!
//! - [`models`] - the task entity and its persisted record
//! - [`orchestration`] - dispatch, periodic gate, fan-out, workers
//! - [`messaging`] - store contracts, key layout, in-memory store
//! - [`registry`] - task definitions and live peers
//! - [`state_machine`] - task and processor states
//! - [`config`] - layered node configuration
//! - [`logging`] - structured console and JSON-file logging
//! - [`error`] - error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tasker_cluster::config::ConfigManager;
//! use tasker_cluster::orchestration::{ProcessorPool, SchedulerCore};
//! use tasker_cluster::registry::{TaskDefinition, TaskDefinitionRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! tasker_cluster::logging::init_structured_logging();
//!
//! let definitions = TaskDefinitionRegistry::new().with_definition(
//!     TaskDefinition::from_fn("cleanup", |params| async move {
//!         println!("cleaning up {params:?}");
//!         Ok(())
//!     })
//!     .with_frequency(60_000),
//! )?;
//!
//! let core = SchedulerCore::from_config(ConfigManager::load()?, Arc::new(definitions))?;
//! let pool = ProcessorPool::start(core.clone())?;
//!
//! core.enqueue_named("cleanup", None, Default::default(), true).await?;
//!
//! tokio::time::sleep(Duration::from_secs(1)).await;
//! pool.stop_all(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;
pub mod utils;

pub use config::{ConfigManager, SchedulerConfig};
pub use error::{Result, TaskRunError, TaskerError, ValidationError};
pub use messaging::{InMemoryStore, MessagingError, QueueNames, QueueStore, TaskDataStore};
pub use models::{Task, TaskRequest, TaskRunResult};
pub use orchestration::{
    CycleOutcome, EnqueueOutcome, ErrorReporter, ProcessorPool, SchedulerCore, TaskProcessor,
};
pub use registry::{PeerRegistry, TaskDefinition, TaskDefinitionLookup, TaskDefinitionRegistry};
pub use state_machine::{ProcessorState, TaskState};
