//! # Orchestration
//!
//! Everything that moves tasks through the shared queues.
//!
//! ## Components
//!
//! - **SchedulerCore**: explicit per-node context handed to every component
//! - **PeriodicGate**: blocks a second outstanding instance of a periodic task
//! - **TaskEnqueuer**: dispatch path (gate, queue resolution, persist, append)
//! - **QueueTransitions**: claim, place, relocate and retire primitives
//! - **Distributor**: localizes `any`-scoped tasks, fans broadcast tasks out to peers
//! - **TaskProcessor**: the polling worker driving all of the above
//! - **ProcessorPool**: the node's fixed set of processors
//! - **ErrorReporter**: sink for task and loop failures
//!
//! ## Flow
//!
//! ```text
//! enqueue ──► global ──claim──► processing ──distribute──► local(node) ──claim──► processing ──run──► retired
//!    │                                          └─ broadcast: copy per peer, original retired
//!    └─(runAt in future)──► delayed ──(due)──► global
//! ```

pub mod core;
pub mod distributor;
pub mod error_reporter;
pub mod periodic_gate;
pub mod processor_pool;
pub mod queue_transitions;
pub mod task_enqueuer;
pub mod task_processor;

pub use self::core::{SchedulerCore, SchedulerCoreBuilder};
pub use distributor::{Distribution, Distributor, FanOutCopy};
pub use error_reporter::{ErrorReporter, TracingErrorReporter};
pub use periodic_gate::{GateDecision, PeriodicGate};
pub use processor_pool::ProcessorPool;
pub use queue_transitions::{Claim, QueueTransitions};
pub use task_enqueuer::{EnqueueOutcome, TaskEnqueuer};
pub use task_processor::{CycleOutcome, TaskProcessor};
