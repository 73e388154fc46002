//! # Messaging Module
//!
//! Contracts for the shared list/hash store that every node polls, the key
//! layout under the shared prefix, and a process-local implementation.

pub mod errors;
pub mod in_memory;
pub mod queue_names;
pub mod store;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryStore;
pub use queue_names::QueueNames;
pub use store::{merge_record, QueueStore, TaskDataStore, TaskRecord};
