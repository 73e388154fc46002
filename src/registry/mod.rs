//! # Registry Infrastructure
//!
//! Lookups the scheduler core reads but never writes:
//!
//! - **TaskDefinitionRegistry**: task name → scope, frequency and run logic
//! - **PeerRegistry**: currently live node ids, consulted on broadcast fan-out

pub mod peer_registry;
pub mod task_definition_registry;

pub use peer_registry::{PeerRegistry, StaticPeerRegistry};
pub use task_definition_registry::{
    FnTaskHandler, TaskDefinition, TaskDefinitionLookup, TaskDefinitionRegistry, TaskHandler,
};
