//! # Task Definition Registry
//!
//! Name-keyed table of task definitions, built once at startup by whatever
//! loads definitions and read-only afterwards. The scheduler core depends only
//! on the [`TaskDefinitionLookup`] contract.
//!
//! ## Usage
//!
//! ```rust
//! use tasker_cluster::registry::{TaskDefinition, TaskDefinitionRegistry};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = TaskDefinitionRegistry::new();
//! registry.register(
//!     TaskDefinition::from_fn("cleanup", |_params| async { Ok(()) })
//!         .with_description("Purge expired sessions")
//!         .with_frequency(60_000),
//! )?;
//!
//! assert!(registry.lookup_definition("cleanup").is_some());
//! # Ok(())
//! # }
//! ```

use crate::constants::SCOPE_ANY;
use crate::error::{Result, TaskerError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Run logic supplied by the host for one task definition
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, params: Map<String, Value>) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`TaskHandler`]
pub struct FnTaskHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> TaskHandler for FnTaskHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, params: Map<String, Value>) -> anyhow::Result<()> {
        (self.f)(params).await
    }
}

/// A registered kind of task
#[derive(Clone)]
pub struct TaskDefinition {
    name: String,
    description: String,
    scope: String,
    frequency: u64,
    handler: Arc<dyn TaskHandler>,
}

impl TaskDefinition {
    /// Definition with scope `any`, not periodic, described by its name
    pub fn new(name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            scope: SCOPE_ANY.to_string(),
            frequency: 0,
            handler,
        }
    }

    /// Definition whose run logic is an async closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(name, Arc::new(FnTaskHandler { f }))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// `any` runs on one node; anything else runs on every node
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Milliseconds between runs; zero means not periodic
    pub fn with_frequency(mut self, frequency_ms: u64) -> Self {
        self.frequency = frequency_ms;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn is_periodic(&self) -> bool {
        self.frequency > 0
    }

    pub fn handler(&self) -> &Arc<dyn TaskHandler> {
        &self.handler
    }

    /// Reject definitions a loader must not register
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TaskerError::configuration("a task is missing `name`"));
        }
        if self.description.trim().is_empty() {
            return Err(TaskerError::configuration(format!(
                "Task {} is missing `description`",
                self.name
            )));
        }
        if self.scope.trim().is_empty() {
            return Err(TaskerError::configuration(format!(
                "Task {} has no scope",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("scope", &self.scope)
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}

/// Read-only lookup the scheduler core depends on
pub trait TaskDefinitionLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<TaskDefinition>>;
}

/// In-memory definition table
#[derive(Debug, Default, Clone)]
pub struct TaskDefinitionRegistry {
    definitions: HashMap<String, Arc<TaskDefinition>>,
}

impl TaskDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a definition, replacing any previous one of the same name
    pub fn register(&mut self, definition: TaskDefinition) -> Result<()> {
        definition.validate()?;

        let name = definition.name.clone();
        if self
            .definitions
            .insert(name.clone(), Arc::new(definition))
            .is_some()
        {
            warn!(task_name = %name, "task definition (re)loaded, previous definition replaced");
        } else {
            info!(task_name = %name, "task definition loaded");
        }
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_definition(mut self, definition: TaskDefinition) -> Result<Self> {
        self.register(definition)?;
        Ok(self)
    }

    pub fn lookup_definition(&self, name: &str) -> Option<&Arc<TaskDefinition>> {
        self.definitions.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl TaskDefinitionLookup for TaskDefinitionRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<TaskDefinition>> {
        self.definitions.get(name).cloned()
    }
}
