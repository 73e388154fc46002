//! # Task
//!
//! The unit of schedulable work and the flat record it is persisted as.
//!
//! A task is created from a [`TaskRequest`] against the definition registry,
//! which fixes its `scope`, `periodic` flag and `frequency`. Everything the
//! store knows about a task lives in its record under the task id; the list a
//! task id sits in is authoritative over the record's `queue` field.

use crate::constants::{SCOPE_ANY, UNKNOWN};
use crate::error::{TaskRunError, ValidationError};
use crate::messaging::{MessagingError, QueueNames, TaskRecord};
use crate::registry::TaskDefinitionLookup;
use crate::state_machine::TaskState;
use crate::utils::serde::{deserialize_frequency, deserialize_optional_millis};
use futures::FutureExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use uuid::Uuid;

/// Fields a caller supplies when creating a task
///
/// Only `name` is required; everything else has a default.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub name: String,
    pub run_at: Option<i64>,
    pub params: Map<String, Value>,
    pub to_announce: bool,
}

impl TaskRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_at: None,
            params: Map::new(),
            to_announce: true,
        }
    }

    /// Schedule for an epoch-millisecond timestamp
    pub fn with_run_at(mut self, run_at_ms: i64) -> Self {
        self.run_at = Some(run_at_ms);
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_announce(mut self, to_announce: bool) -> Self {
        self.to_announce = to_announce;
        self
    }
}

/// A schedulable unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default, deserialize_with = "deserialize_frequency")]
    pub frequency: u64,
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: Map<String, Value>,
    #[serde(default, deserialize_with = "deserialize_optional_millis")]
    pub run_at: Option<i64>,
    #[serde(default = "default_to_announce")]
    pub to_announce: bool,
    #[serde(default, deserialize_with = "deserialize_optional_millis")]
    pub enqueued_at: Option<i64>,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default = "default_queue")]
    pub queue: String,
}

fn default_scope() -> String {
    SCOPE_ANY.to_string()
}

fn default_to_announce() -> bool {
    true
}

fn default_queue() -> String {
    UNKNOWN.to_string()
}

fn deserialize_params<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(D::Error::custom(format!(
            "params must be an object, found: {other}"
        ))),
    }
}

impl Task {
    /// Build a new task from a request, resolving its definition
    ///
    /// Pure: no store access. `node_id` is folded into the generated id.
    pub fn create(
        definitions: &dyn TaskDefinitionLookup,
        node_id: &str,
        request: TaskRequest,
    ) -> Result<Self, ValidationError> {
        if request.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }

        let definition = definitions
            .lookup(&request.name)
            .ok_or_else(|| ValidationError::unknown_task(&request.name))?;

        Ok(Self {
            id: Self::generate_id(node_id),
            name: request.name,
            scope: definition.scope().to_string(),
            periodic: definition.is_periodic(),
            frequency: definition.frequency(),
            params: request.params,
            run_at: request.run_at,
            to_announce: request.to_announce,
            enqueued_at: None,
            state: TaskState::default(),
            queue: default_queue(),
        })
    }

    /// Random component plus the creating node's id
    pub fn generate_id(node_id: &str) -> String {
        format!("{}:{node_id}", Uuid::new_v4())
    }

    /// Identical copy under a fresh id, used for broadcast fan-out
    pub fn duplicate(&self, node_id: &str) -> Self {
        Self {
            id: Self::generate_id(node_id),
            ..self.clone()
        }
    }

    /// `scope == "any"`: run once on exactly one node
    pub fn is_scope_any(&self) -> bool {
        self.scope == SCOPE_ANY
    }

    /// Any scope other than `any` runs once per node
    pub fn is_broadcast(&self) -> bool {
        !self.is_scope_any()
    }

    /// Whether `runAt` is set and still in the future
    pub fn is_scheduled_after(&self, now_ms: i64) -> bool {
        self.run_at.is_some_and(|run_at| run_at > now_ms)
    }

    /// Whether the task may leave the delayed queue
    pub fn is_due(&self, now_ms: i64) -> bool {
        !self.is_scheduled_after(now_ms)
    }

    /// State as observed from queue membership: a task in processing is running
    pub fn observed_state(&self, queues: &QueueNames) -> TaskState {
        if self.queue == queues.processing() {
            TaskState::Running
        } else {
            self.state
        }
    }

    /// Serialize to the flat record persisted in the data bucket
    pub fn to_record(&self) -> Result<TaskRecord, MessagingError> {
        match serde_json::to_value(self)? {
            Value::Object(record) => Ok(record),
            other => Err(MessagingError::record_serialization(format!(
                "task {} serialized to non-object: {other}",
                self.id
            ))),
        }
    }

    /// Rebuild a task from its record; the bucket key wins over a missing id field
    pub fn from_record(id: &str, record: TaskRecord) -> Result<Self, ValidationError> {
        let mut task: Task = serde_json::from_value(Value::Object(record))
            .map_err(|e| ValidationError::malformed_record(id, e.to_string()))?;
        if task.id.is_empty() {
            task.id = id.to_string();
        }
        Ok(task)
    }

    /// Execute the registered definition's run logic with this task's params
    ///
    /// Never propagates: handler errors, panics and a missing definition all
    /// come back as a failed [`TaskRunResult`].
    pub async fn run(&self, definitions: &dyn TaskDefinitionLookup) -> TaskRunResult {
        let Some(definition) = definitions.lookup(&self.name) else {
            return TaskRunResult::failure(TaskRunError::UnknownDefinition(self.name.clone()));
        };

        let execution = definition.handler().run(self.params.clone());
        match AssertUnwindSafe(execution).catch_unwind().await {
            Ok(Ok(())) => TaskRunResult::success(),
            Ok(Err(err)) => TaskRunResult::failure(TaskRunError::Failed(err)),
            Err(panic) => TaskRunResult::failure(TaskRunError::Panicked(panic_message(&*panic))),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Outcome of [`Task::run`], inspected once by the worker before retirement
#[derive(Debug)]
pub struct TaskRunResult {
    pub ok: bool,
    pub error: Option<TaskRunError>,
}

impl TaskRunResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(error: TaskRunError) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }
}
