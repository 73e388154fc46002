//! # Scheduler Error Types
//!
//! Error taxonomy for the scheduler core, built on thiserror.
//!
//! - [`TaskerError::Validation`] is fatal to the enqueue call and is never persisted.
//! - [`TaskerError::Store`] aborts the current worker cycle; the loop continues on the next tick.
//! - [`TaskerError::TaskRun`] is reported and the task is still retired.

use crate::messaging::MessagingError;
use thiserror::Error;

/// Top-level scheduler error
#[derive(Error, Debug)]
pub enum TaskerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] MessagingError),

    #[error("Task run error: {0}")]
    TaskRun(#[from] TaskRunError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Errors raised while building or validating a task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,

    #[error("task name not found: {name}")]
    UnknownTask { name: String },

    #[error("malformed task record {task_id}: {message}")]
    MalformedRecord { task_id: String, message: String },
}

/// Errors raised by a task definition's run logic
#[derive(Error, Debug)]
pub enum TaskRunError {
    #[error("task handler failed: {0:#}")]
    Failed(anyhow::Error),

    #[error("task handler panicked: {0}")]
    Panicked(String),

    #[error("no task definition registered for '{0}'")]
    UnknownDefinition(String),
}

impl TaskerError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Whether this error came from the shared store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl ValidationError {
    pub fn unknown_task(name: impl Into<String>) -> Self {
        Self::UnknownTask { name: name.into() }
    }

    pub fn malformed_record(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskerError>;
