use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle states as persisted in the task record
///
/// `Running` is never written by the dispatcher; it is inferred when a task's
/// queue is the processing queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created but not yet dispatched
    #[default]
    Unknown,
    /// Waiting in the global or a local queue
    Pending,
    /// Waiting in the delayed queue for `runAt` to elapse
    Delayed,
    /// Claimed into the processing queue
    Running,
}

impl TaskState {
    /// Whether a task in this state is still outstanding somewhere in the system
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Delayed | Self::Running)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Pending => write!(f, "pending"),
            Self::Delayed => write!(f, "delayed"),
            Self::Running => write!(f, "running"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "pending" => Ok(Self::Pending),
            "delayed" => Ok(Self::Delayed),
            "running" => Ok(Self::Running),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

/// Lifecycle of a polling worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    /// Constructed, never started
    #[default]
    Idle,
    /// Polling on its cycle
    Running,
    /// Stopped; no further cycles start
    Stopped,
}

impl ProcessorState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether `start()` is allowed from this state
    pub fn can_start(&self) -> bool {
        !self.is_running()
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for ProcessorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "stopped" => Ok(Self::Stopped),
            _ => Err(format!("Invalid processor state: {s}")),
        }
    }
}
