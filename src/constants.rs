//! # System Constants
//!
//! Queue key layout, record field names and scheduling defaults shared by
//! every node that talks to the same store.

/// Scope value meaning "run once, on exactly one node"
pub const SCOPE_ANY: &str = "any";

/// Placeholder used for queue/state before a task is dispatched
pub const UNKNOWN: &str = "unknown";

/// Queue key layout under the shared prefix
pub mod queues {
    /// Default namespace for every key the scheduler touches
    pub const DEFAULT_KEY_PREFIX: &str = "tasker:tasks";

    pub const GLOBAL_SUFFIX: &str = "global";
    pub const DELAYED_SUFFIX: &str = "delayed";
    pub const PROCESSING_SUFFIX: &str = "processing";

    /// Hash bucket holding task records keyed by task id
    pub const DATA_SUFFIX: &str = "data";
}

/// Field names of the persisted task record
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const SCOPE: &str = "scope";
    pub const PERIODIC: &str = "periodic";
    pub const FREQUENCY: &str = "frequency";
    pub const PARAMS: &str = "params";
    pub const RUN_AT: &str = "runAt";
    pub const TO_ANNOUNCE: &str = "toAnnounce";
    pub const ENQUEUED_AT: &str = "enqueuedAt";
    pub const STATE: &str = "state";
    pub const QUEUE: &str = "queue";
}

/// Scheduling defaults
pub mod system {
    /// Worker cycle period applied uniformly to every processor on a node
    pub const DEFAULT_CYCLE_TIME_MS: u64 = 200;

    /// Processors started per node when nothing is configured
    pub const DEFAULT_WORKERS: usize = 1;

    /// Attempts at moving a claimed task out of processing after a failed step
    pub const RECOVERY_ATTEMPTS: u32 = 3;

    /// Delay before the second recovery attempt, doubled for each one after
    pub const RECOVERY_BACKOFF_MS: u64 = 10;

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "TASKER";
}
