pub mod task;

pub use task::{Task, TaskRequest, TaskRunResult};
