// Task and processor lifecycle states.
//
// Task state is persisted in the task record; processor state lives only in
// the owning node's memory.

pub mod states;

pub use states::{ProcessorState, TaskState};
