use thiserror::Error;

use crate::models::{JobId, TaskId};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("node <{0}> does not exist")]
    MissingNode(String),

    #[error("the controller of {kind} {name} is empty")]
    EmptyOwner { kind: &'static str, name: String },

    #[error("job <{0}> not found in session")]
    UnknownJob(JobId),

    #[error("task <{0}> not found in session")]
    UnknownTask(TaskId),

    #[error("insufficient resources on node <{node}> for task <{task}>")]
    InsufficientResources { task: TaskId, node: String },

    #[error("job <{job}> cannot assemble gang of {min_available}, only {satisfiable} task(s) placeable")]
    GangUnsatisfiable {
        job: JobId,
        min_available: usize,
        satisfiable: usize,
    },
}

/// Failure classification reported by the external binding writer.
#[derive(Debug, Error)]
pub enum BindError {
    /// The binding should be redelivered on a later scheduling cycle.
    #[error("retryable bind failure: {0}")]
    Retryable(String),

    /// The binding is dropped; only the loss is logged.
    #[error("fatal bind failure: {0}")]
    Fatal(String),
}
