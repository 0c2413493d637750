//! Gang readiness and stable task ordering.

use std::cmp::Ordering;

use crate::cycle_state::CycleState;
use crate::models::{JobInfo, TaskInfo, TaskStatus};
use crate::plugins::{JobReadyPlugin, Plugin, TaskOrderPlugin};

pub const PLUGIN_NAME: &str = "gang";

pub struct Gang;

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Running => 4,
        TaskStatus::Bound => 3,
        TaskStatus::Allocated => 2,
        TaskStatus::Pending => 1,
        TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Unknown => 0,
    }
}

impl Plugin for Gang {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }
}

impl JobReadyPlugin for Gang {
    fn job_ready(&self, _state: &CycleState, job: &JobInfo) -> bool {
        job.ready_task_count() >= job.min_available()
    }
}

impl TaskOrderPlugin for Gang {
    /// Further-along tasks first, then uid ascending for determinism.
    fn task_less(&self, _state: &CycleState, a: &TaskInfo, b: &TaskInfo) -> Ordering {
        status_rank(b.status)
            .cmp(&status_rank(a.status))
            .then_with(|| a.uid.cmp(&b.uid))
    }
}
