//! Dominant Resource Fairness.
//!
//! A job's dominant share is the largest fraction of cluster capacity its
//! current allocation takes in any single resource dimension. Ordering jobs
//! by ascending dominant share makes the allocator serve the most starved
//! job next.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::cycle_state::CycleState;
use crate::models::{JobId, JobInfo, Resource, TaskInfo};
use crate::plugins::{JobOrderPlugin, Plugin, ShareUpdatePlugin};

pub const PLUGIN_NAME: &str = "drf";

const DRF_STATE_KEY: &str = "DrfAttrs";

pub struct Drf;

#[derive(Default)]
struct DrfState {
    shares: HashMap<JobId, f64>,
}

fn dominant_share(allocated: &Resource, cluster: &Resource) -> f64 {
    let mut share = 0.0f64;
    if cluster.cpu > 0 {
        share = share.max(allocated.cpu as f64 / cluster.cpu as f64);
    }
    if cluster.memory > 0 {
        share = share.max(allocated.memory as f64 / cluster.memory as f64);
    }
    share
}

fn store_share(state: &mut CycleState, job: &JobInfo, cluster: &Resource) {
    let share = dominant_share(&job.allocated(), cluster);
    match state.read_mut::<DrfState>(DRF_STATE_KEY) {
        Some(attrs) => {
            attrs.shares.insert(job.uid.clone(), share);
        }
        None => {
            let mut attrs = DrfState::default();
            attrs.shares.insert(job.uid.clone(), share);
            state.write(DRF_STATE_KEY, Box::new(attrs));
        }
    }
}

impl Plugin for Drf {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }
}

impl ShareUpdatePlugin for Drf {
    fn init_job(&self, state: &mut CycleState, job: &JobInfo, cluster: &Resource) {
        store_share(state, job, cluster);
    }

    fn share_update(
        &self,
        state: &mut CycleState,
        job: &JobInfo,
        _task: &TaskInfo,
        cluster: &Resource,
    ) {
        store_share(state, job, cluster);
    }
}

impl JobOrderPlugin for Drf {
    fn job_less(&self, state: &CycleState, a: &JobInfo, b: &JobInfo) -> Ordering {
        let Some(attrs) = state.read::<DrfState>(DRF_STATE_KEY) else {
            return Ordering::Equal;
        };
        let share_a = attrs.shares.get(&a.uid).copied().unwrap_or(0.0);
        let share_b = attrs.shares.get(&b.uid).copied().unwrap_or(0.0);
        share_a
            .partial_cmp(&share_b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.uid.cmp(&b.uid))
    }
}
