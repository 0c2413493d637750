//! Scheduling plugins.
//!
//! Each capability is its own trait so the session can ask "who supplies
//! job ordering" without optional hooks. Plugins are stateless singletons;
//! per-cycle state goes through the [`CycleState`] blackboard.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Deserialize;

use crate::cycle_state::CycleState;
use crate::models::{JobInfo, Resource, TaskInfo};

pub mod drf;
pub mod gang;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Supplies the relative order of two jobs within a session.
pub trait JobOrderPlugin: Plugin {
    fn job_less(&self, state: &CycleState, a: &JobInfo, b: &JobInfo) -> Ordering;
}

/// Supplies the relative order of two tasks within one job.
pub trait TaskOrderPlugin: Plugin {
    fn task_less(&self, state: &CycleState, a: &TaskInfo, b: &TaskInfo) -> Ordering;
}

/// Overrides the readiness (gang-satisfied) decision for a job.
pub trait JobReadyPlugin: Plugin {
    fn job_ready(&self, state: &CycleState, job: &JobInfo) -> bool;
}

/// Maintains per-job share state: seeded once per session by decorate and
/// re-fired after every accepted allocation.
pub trait ShareUpdatePlugin: Plugin {
    fn init_job(&self, state: &mut CycleState, job: &JobInfo, cluster: &Resource);

    fn share_update(&self, state: &mut CycleState, job: &JobInfo, task: &TaskInfo, cluster: &Resource);
}

/// Enabled plugin names per capability, as configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Plugins {
    pub job_order: Vec<String>,
    pub task_order: Vec<String>,
    pub job_ready: Vec<String>,
    pub share_update: Vec<String>,
}

impl Default for Plugins {
    fn default() -> Self {
        Self {
            job_order: vec![drf::PLUGIN_NAME.to_string()],
            task_order: vec![gang::PLUGIN_NAME.to_string()],
            job_ready: vec![gang::PLUGIN_NAME.to_string()],
            share_update: vec![drf::PLUGIN_NAME.to_string()],
        }
    }
}

/// Process-wide defaults; enabling a subset for a session is configuration.
pub struct Registry {
    pub job_order: Vec<Arc<dyn JobOrderPlugin>>,
    pub task_order: Vec<Arc<dyn TaskOrderPlugin>>,
    pub job_ready: Vec<Arc<dyn JobReadyPlugin>>,
    pub share_update: Vec<Arc<dyn ShareUpdatePlugin>>,
}

impl Default for Registry {
    fn default() -> Self {
        let drf = Arc::new(drf::Drf);
        let gang = Arc::new(gang::Gang);
        Self {
            job_order: vec![drf.clone() as Arc<dyn JobOrderPlugin>],
            task_order: vec![gang.clone() as Arc<dyn TaskOrderPlugin>],
            job_ready: vec![gang as Arc<dyn JobReadyPlugin>],
            share_update: vec![drf as Arc<dyn ShareUpdatePlugin>],
        }
    }
}

/// The resolved, session-ready plugin sets. Composition within a capability
/// is lexicographic in registration order.
#[derive(Clone, Default)]
pub struct EnabledPlugins {
    pub job_order: Vec<Arc<dyn JobOrderPlugin>>,
    pub task_order: Vec<Arc<dyn TaskOrderPlugin>>,
    pub job_ready: Vec<Arc<dyn JobReadyPlugin>>,
    pub share_update: Vec<Arc<dyn ShareUpdatePlugin>>,
}
