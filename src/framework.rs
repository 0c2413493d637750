use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, error, trace, warn};
use tokio::time::{Duration, Instant};

use crate::actions::Action;
use crate::cache::Snapshot;
use crate::cycle_state::CycleState;
use crate::error::{BindError, SchedulerError};
use crate::models::{
    Binding, DisruptionBudget, JobId, JobInfo, NodeInfo, Resource, SchedulingSpec, TaskInfo,
    TaskStatus,
};
use crate::plugins::EnabledPlugins;

/// Materializes accepted placements at the external boundary. The session
/// flushes through it on close; it is the commit point for the cache.
#[async_trait]
pub trait BindingWriter: Send + Sync {
    async fn bind(&self, task_uid: &str, node_name: &str) -> Result<(), BindError>;
}

/// One bounded scheduling attempt over an immutable copy of cluster state.
///
/// The session owns its snapshot: actions mutate jobs and nodes here and
/// nothing touches the live cache until the accepted bindings are committed
/// back by the scheduling loop.
pub struct Session {
    pub jobs: HashMap<JobId, JobInfo>,
    pub nodes: HashMap<String, NodeInfo>,
    pub scheduling_specs: HashMap<JobId, SchedulingSpec>,
    pub pdbs: HashMap<JobId, DisruptionBudget>,
    /// Total allocatable across the snapshot, fixed at open.
    pub cluster: Resource,
    pub state: CycleState,
    plugins: EnabledPlugins,
    bindings: Vec<Binding>,
    deadline: Option<Instant>,
}

impl Session {
    pub fn open(snapshot: Snapshot, plugins: EnabledPlugins, deadline: Option<Duration>) -> Self {
        let mut cluster = Resource::default();
        for node in snapshot.nodes.values() {
            cluster.add(&node.allocatable);
        }
        Self {
            jobs: snapshot.jobs,
            nodes: snapshot.nodes,
            scheduling_specs: snapshot.scheduling_specs,
            pdbs: snapshot.pdbs,
            cluster,
            state: CycleState::default(),
            plugins,
            bindings: Vec::new(),
            deadline: deadline.map(|d| Instant::now() + d),
        }
    }

    /// Actions poll this between jobs and stop cleanly on expiry;
    /// already-buffered bindings survive.
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Composed job ordering: first non-equal plugin verdict wins, uid
    /// ascending as the final tie break so the order is always total.
    pub fn job_less(&self, a: &JobInfo, b: &JobInfo) -> Ordering {
        for plugin in &self.plugins.job_order {
            match plugin.job_less(&self.state, a, b) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        a.uid.cmp(&b.uid)
    }

    pub fn task_less(&self, a: &TaskInfo, b: &TaskInfo) -> Ordering {
        for plugin in &self.plugins.task_order {
            match plugin.task_less(&self.state, a, b) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        a.uid.cmp(&b.uid)
    }

    /// Gang satisfaction: every job-ready plugin must agree. Without any,
    /// the builtin floor rule applies.
    pub fn job_ready(&self, job: &JobInfo) -> bool {
        if self.plugins.job_ready.is_empty() {
            return job.ready_task_count() >= job.min_available();
        }
        self.plugins
            .job_ready
            .iter()
            .all(|p| p.job_ready(&self.state, job))
    }

    /// Seed per-job plugin state; decorate calls this once the side tables
    /// are joined.
    pub fn init_plugin_state(&mut self) {
        let cluster = self.cluster;
        for job in self.jobs.values() {
            for plugin in &self.plugins.share_update {
                plugin.init_job(&mut self.state, job, &cluster);
            }
        }
    }

    /// Accept a placement: validate fit, consume node idle, mark the task
    /// Allocated, buffer the binding, and let share plugins observe it.
    pub fn allocate(
        &mut self,
        job_uid: &str,
        task_uid: &str,
        node_name: &str,
    ) -> Result<(), SchedulerError> {
        let node = self
            .nodes
            .get_mut(node_name)
            .ok_or_else(|| SchedulerError::MissingNode(node_name.to_string()))?;
        let job = self
            .jobs
            .get_mut(job_uid)
            .ok_or_else(|| SchedulerError::UnknownJob(job_uid.to_string()))?;
        let task = job
            .tasks
            .get_mut(task_uid)
            .ok_or_else(|| SchedulerError::UnknownTask(task_uid.to_string()))?;

        if !task.resreq.fits(&node.idle) {
            return Err(SchedulerError::InsufficientResources {
                task: task_uid.to_string(),
                node: node_name.to_string(),
            });
        }

        task.status = TaskStatus::Allocated;
        task.node_name = node_name.to_string();
        let task = task.clone();
        node.add_task(task.clone());
        self.bindings.push(Binding {
            task_uid: task.uid.clone(),
            job_uid: job_uid.to_string(),
            node_name: node_name.to_string(),
        });
        debug!(
            "allocated task {}/{} of job {} to node {}",
            task.namespace, task.name, job_uid, node_name
        );

        let job = &*job;
        let cluster = self.cluster;
        for plugin in &self.plugins.share_update {
            plugin.share_update(&mut self.state, job, &task, &cluster);
        }
        Ok(())
    }

    /// Run the action pipeline in order over this session.
    pub fn run_actions(&mut self, actions: &[Box<dyn Action>]) {
        for action in actions {
            trace!("running action {}", action.name());
            action.execute(self);
        }
    }

    pub fn pending_bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Drain the buffer through the writer. Returns the bindings that were
    /// actually written (the only ones eligible for cache commit) and the
    /// retryable failures; fatal failures are logged and dropped.
    pub async fn close(
        mut self,
        writer: &dyn BindingWriter,
    ) -> (Vec<Binding>, Vec<(Binding, BindError)>) {
        let mut bound = Vec::new();
        let mut failed = Vec::new();
        for binding in self.bindings.drain(..) {
            match writer.bind(&binding.task_uid, &binding.node_name).await {
                Ok(()) => bound.push(binding),
                Err(err @ BindError::Retryable(_)) => {
                    warn!(
                        "binding task {} to node {} failed, will retry next cycle: {err}",
                        binding.task_uid, binding.node_name
                    );
                    failed.push((binding, err));
                }
                Err(err @ BindError::Fatal(_)) => {
                    error!(
                        "binding task {} to node {} failed permanently: {err}",
                        binding.task_uid, binding.node_name
                    );
                }
            }
        }
        (bound, failed)
    }
}
