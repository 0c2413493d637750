use std::collections::HashMap;

use log::{debug, warn};

use crate::config::SpecDeletePolicy;
use crate::error::SchedulerError;
use crate::models::{
    Binding, Deleted, DisruptionBudget, JobId, JobInfo, Node, NodeInfo, Pod, SchedulingSpec,
    TaskInfo, TaskStatus,
};

/// A consistent deep copy of the cache, safe to iterate while the cache
/// keeps mutating. Sessions own one of these.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub jobs: HashMap<JobId, JobInfo>,
    pub nodes: HashMap<String, NodeInfo>,
    pub scheduling_specs: HashMap<JobId, SchedulingSpec>,
    pub pdbs: HashMap<JobId, DisruptionBudget>,
}

/// Event-driven view of the cluster. Plain single-writer struct; the
/// scheduler facade wraps it in a lock and every method assumes the lock is
/// held. Sinks never block on anything but that lock.
///
/// SchedulingSpecs and DisruptionBudgets live in side tables keyed by the
/// owning controller uid; they are joined onto jobs during decorate, not
/// here.
#[derive(Debug, Default, PartialEq)]
pub struct SchedulerCache {
    jobs: HashMap<JobId, JobInfo>,
    nodes: HashMap<String, NodeInfo>,
    scheduling_specs: HashMap<JobId, SchedulingSpec>,
    pdbs: HashMap<JobId, DisruptionBudget>,
    spec_delete_policy: SpecDeletePolicy,
}

impl SchedulerCache {
    pub fn new(spec_delete_policy: SpecDeletePolicy) -> Self {
        Self {
            spec_delete_policy,
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> &HashMap<JobId, JobInfo> {
        &self.jobs
    }

    pub fn nodes(&self) -> &HashMap<String, NodeInfo> {
        &self.nodes
    }

    /// Add (or re-add) a task. Delete-then-add gives replacement semantics,
    /// so a duplicated Add event cannot double-count the task.
    pub fn add_pod(&mut self, pod: &Pod) {
        let task = TaskInfo::new(pod);

        if task.job.is_empty() {
            warn!(
                "the controller of pod {}/{} is empty, can not schedule it",
                pod.namespace, pod.name
            );
        } else {
            let job = self
                .jobs
                .entry(task.job.clone())
                .or_insert_with(|| JobInfo::new(task.job.clone()));
            job.delete_task_info(&task.uid);
            job.add_task_info(task.clone());
        }

        if !task.node_name.is_empty() {
            debug!(
                "add task {}/{} into host {}",
                task.namespace, task.name, task.node_name
            );
            let node = self
                .nodes
                .entry(task.node_name.clone())
                .or_insert_with(|| NodeInfo::placeholder(&task.node_name));
            node.remove_task(&task.uid);
            if !task.status.is_terminated() {
                node.add_task(task);
            }
        }
    }

    /// An update for an unknown task degenerates to an add.
    pub fn update_pod(&mut self, old: &Pod, new: &Pod) {
        self.remove_pod(old);
        self.add_pod(new);
    }

    pub fn delete_pod(&mut self, deleted: &Deleted<Pod>) {
        self.remove_pod(deleted.object());
    }

    fn remove_pod(&mut self, pod: &Pod) {
        let task = TaskInfo::new(pod);

        if !task.job.is_empty() {
            if let Some(job) = self.jobs.get_mut(&task.job) {
                job.delete_task_info(&task.uid);
                self.collect_job(&task.job);
            } else {
                warn!(
                    "failed to find job {} for task {}/{}",
                    task.job, task.namespace, task.name
                );
            }
        }

        if !task.node_name.is_empty() {
            if let Some(node) = self.nodes.get_mut(&task.node_name) {
                debug!(
                    "delete task {}/{} from host {}",
                    task.namespace, task.name, task.node_name
                );
                node.remove_task(&task.uid);
            }
        }
    }

    pub fn add_node(&mut self, node: &Node) {
        match self.nodes.get_mut(&node.name) {
            Some(info) => info.set_node(node),
            None => {
                self.nodes.insert(node.name.clone(), NodeInfo::new(node));
            }
        }
    }

    /// Node updates mutate in place so task references stay valid. Unlike
    /// tasks, an update for an unknown node is an error: the node must come
    /// from its own stream, or ordering bugs would be masked.
    pub fn update_node(&mut self, _old: &Node, new: &Node) -> Result<(), SchedulerError> {
        match self.nodes.get_mut(&new.name) {
            Some(info) => {
                info.set_node(new);
                Ok(())
            }
            None => Err(SchedulerError::MissingNode(new.name.clone())),
        }
    }

    pub fn delete_node(&mut self, deleted: &Deleted<Node>) {
        let node = deleted.object();
        if self.nodes.remove(&node.name).is_none() {
            warn!("delete event for unknown node {}", node.name);
        }
    }

    pub fn set_scheduling_spec(&mut self, spec: &SchedulingSpec) -> Result<(), SchedulerError> {
        if spec.owner_uid.is_empty() {
            return Err(SchedulerError::EmptyOwner {
                kind: "SchedulingSpec",
                name: spec.name.clone(),
            });
        }
        self.jobs
            .entry(spec.owner_uid.clone())
            .or_insert_with(|| JobInfo::new(spec.owner_uid.clone()));
        self.scheduling_specs
            .insert(spec.owner_uid.clone(), spec.clone());
        Ok(())
    }

    pub fn delete_scheduling_spec(&mut self, deleted: &Deleted<SchedulingSpec>) {
        let spec = deleted.object();
        match self.spec_delete_policy {
            SpecDeletePolicy::Ignore => {
                debug!(
                    "ignoring delete of SchedulingSpec {} for job {}",
                    spec.name, spec.owner_uid
                );
            }
            SpecDeletePolicy::Detach => {
                self.scheduling_specs.remove(&spec.owner_uid);
                self.collect_job(&spec.owner_uid);
            }
        }
    }

    pub fn set_pdb(&mut self, pdb: &DisruptionBudget) -> Result<(), SchedulerError> {
        if pdb.owner_uid.is_empty() {
            return Err(SchedulerError::EmptyOwner {
                kind: "DisruptionBudget",
                name: pdb.name.clone(),
            });
        }
        self.jobs
            .entry(pdb.owner_uid.clone())
            .or_insert_with(|| JobInfo::new(pdb.owner_uid.clone()));
        self.pdbs.insert(pdb.owner_uid.clone(), pdb.clone());
        Ok(())
    }

    pub fn delete_pdb(&mut self, deleted: &Deleted<DisruptionBudget>) {
        let pdb = deleted.object();
        match self.spec_delete_policy {
            SpecDeletePolicy::Ignore => {
                debug!(
                    "ignoring delete of DisruptionBudget {} for job {}",
                    pdb.name, pdb.owner_uid
                );
            }
            SpecDeletePolicy::Detach => {
                self.pdbs.remove(&pdb.owner_uid);
                self.collect_job(&pdb.owner_uid);
            }
        }
    }

    /// A job stays alive while anything references it: tasks, a spec, or a
    /// budget.
    fn collect_job(&mut self, uid: &JobId) {
        let empty = self.jobs.get(uid).is_some_and(|j| j.is_empty());
        if empty && !self.scheduling_specs.contains_key(uid) && !self.pdbs.contains_key(uid) {
            self.jobs.remove(uid);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            jobs: self.jobs.clone(),
            nodes: self.nodes.clone(),
            scheduling_specs: self.scheduling_specs.clone(),
            pdbs: self.pdbs.clone(),
        }
    }

    /// Apply bindings accepted by a closed session: the task becomes
    /// Allocated and the node's idle shrinks, so the next cycle does not
    /// place it again. Anything that disappeared since the snapshot is
    /// skipped; the event streams will reconcile it.
    pub fn commit(&mut self, bindings: &[Binding]) {
        for binding in bindings {
            let Some(task) = self
                .jobs
                .get_mut(&binding.job_uid)
                .and_then(|job| job.tasks.get_mut(&binding.task_uid))
            else {
                warn!(
                    "commit: task {} of job {} is gone, skipping",
                    binding.task_uid, binding.job_uid
                );
                continue;
            };
            task.status = TaskStatus::Allocated;
            task.node_name = binding.node_name.clone();
            let task = task.clone();

            match self.nodes.get_mut(&binding.node_name) {
                Some(node) => {
                    node.remove_task(&task.uid);
                    node.add_task(task);
                }
                None => {
                    warn!(
                        "commit: node {} is gone, task {} left Allocated without a host entry",
                        binding.node_name, binding.task_uid
                    );
                }
            }
        }
    }
}
