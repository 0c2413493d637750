use std::collections::HashMap;

pub type TaskId = String;
pub type JobId = String;

/// A resource vector over the dimensions the scheduler arbitrates.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Resource {
    /// CPU, measured in millicores.
    pub cpu: u64,
    /// Memory, measured in bytes.
    pub memory: u64,
}

impl Resource {
    pub fn new(cpu: u64, memory: u64) -> Self {
        Self { cpu, memory }
    }

    pub fn add(&mut self, other: &Resource) {
        self.cpu += other.cpu;
        self.memory += other.memory;
    }

    /// Componentwise subtraction, saturating at zero.
    pub fn sub(&mut self, other: &Resource) {
        self.cpu = self.cpu.saturating_sub(other.cpu);
        self.memory = self.memory.saturating_sub(other.memory);
    }

    /// True iff every component of `self` fits within `capacity`.
    pub fn fits(&self, capacity: &Resource) -> bool {
        self.cpu <= capacity.cpu && self.memory <= capacity.memory
    }

    pub fn is_empty(&self) -> bool {
        self.cpu == 0 && self.memory == 0
    }
}

/// Upstream lifecycle phase of a pod-like object.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// Inbound unit of work, as delivered by the task event stream.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Pod {
    pub uid: TaskId,
    pub namespace: String,
    pub name: String,
    /// UID of the owning controller. Empty means the task is untracked and
    /// cannot be scheduled.
    pub owner_uid: JobId,
    pub resources: Resource,
    /// Assigned node, empty until placed.
    pub node_name: String,
    pub phase: PodPhase,
}

/// Inbound compute host, as delivered by the node event stream.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub capacity: Resource,
    pub allocatable: Resource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Allocated,
    Bound,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl TaskStatus {
    /// The single place upstream phase is interpreted into scheduler status.
    pub fn derive(phase: PodPhase, node_name: &str) -> Self {
        match phase {
            PodPhase::Succeeded => TaskStatus::Succeeded,
            PodPhase::Failed => TaskStatus::Failed,
            PodPhase::Unknown => TaskStatus::Unknown,
            PodPhase::Running if !node_name.is_empty() => TaskStatus::Running,
            PodPhase::Pending if !node_name.is_empty() => TaskStatus::Bound,
            _ => TaskStatus::Pending,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// Statuses that count toward a job's gang floor.
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            TaskStatus::Allocated | TaskStatus::Bound | TaskStatus::Running
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskInfo {
    pub uid: TaskId,
    /// Owning job id; empty when the task is untracked.
    pub job: JobId,
    pub namespace: String,
    pub name: String,
    pub resreq: Resource,
    pub node_name: String,
    pub status: TaskStatus,
}

impl TaskInfo {
    pub fn new(pod: &Pod) -> Self {
        Self {
            uid: pod.uid.clone(),
            job: pod.owner_uid.clone(),
            namespace: pod.namespace.clone(),
            name: pod.name.clone(),
            resreq: pod.resources,
            node_name: pod.node_name.clone(),
            status: TaskStatus::derive(pod.phase, &pod.node_name),
        }
    }
}

/// Gang-scheduling spec attached to a job by its controller uid.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct SchedulingSpec {
    pub owner_uid: JobId,
    pub name: String,
    pub min_available: usize,
    pub queue: String,
}

/// Disruption budget attached to a job by its controller uid. Its policy
/// semantics live outside the core; the scheduler only carries it.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct DisruptionBudget {
    pub owner_uid: JobId,
    pub name: String,
    pub min_available: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobInfo {
    pub uid: JobId,
    pub tasks: HashMap<TaskId, TaskInfo>,
    pub scheduling_spec: Option<SchedulingSpec>,
    pub pdb: Option<DisruptionBudget>,
    /// Sum of all member task requests, maintained incrementally.
    pub total_request: Resource,
}

impl JobInfo {
    pub fn new(uid: JobId) -> Self {
        Self {
            uid,
            tasks: HashMap::new(),
            scheduling_spec: None,
            pdb: None,
            total_request: Resource::default(),
        }
    }

    pub fn add_task_info(&mut self, task: TaskInfo) {
        self.total_request.add(&task.resreq);
        self.tasks.insert(task.uid.clone(), task);
    }

    pub fn delete_task_info(&mut self, uid: &str) -> Option<TaskInfo> {
        let removed = self.tasks.remove(uid);
        if let Some(task) = &removed {
            self.total_request.sub(&task.resreq);
        }
        removed
    }

    pub fn set_scheduling_spec(&mut self, spec: SchedulingSpec) {
        self.scheduling_spec = Some(spec);
    }

    pub fn set_pdb(&mut self, pdb: DisruptionBudget) {
        self.pdb = Some(pdb);
    }

    /// Gang floor: the spec value when one is attached, otherwise every task
    /// of the job (all-or-nothing).
    pub fn min_available(&self) -> usize {
        match &self.scheduling_spec {
            Some(spec) => spec.min_available,
            None => self.tasks.len(),
        }
    }

    /// Count of tasks at Allocated or better, excluding terminal ones.
    pub fn ready_task_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.status.is_scheduled())
            .count()
    }

    pub fn pending_tasks(&self) -> Vec<&TaskInfo> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect()
    }

    /// Sum of requests of tasks currently holding resources somewhere.
    pub fn allocated(&self) -> Resource {
        let mut res = Resource::default();
        for task in self.tasks.values().filter(|t| t.status.is_scheduled()) {
            res.add(&task.resreq);
        }
        res
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub capacity: Resource,
    pub allocatable: Resource,
    /// Sum of requests of the tasks assigned here.
    pub used: Resource,
    /// `allocatable - used`, never negative.
    pub idle: Resource,
    pub tasks: HashMap<TaskId, TaskInfo>,
}

impl NodeInfo {
    pub fn new(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            capacity: node.capacity,
            allocatable: node.allocatable,
            used: Resource::default(),
            idle: node.allocatable,
            tasks: HashMap::new(),
        }
    }

    /// A node known only from task events; zero capacity until the node
    /// stream delivers the real object.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capacity: Resource::default(),
            allocatable: Resource::default(),
            used: Resource::default(),
            idle: Resource::default(),
            tasks: HashMap::new(),
        }
    }

    /// In-place update so task references into this node stay valid.
    pub fn set_node(&mut self, node: &Node) {
        self.name = node.name.clone();
        self.capacity = node.capacity;
        self.allocatable = node.allocatable;
        self.idle = node.allocatable;
        self.idle.sub(&self.used);
    }

    pub fn add_task(&mut self, task: TaskInfo) {
        self.used.add(&task.resreq);
        self.idle.sub(&task.resreq);
        self.tasks.insert(task.uid.clone(), task);
    }

    pub fn remove_task(&mut self, uid: &str) -> Option<TaskInfo> {
        let removed = self.tasks.remove(uid);
        if let Some(task) = &removed {
            self.used.sub(&task.resreq);
            self.idle = self.allocatable;
            self.idle.sub(&self.used);
        }
        removed
    }
}

/// Delete-event envelope: the watch layer may only have a tombstone carrying
/// the last known object. Sinks treat both arms identically.
#[derive(Clone, Debug)]
pub enum Deleted<T> {
    Live(T),
    Tombstone(T),
}

impl<T> Deleted<T> {
    pub fn object(&self) -> &T {
        match self {
            Deleted::Live(obj) | Deleted::Tombstone(obj) => obj,
        }
    }
}

/// An accepted placement awaiting materialization by the binding writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub task_uid: TaskId,
    pub job_uid: JobId,
    pub node_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_sub_saturates() {
        let mut res = Resource::new(1000, 1024);
        res.sub(&Resource::new(3000, 512));
        assert_eq!(res, Resource::new(0, 512));
    }

    #[test]
    fn test_resource_fits_is_componentwise() {
        let cap = Resource::new(2000, 4096);
        assert!(Resource::new(2000, 4096).fits(&cap));
        assert!(Resource::new(0, 0).fits(&cap));
        assert!(!Resource::new(2001, 0).fits(&cap));
        assert!(!Resource::new(0, 4097).fits(&cap));
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(
            TaskStatus::derive(PodPhase::Pending, ""),
            TaskStatus::Pending
        );
        assert_eq!(
            TaskStatus::derive(PodPhase::Pending, "n1"),
            TaskStatus::Bound
        );
        assert_eq!(
            TaskStatus::derive(PodPhase::Running, "n1"),
            TaskStatus::Running
        );
        // a running phase without a node cannot be trusted yet
        assert_eq!(
            TaskStatus::derive(PodPhase::Running, ""),
            TaskStatus::Pending
        );
        assert_eq!(
            TaskStatus::derive(PodPhase::Succeeded, "n1"),
            TaskStatus::Succeeded
        );
        assert_eq!(TaskStatus::derive(PodPhase::Failed, ""), TaskStatus::Failed);
        assert_eq!(
            TaskStatus::derive(PodPhase::Unknown, "n1"),
            TaskStatus::Unknown
        );
    }

    #[test]
    fn test_job_min_available_defaults_to_task_count() {
        let mut job = JobInfo::new("j1".to_string());
        for i in 0..3 {
            job.add_task_info(TaskInfo::new(&Pod {
                uid: format!("t{i}"),
                owner_uid: "j1".to_string(),
                resources: Resource::new(100, 100),
                ..Default::default()
            }));
        }
        assert_eq!(job.min_available(), 3);

        job.set_scheduling_spec(SchedulingSpec {
            owner_uid: "j1".to_string(),
            min_available: 2,
            ..Default::default()
        });
        assert_eq!(job.min_available(), 2);
    }

    #[test]
    fn test_job_total_request_tracks_membership() {
        let mut job = JobInfo::new("j1".to_string());
        let pod = Pod {
            uid: "t1".to_string(),
            owner_uid: "j1".to_string(),
            resources: Resource::new(500, 1024),
            ..Default::default()
        };
        job.add_task_info(TaskInfo::new(&pod));
        assert_eq!(job.total_request, Resource::new(500, 1024));
        job.delete_task_info("t1");
        assert_eq!(job.total_request, Resource::default());
        // deleting an absent task is tolerated
        assert!(job.delete_task_info("t1").is_none());
    }

    #[test]
    fn test_node_accounting_round_trips() {
        let node = Node {
            name: "n1".to_string(),
            capacity: Resource::new(4000, 8192),
            allocatable: Resource::new(4000, 8192),
        };
        let mut info = NodeInfo::new(&node);
        let task = TaskInfo::new(&Pod {
            uid: "t1".to_string(),
            owner_uid: "j1".to_string(),
            resources: Resource::new(1000, 2048),
            node_name: "n1".to_string(),
            phase: PodPhase::Running,
            ..Default::default()
        });
        info.add_task(task);
        assert_eq!(info.idle, Resource::new(3000, 6144));
        info.remove_task("t1");
        assert_eq!(info.idle, info.allocatable);
        assert_eq!(info.used, Resource::default());
    }

    #[test]
    fn test_placeholder_node_fills_in_later() {
        let mut info = NodeInfo::placeholder("n1");
        info.add_task(TaskInfo::new(&Pod {
            uid: "t1".to_string(),
            owner_uid: "j1".to_string(),
            resources: Resource::new(1000, 1024),
            node_name: "n1".to_string(),
            phase: PodPhase::Running,
            ..Default::default()
        }));
        assert_eq!(info.idle, Resource::default());

        info.set_node(&Node {
            name: "n1".to_string(),
            capacity: Resource::new(4000, 8192),
            allocatable: Resource::new(4000, 8192),
        });
        assert_eq!(info.idle, Resource::new(3000, 7168));
        assert!(info.tasks.contains_key("t1"));
    }
}
