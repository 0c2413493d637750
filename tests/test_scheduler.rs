use std::sync::Mutex;

use async_trait::async_trait;
use libbatchsched::config::SchedulerConfig;
use libbatchsched::error::BindError;
use libbatchsched::framework::BindingWriter;
use libbatchsched::models::{Deleted, Node, Pod, PodPhase, Resource, SchedulingSpec};
use libbatchsched::scheduler::Scheduler;

const GI: u64 = 1024 * 1024 * 1024;

fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

struct RecordingWriter {
    bound: Mutex<Vec<(String, String)>>,
}

impl RecordingWriter {
    fn new() -> Self {
        Self {
            bound: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.bound.lock().unwrap().clone()
    }
}

#[async_trait]
impl BindingWriter for RecordingWriter {
    async fn bind(&self, task_uid: &str, node_name: &str) -> Result<(), BindError> {
        self.bound
            .lock()
            .unwrap()
            .push((task_uid.to_string(), node_name.to_string()));
        Ok(())
    }
}

fn make_pod(uid: &str, job: &str, cpu: u64, memory: u64) -> Pod {
    Pod {
        uid: uid.to_string(),
        namespace: "default".to_string(),
        name: uid.to_string(),
        owner_uid: job.to_string(),
        resources: Resource::new(cpu, memory),
        ..Default::default()
    }
}

fn make_node(name: &str, cpu: u64, memory: u64) -> Node {
    Node {
        name: name.to_string(),
        capacity: Resource::new(cpu, memory),
        allocatable: Resource::new(cpu, memory),
    }
}

fn make_spec(job: &str, min_available: usize) -> SchedulingSpec {
    SchedulingSpec {
        owner_uid: job.to_string(),
        name: format!("{job}-spec"),
        min_available,
        queue: "default".to_string(),
    }
}

#[tokio::test]
async fn test_simple_placement() {
    init_logger();
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 4000, 8 * GI)).await;
    scheduler.add_pod(&make_pod("t1", "j1", 1000, GI)).await;
    scheduler.add_scheduling_spec(&make_spec("j1", 1)).await;

    let writer = RecordingWriter::new();
    let bound = scheduler.run_once(&writer).await;

    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].task_uid, "t1");
    assert_eq!(bound[0].node_name, "n1");
    assert_eq!(writer.calls(), vec![("t1".to_string(), "n1".to_string())]);
}

#[tokio::test]
async fn test_gang_all_or_nothing() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 2000, 4 * GI)).await;
    for i in 1..=3 {
        scheduler.add_pod(&make_pod(&format!("t{i}"), "j1", 1000, GI)).await;
    }
    scheduler.add_scheduling_spec(&make_spec("j1", 3)).await;

    let writer = RecordingWriter::new();
    let bound = scheduler.run_once(&writer).await;

    assert!(bound.is_empty());
    assert!(writer.calls().is_empty());

    // nothing was committed either: a third node's worth of capacity later
    // lets the whole gang through
    scheduler.add_node(&make_node("n2", 2000, 4 * GI)).await;
    let bound = scheduler.run_once(&writer).await;
    assert_eq!(bound.len(), 3);
}

#[tokio::test]
async fn test_drf_fairness_interleaves_jobs() {
    init_logger();
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 8000, 64 * GI)).await;
    for job in ["j1", "j2"] {
        for i in 1..=4 {
            scheduler
                .add_pod(&make_pod(&format!("{job}-t{i}"), job, 1000, GI))
                .await;
        }
        scheduler.add_scheduling_spec(&make_spec(job, 1)).await;
    }

    let writer = RecordingWriter::new();
    let bound = scheduler.run_once(&writer).await;

    let order: Vec<&str> = bound.iter().map(|b| b.task_uid.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "j1-t1", "j2-t1", "j1-t2", "j2-t2", "j1-t3", "j2-t3", "j1-t4", "j2-t4"
        ]
    );
}

#[tokio::test]
async fn test_duplicate_add_counts_once() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 4000, 8 * GI)).await;
    let pod = make_pod("t1", "j1", 1000, GI);
    scheduler.add_pod(&pod).await;
    scheduler.add_pod(&pod).await;

    let writer = RecordingWriter::new();
    let bound = scheduler.run_once(&writer).await;
    assert_eq!(bound.len(), 1);

    // a second cycle finds nothing left to place
    let bound = scheduler.run_once(&writer).await;
    assert!(bound.is_empty());
}

#[tokio::test]
async fn test_terminal_task_not_counted() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 4000, 8 * GI)).await;

    let mut done = make_pod("t1", "j1", 4000, 8 * GI);
    done.node_name = "n1".to_string();
    done.phase = PodPhase::Succeeded;
    scheduler.add_pod(&done).await;

    // the finished task holds nothing, so a full-node task still fits
    scheduler.add_pod(&make_pod("t2", "j2", 4000, 8 * GI)).await;

    let writer = RecordingWriter::new();
    let bound = scheduler.run_once(&writer).await;
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].task_uid, "t2");
}

#[tokio::test]
async fn test_tombstone_delete() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    scheduler.add_node(&make_node("n1", 4000, 8 * GI)).await;

    let mut pod = make_pod("t1", "j1", 4000, 8 * GI);
    pod.node_name = "n1".to_string();
    pod.phase = PodPhase::Running;
    scheduler.add_pod(&pod).await;

    // while t1 occupies the node, nothing else fits
    scheduler.add_pod(&make_pod("t2", "j2", 4000, 8 * GI)).await;
    let writer = RecordingWriter::new();
    assert!(scheduler.run_once(&writer).await.is_empty());

    scheduler.delete_pod(&Deleted::Tombstone(pod)).await;
    let bound = scheduler.run_once(&writer).await;
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].task_uid, "t2");
}

#[tokio::test]
async fn test_run_loop_delivers_bindings() {
    use std::sync::Arc;
    use tokio::time::{Duration, timeout};

    let mut config = SchedulerConfig::default();
    config.schedule_period_ms = 10;
    let scheduler = Scheduler::new(config);
    scheduler.add_node(&make_node("n1", 4000, 8 * GI)).await;
    scheduler.add_pod(&make_pod("t1", "j1", 1000, GI)).await;

    let mut rx = scheduler.run(Arc::new(RecordingWriter::new()));
    let binding = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(binding.task_uid, "t1");
    assert_eq!(binding.node_name, "n1");

    // events keep flowing while the loop runs
    scheduler.add_pod(&make_pod("t2", "j1", 1000, GI)).await;
    let binding = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(binding.task_uid, "t2");
}
