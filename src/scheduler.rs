use std::sync::Arc;

use anyhow::anyhow;
use log::{debug, error, warn};
use tokio::sync::RwLock;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::interval;

use crate::actions::{Action, default_actions};
use crate::cache::SchedulerCache;
use crate::config::SchedulerConfig;
use crate::error::{BindError, SchedulerError};
use crate::framework::{BindingWriter, Session};
use crate::models::{Binding, Deleted, DisruptionBudget, Node, Pod, SchedulingSpec};
use crate::plugins::{EnabledPlugins, Plugins, Registry};

/// Resolve configured plugin names against the registry, keeping
/// registration order within each capability.
pub fn resolve_plugins(registry: &Registry, plugins: &Plugins) -> EnabledPlugins {
    let mut enabled = EnabledPlugins::default();

    macro_rules! enable_plugins {
        ($capability:ident) => {
            for name in plugins.$capability.iter() {
                match registry.$capability.iter().find(|p| p.name() == name) {
                    Some(plugin) => enabled.$capability.push(plugin.clone()),
                    None => warn!(
                        "unknown {} plugin {name}, skipping",
                        stringify!($capability)
                    ),
                }
            }
        };
    }

    enable_plugins!(job_order);
    enable_plugins!(task_order);
    enable_plugins!(job_ready);
    enable_plugins!(share_update);

    enabled
}

/// Facade over the cache and the scheduling loop. Event sinks take the
/// cache-wide write lock and return in bounded time; the loop thread is the
/// only place sessions run, and the binding writer is its only I/O.
#[derive(Clone)]
pub struct Scheduler {
    cache: Arc<RwLock<SchedulerCache>>,
    enabled_plugins: EnabledPlugins,
    actions: Arc<Vec<Box<dyn Action>>>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let registry = Registry::default();
        let enabled_plugins = resolve_plugins(&registry, &config.plugins);
        Self {
            cache: Arc::new(RwLock::new(SchedulerCache::new(config.spec_delete_policy))),
            enabled_plugins,
            actions: Arc::new(default_actions()),
            config,
        }
    }

    pub async fn add_pod(&self, pod: &Pod) {
        debug!("add pod {}/{} into cache", pod.namespace, pod.name);
        self.cache.write().await.add_pod(pod);
    }

    pub async fn update_pod(&self, old: &Pod, new: &Pod) {
        debug!("update pod {}/{} in cache", new.namespace, new.name);
        self.cache.write().await.update_pod(old, new);
    }

    pub async fn delete_pod(&self, deleted: &Deleted<Pod>) {
        let pod = deleted.object();
        debug!("delete pod {}/{} from cache", pod.namespace, pod.name);
        self.cache.write().await.delete_pod(deleted);
    }

    pub async fn add_node(&self, node: &Node) {
        debug!("add node {} into cache", node.name);
        self.cache.write().await.add_node(node);
    }

    /// The one sink whose failure the caller sees: updating a node that was
    /// never added is reported, not repaired.
    pub async fn update_node(&self, old: &Node, new: &Node) -> Result<(), SchedulerError> {
        let result = self.cache.write().await.update_node(old, new);
        if let Err(err) = &result {
            warn!("failed to update node {} in cache: {err}", new.name);
        }
        result
    }

    pub async fn delete_node(&self, deleted: &Deleted<Node>) {
        debug!("delete node {} from cache", deleted.object().name);
        self.cache.write().await.delete_node(deleted);
    }

    pub async fn add_scheduling_spec(&self, spec: &SchedulingSpec) {
        if let Err(err) = self.cache.write().await.set_scheduling_spec(spec) {
            warn!("failed to add SchedulingSpec {} into cache: {err}", spec.name);
        }
    }

    pub async fn update_scheduling_spec(&self, _old: &SchedulingSpec, new: &SchedulingSpec) {
        if let Err(err) = self.cache.write().await.set_scheduling_spec(new) {
            warn!("failed to update SchedulingSpec {} in cache: {err}", new.name);
        }
    }

    pub async fn delete_scheduling_spec(&self, deleted: &Deleted<SchedulingSpec>) {
        self.cache.write().await.delete_scheduling_spec(deleted);
    }

    pub async fn add_pdb(&self, pdb: &DisruptionBudget) {
        if let Err(err) = self.cache.write().await.set_pdb(pdb) {
            warn!("failed to add DisruptionBudget {} into cache: {err}", pdb.name);
        }
    }

    pub async fn update_pdb(&self, _old: &DisruptionBudget, new: &DisruptionBudget) {
        if let Err(err) = self.cache.write().await.set_pdb(new) {
            warn!("failed to update DisruptionBudget {} in cache: {err}", new.name);
        }
    }

    pub async fn delete_pdb(&self, deleted: &Deleted<DisruptionBudget>) {
        self.cache.write().await.delete_pdb(deleted);
    }

    /// One full scheduling cycle: snapshot, run the pipeline, flush through
    /// the writer, commit what was written. Returns the committed bindings
    /// and the retryable writer failures; the latter redeliver naturally
    /// because their tasks stay Pending in the cache.
    async fn run_cycle(
        &self,
        writer: &dyn BindingWriter,
    ) -> (Vec<Binding>, Vec<(Binding, BindError)>) {
        let snapshot = self.cache.read().await.snapshot();
        let mut ssn = Session::open(
            snapshot,
            self.enabled_plugins.clone(),
            Some(self.config.session_deadline()),
        );

        ssn.run_actions(&self.actions);

        let (bound, failed) = ssn.close(writer).await;
        if !bound.is_empty() {
            self.cache.write().await.commit(&bound);
        }
        (bound, failed)
    }

    /// A single synchronous cycle, for callers that drive scheduling
    /// themselves. Returns the committed bindings.
    pub async fn run_once(&self, writer: &dyn BindingWriter) -> Vec<Binding> {
        self.run_cycle(writer).await.0
    }

    /// Spawn the periodic scheduling loop. Each committed binding is also
    /// surfaced on the returned channel; retryable writer failures are
    /// surfaced as errors. The loop never exits on a failed cycle.
    pub fn run(
        &self,
        writer: Arc<dyn BindingWriter>,
    ) -> UnboundedReceiver<Result<Binding, anyhow::Error>> {
        let (sx, rx) = unbounded_channel();
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut timer = interval(scheduler.config.schedule_period());
            loop {
                timer.tick().await;

                let (bound, failed) = scheduler.run_cycle(writer.as_ref()).await;
                for binding in bound {
                    if sx.send(Ok(binding)).is_err() {
                        return;
                    }
                }
                for (binding, err) in failed {
                    error!(
                        "binding task {} to node {} not committed: {err}",
                        binding.task_uid, binding.node_name
                    );
                    if sx
                        .send(Err(anyhow!(err).context(format!(
                            "binding task {} to node {}",
                            binding.task_uid, binding.node_name
                        ))))
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
        rx
    }
}
