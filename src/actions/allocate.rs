use std::collections::HashSet;

use log::{debug, warn};

use crate::actions::Action;
use crate::framework::Session;
use crate::models::{JobId, TaskInfo};

/// Hands out remaining pending tasks one allocation at a time, always to the
/// job the ordering plugins rank first. Re-ranking after every placement is
/// what interleaves jobs under DRF. Only gang-safe jobs (ready, or no floor)
/// participate; candidate nodes are tried name-ascending.
pub struct Allocate;

impl Allocate {
    /// The job the plugins would serve next, if any.
    fn next_job(&self, ssn: &Session, parked: &HashSet<JobId>) -> Option<JobId> {
        let mut best: Option<&JobId> = None;
        for (uid, job) in ssn.jobs.iter() {
            if parked.contains(uid) || job.pending_tasks().is_empty() {
                continue;
            }
            if job.min_available() > 0 && !ssn.job_ready(job) {
                continue;
            }
            match best {
                None => best = Some(uid),
                Some(current) => {
                    if ssn.job_less(job, &ssn.jobs[current]).is_lt() {
                        best = Some(uid);
                    }
                }
            }
        }
        best.cloned()
    }

    /// First (task, node) pair that fits, honoring task order and
    /// name-ascending node order.
    fn pick_placement(
        &self,
        ssn: &Session,
        uid: &JobId,
        node_names: &[String],
    ) -> Option<(String, String)> {
        let job = &ssn.jobs[uid];
        let mut pending: Vec<&TaskInfo> = job.pending_tasks();
        pending.sort_by(|a, b| ssn.task_less(a, b));
        for task in pending {
            for node_name in node_names {
                if let Some(node) = ssn.nodes.get(node_name)
                    && task.resreq.fits(&node.idle)
                {
                    return Some((task.uid.clone(), node_name.clone()));
                }
            }
        }
        None
    }
}

impl Action for Allocate {
    fn name(&self) -> &str {
        "allocate"
    }

    fn execute(&self, ssn: &mut Session) {
        let mut node_names: Vec<String> = ssn.nodes.keys().cloned().collect();
        node_names.sort();

        // Jobs with nothing placeable are parked for the rest of the pass.
        let mut parked: HashSet<JobId> = HashSet::new();

        loop {
            if ssn.expired() {
                debug!("session deadline reached, allocate stops");
                break;
            }

            let Some(uid) = self.next_job(ssn, &parked) else {
                break;
            };

            match self.pick_placement(ssn, &uid, &node_names) {
                Some((task_uid, node_name)) => {
                    if let Err(err) = ssn.allocate(&uid, &task_uid, &node_name) {
                        warn!("failed to allocate task {task_uid} of job {uid}: {err}");
                        parked.insert(uid);
                    }
                }
                None => {
                    parked.insert(uid);
                }
            }
        }
    }
}
