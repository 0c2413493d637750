use std::collections::HashMap;

use log::{debug, warn};

use crate::actions::Action;
use crate::error::SchedulerError;
use crate::framework::Session;
use crate::models::{JobId, Resource, TaskInfo};

/// Reserves gang capacity: a job with a floor either gets enough of its
/// tasks placed to reach `min_available`, or none at all this cycle.
/// Running first means allocate only ever sees gang-safe jobs.
pub struct Guarantee;

impl Guarantee {
    /// Trial-place the remaining gang members against scratch idle vectors.
    /// Returns the chosen placements only when the whole gang fits, or the
    /// reason it does not.
    fn plan_gang(
        ssn: &Session,
        uid: &JobId,
        node_names: &[String],
    ) -> Result<Vec<(String, String)>, SchedulerError> {
        let job = &ssn.jobs[uid];
        let min_available = job.min_available();
        let needed = min_available.saturating_sub(job.ready_task_count());

        let mut pending: Vec<&TaskInfo> = job.pending_tasks();
        if pending.len() < needed {
            return Err(SchedulerError::GangUnsatisfiable {
                job: uid.clone(),
                min_available,
                satisfiable: pending.len(),
            });
        }
        pending.sort_by(|a, b| ssn.task_less(a, b));

        let mut scratch: HashMap<&str, Resource> = ssn
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.idle))
            .collect();
        let mut placements: Vec<(String, String)> = Vec::new();
        for task in pending {
            if placements.len() == needed {
                break;
            }
            for node_name in node_names {
                let Some(idle) = scratch.get_mut(node_name.as_str()) else {
                    continue;
                };
                if task.resreq.fits(idle) {
                    idle.sub(&task.resreq);
                    placements.push((task.uid.clone(), node_name.clone()));
                    break;
                }
            }
        }

        if placements.len() < needed {
            return Err(SchedulerError::GangUnsatisfiable {
                job: uid.clone(),
                min_available,
                satisfiable: job.ready_task_count() + placements.len(),
            });
        }
        Ok(placements)
    }
}

impl Action for Guarantee {
    fn name(&self) -> &str {
        "guarantee"
    }

    fn execute(&self, ssn: &mut Session) {
        let mut job_ids: Vec<JobId> = ssn.jobs.keys().cloned().collect();
        job_ids.sort();

        let mut node_names: Vec<String> = ssn.nodes.keys().cloned().collect();
        node_names.sort();

        for uid in job_ids {
            if ssn.expired() {
                debug!("session deadline reached, guarantee stops");
                break;
            }

            let job = &ssn.jobs[&uid];
            if job.min_available() == 0 || ssn.job_ready(job) {
                continue;
            }

            let placements = match Self::plan_gang(ssn, &uid, &node_names) {
                Ok(placements) => placements,
                Err(err) => {
                    debug!("skipping job in guarantee: {err}");
                    continue;
                }
            };

            for (task_uid, node_name) in placements {
                if let Err(err) = ssn.allocate(&uid, &task_uid, &node_name) {
                    warn!("failed to reserve task {task_uid} of job {uid} on {node_name}: {err}");
                }
            }
        }
    }
}
