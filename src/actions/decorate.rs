use log::trace;

use crate::actions::Action;
use crate::framework::Session;

/// Normalizes the session before any placement: joins SchedulingSpec and
/// DisruptionBudget side tables onto their jobs and seeds per-job plugin
/// state. Produces no bindings and is idempotent.
pub struct Decorate;

impl Action for Decorate {
    fn name(&self) -> &str {
        "decorate"
    }

    fn execute(&self, ssn: &mut Session) {
        for (uid, job) in ssn.jobs.iter_mut() {
            if let Some(spec) = ssn.scheduling_specs.get(uid) {
                trace!("joining SchedulingSpec {} onto job {uid}", spec.name);
                job.set_scheduling_spec(spec.clone());
            }
            if let Some(pdb) = ssn.pdbs.get(uid) {
                trace!("joining DisruptionBudget {} onto job {uid}", pdb.name);
                job.set_pdb(pdb.clone());
            }
        }
        ssn.init_plugin_state();
    }
}
