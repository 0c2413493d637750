//! The scheduling pipeline.
//!
//! Three actions run in a fixed order over one session: decorate joins the
//! side tables and seeds plugin state, guarantee reserves gang floors
//! all-or-nothing, and allocate hands the remaining pending tasks out in
//! fair-share order. Actions only mutate the session; they never perform
//! I/O.

use crate::framework::Session;

pub mod allocate;
pub mod decorate;
pub mod guarantee;

pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, ssn: &mut Session);
}

/// The fixed action sequence. A preempt action would slot in before
/// allocate if it ever lands.
pub fn default_actions() -> Vec<Box<dyn Action>> {
    vec![
        Box::new(decorate::Decorate),
        Box::new(guarantee::Guarantee),
        Box::new(allocate::Allocate),
    ]
}
