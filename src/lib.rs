//! Batch-workload scheduling engine for a container cluster.
//!
//! The crate is split along the scheduling cycle: event streams are
//! reconciled into the [`cache`], a [`scheduler`] loop snapshots it into a
//! [`framework::Session`], and the fixed [`actions`] pipeline
//! (decorate, guarantee, allocate) places gang-scheduled jobs on nodes
//! under the fair-share ordering supplied by [`plugins`].

pub mod actions;
pub mod cache;
pub mod config;
pub mod cycle_state;
pub mod error;
pub mod framework;
pub mod models;
pub mod plugins;
pub mod scheduler;
