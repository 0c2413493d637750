use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::plugins::Plugins;

/// What to do when a SchedulingSpec or DisruptionBudget delete event arrives.
///
/// The upstream behavior is to ignore the delete, which leaves a stale gang
/// floor on the job. `Detach` removes the side-table entry instead, so the
/// job falls back to the all-or-nothing floor (min available = task count).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecDeletePolicy {
    #[default]
    Ignore,
    Detach,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between scheduling cycles, in milliseconds.
    pub schedule_period_ms: u64,
    /// Per-session deadline, in milliseconds. Actions stop cleanly between
    /// jobs when it expires; already-buffered bindings are still flushed.
    pub session_deadline_ms: u64,
    pub spec_delete_policy: SpecDeletePolicy,
    pub plugins: Plugins,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_period_ms: 1000,
            session_deadline_ms: 1000,
            spec_delete_policy: SpecDeletePolicy::default(),
            plugins: Plugins::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn schedule_period(&self) -> Duration {
        Duration::from_millis(self.schedule_period_ms)
    }

    pub fn session_deadline(&self) -> Duration {
        Duration::from_millis(self.session_deadline_ms)
    }
}

pub fn load_config(path: &str) -> Result<SchedulerConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config from {path}"))?;
    let cfg: SchedulerConfig =
        serde_yaml::from_str(&content).context("Failed to parse YAML config")?;
    Ok(cfg)
}
