//! Reconciliation settings

use crate::diff::UnsetPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Stabilization polling
    #[serde(default)]
    pub poll: PollConfig,

    /// Statuses meaning no modification is in progress
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,

    /// How unset desired values are compared
    #[serde(default)]
    pub unset_policy: UnsetPolicy,
}

fn default_terminal_statuses() -> Vec<String> {
    vec!["available".to_string()]
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            terminal_statuses: default_terminal_statuses(),
            unset_policy: UnsetPolicy::default(),
        }
    }
}

/// Stabilization poll schedule
///
/// The default multiplier of 1.0 gives a fixed delay between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of polls per step before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Delay before the first poll (milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound for any delay (milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_polls() -> u32 {
    360
}
fn default_initial_delay() -> u64 {
    10000 // 10s
}
fn default_max_delay() -> u64 {
    30000 // 30s
}
fn default_multiplier() -> f64 {
    1.0
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl PollConfig {
    /// Delay to wait before poll number `attempt` (zero-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}
