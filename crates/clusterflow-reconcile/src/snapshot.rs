//! Point-in-time view of a managed cluster

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of a cluster's configuration and status
///
/// Desired and previous states are both expressed as snapshots. Remote reads
/// produce one too, with `status` and `arn` filled in and `tags` left empty
/// (tags come from a separate listing call).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSnapshot {
    /// Cluster name, the primary identifier for reads and updates
    pub cluster_name: String,

    /// Resource ARN, needed for tagging calls
    pub arn: Option<String>,

    /// Remote status (e.g. "available", "updating")
    pub status: Option<String>,

    pub description: Option<String>,
    pub security_group_ids: Option<BTreeSet<String>>,
    pub maintenance_window: Option<String>,
    pub sns_topic_arn: Option<String>,
    pub sns_topic_status: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub node_type: Option<String>,
    pub engine_version: Option<String>,
    pub parameter_group_name: Option<String>,
    pub num_replicas_per_shard: Option<i32>,
    pub num_shards: Option<i32>,
    pub acl_name: Option<String>,

    pub tags: BTreeMap<String, String>,
}

impl ResourceSnapshot {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Default::default()
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the snapshot's status is one of `terminal_statuses`
    ///
    /// Status comparison is case-insensitive; a missing status is never terminal.
    pub fn is_terminal(&self, terminal_statuses: &[String]) -> bool {
        self.status.as_deref().is_some_and(|status| {
            terminal_statuses
                .iter()
                .any(|t| t.eq_ignore_ascii_case(status))
        })
    }
}
