//! Updatable cluster fields and their dispatch table

use crate::diff::{self, UnsetPolicy};
use crate::snapshot::ResourceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One independently updatable attribute of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateField {
    Description,
    SecurityGroupIds,
    MaintenanceWindow,
    SnsTopicArn,
    SnsTopicStatus,
    SnapshotWindow,
    SnapshotRetentionLimit,
    NodeType,
    EngineVersion,
    ParameterGroupName,
    ReplicaConfiguration,
    ShardConfiguration,
    AclName,
}

impl UpdateField {
    /// Processing order. A cluster rejects overlapping modifications, and some
    /// (engine version after node type, shards after replicas) depend on the
    /// earlier ones having settled.
    pub const ALL: [UpdateField; 13] = [
        UpdateField::Description,
        UpdateField::SecurityGroupIds,
        UpdateField::MaintenanceWindow,
        UpdateField::SnsTopicArn,
        UpdateField::SnsTopicStatus,
        UpdateField::SnapshotWindow,
        UpdateField::SnapshotRetentionLimit,
        UpdateField::NodeType,
        UpdateField::EngineVersion,
        UpdateField::ParameterGroupName,
        UpdateField::ReplicaConfiguration,
        UpdateField::ShardConfiguration,
        UpdateField::AclName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateField::Description => "description",
            UpdateField::SecurityGroupIds => "security_group_ids",
            UpdateField::MaintenanceWindow => "maintenance_window",
            UpdateField::SnsTopicArn => "sns_topic_arn",
            UpdateField::SnsTopicStatus => "sns_topic_status",
            UpdateField::SnapshotWindow => "snapshot_window",
            UpdateField::SnapshotRetentionLimit => "snapshot_retention_limit",
            UpdateField::NodeType => "node_type",
            UpdateField::EngineVersion => "engine_version",
            UpdateField::ParameterGroupName => "parameter_group_name",
            UpdateField::ReplicaConfiguration => "replica_configuration",
            UpdateField::ShardConfiguration => "shard_configuration",
            UpdateField::AclName => "acl_name",
        }
    }
}

impl std::fmt::Display for UpdateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New value for exactly one field, carried by an [`UpdateRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Description(Option<String>),
    SecurityGroupIds(Option<BTreeSet<String>>),
    MaintenanceWindow(Option<String>),
    SnsTopicArn(Option<String>),
    SnsTopicStatus(Option<String>),
    SnapshotWindow(Option<String>),
    SnapshotRetentionLimit(Option<i32>),
    NodeType(Option<String>),
    EngineVersion(Option<String>),
    ParameterGroupName(Option<String>),
    ReplicaCount(Option<i32>),
    ShardCount(Option<i32>),
    AclName(Option<String>),
}

impl FieldChange {
    pub fn field(&self) -> UpdateField {
        match self {
            FieldChange::Description(_) => UpdateField::Description,
            FieldChange::SecurityGroupIds(_) => UpdateField::SecurityGroupIds,
            FieldChange::MaintenanceWindow(_) => UpdateField::MaintenanceWindow,
            FieldChange::SnsTopicArn(_) => UpdateField::SnsTopicArn,
            FieldChange::SnsTopicStatus(_) => UpdateField::SnsTopicStatus,
            FieldChange::SnapshotWindow(_) => UpdateField::SnapshotWindow,
            FieldChange::SnapshotRetentionLimit(_) => UpdateField::SnapshotRetentionLimit,
            FieldChange::NodeType(_) => UpdateField::NodeType,
            FieldChange::EngineVersion(_) => UpdateField::EngineVersion,
            FieldChange::ParameterGroupName(_) => UpdateField::ParameterGroupName,
            FieldChange::ReplicaCount(_) => UpdateField::ReplicaConfiguration,
            FieldChange::ShardCount(_) => UpdateField::ShardConfiguration,
            FieldChange::AclName(_) => UpdateField::AclName,
        }
    }

    /// The carried value as JSON (`null` when unset)
    pub fn value_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("value").cloned())
            .unwrap_or_default()
    }

    /// Write the carried value onto `snapshot`
    pub fn apply_to(self, snapshot: &mut ResourceSnapshot) {
        match self {
            FieldChange::Description(v) => snapshot.description = v,
            FieldChange::SecurityGroupIds(v) => snapshot.security_group_ids = v,
            FieldChange::MaintenanceWindow(v) => snapshot.maintenance_window = v,
            FieldChange::SnsTopicArn(v) => snapshot.sns_topic_arn = v,
            FieldChange::SnsTopicStatus(v) => snapshot.sns_topic_status = v,
            FieldChange::SnapshotWindow(v) => snapshot.snapshot_window = v,
            FieldChange::SnapshotRetentionLimit(v) => snapshot.snapshot_retention_limit = v,
            FieldChange::NodeType(v) => snapshot.node_type = v,
            FieldChange::EngineVersion(v) => snapshot.engine_version = v,
            FieldChange::ParameterGroupName(v) => snapshot.parameter_group_name = v,
            FieldChange::ReplicaCount(v) => snapshot.num_replicas_per_shard = v,
            FieldChange::ShardCount(v) => snapshot.num_shards = v,
            FieldChange::AclName(v) => snapshot.acl_name = v,
        }
    }
}

/// A single-field update request for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub cluster_name: String,
    pub change: FieldChange,
}

impl UpdateRequest {
    pub fn field(&self) -> UpdateField {
        self.change.field()
    }
}

/// Dispatch entry for one field: how to diff it and how to build its request
pub struct FieldSpec {
    pub field: UpdateField,
    differs: fn(&ResourceSnapshot, &ResourceSnapshot, UnsetPolicy) -> bool,
    build: fn(&ResourceSnapshot) -> FieldChange,
}

impl FieldSpec {
    pub fn is_modified(
        &self,
        desired: &ResourceSnapshot,
        current: &ResourceSnapshot,
        policy: UnsetPolicy,
    ) -> bool {
        (self.differs)(desired, current, policy)
    }

    /// The value this field takes in `snapshot`
    pub fn change(&self, snapshot: &ResourceSnapshot) -> FieldChange {
        (self.build)(snapshot)
    }

    pub fn request(&self, desired: &ResourceSnapshot) -> UpdateRequest {
        UpdateRequest {
            cluster_name: desired.cluster_name.clone(),
            change: self.change(desired),
        }
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec").field("field", &self.field).finish()
    }
}

macro_rules! field_spec {
    ($field:ident, $attr:ident, $change:ident) => {
        FieldSpec {
            field: UpdateField::$field,
            differs: |desired, current, policy| {
                diff::is_modified(&desired.$attr, &current.$attr, policy)
            },
            build: |snapshot| FieldChange::$change(snapshot.$attr.clone()),
        }
    };
}

/// Dispatch table, in processing order
pub static FIELD_TABLE: [FieldSpec; 13] = [
    field_spec!(Description, description, Description),
    field_spec!(SecurityGroupIds, security_group_ids, SecurityGroupIds),
    field_spec!(MaintenanceWindow, maintenance_window, MaintenanceWindow),
    field_spec!(SnsTopicArn, sns_topic_arn, SnsTopicArn),
    field_spec!(SnsTopicStatus, sns_topic_status, SnsTopicStatus),
    field_spec!(SnapshotWindow, snapshot_window, SnapshotWindow),
    field_spec!(SnapshotRetentionLimit, snapshot_retention_limit, SnapshotRetentionLimit),
    field_spec!(NodeType, node_type, NodeType),
    field_spec!(EngineVersion, engine_version, EngineVersion),
    field_spec!(ParameterGroupName, parameter_group_name, ParameterGroupName),
    field_spec!(ReplicaConfiguration, num_replicas_per_shard, ReplicaCount),
    field_spec!(ShardConfiguration, num_shards, ShardCount),
    field_spec!(AclName, acl_name, AclName),
];

pub fn lookup(field: UpdateField) -> Option<&'static FieldSpec> {
    FIELD_TABLE.iter().find(|spec| spec.field == field)
}
