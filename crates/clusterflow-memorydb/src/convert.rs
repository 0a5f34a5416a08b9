//! Conversions between MemoryDB SDK shapes and engine types

use aws_sdk_memorydb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_memorydb::operation::update_cluster::builders::UpdateClusterFluentBuilder;
use aws_sdk_memorydb::types::{Cluster, ReplicaConfigurationRequest, ShardConfigurationRequest};
use clusterflow_reconcile::{FieldChange, RemoteError, ResourceSnapshot};
use std::collections::BTreeSet;

/// Code reported for failures that never reached the service
pub const UNKNOWN_ERROR_CODE: &str = "Unknown";

/// Map a described cluster onto a snapshot
///
/// Tags are not part of the describe response and are left empty. The
/// replica count is derived from the first shard's node count, which
/// includes the primary.
pub fn snapshot_from_cluster(cluster: &Cluster) -> ResourceSnapshot {
    let security_group_ids: BTreeSet<String> = cluster
        .security_groups()
        .iter()
        .filter_map(|g| g.security_group_id())
        .map(str::to_string)
        .collect();

    let num_replicas_per_shard = cluster
        .shards()
        .first()
        .and_then(|shard| shard.number_of_nodes())
        .map(|nodes| nodes - 1);

    ResourceSnapshot {
        cluster_name: cluster.name().unwrap_or_default().to_string(),
        arn: cluster.arn().map(str::to_string),
        status: cluster.status().map(str::to_string),
        description: cluster.description().map(str::to_string),
        security_group_ids: (!security_group_ids.is_empty()).then_some(security_group_ids),
        maintenance_window: cluster.maintenance_window().map(str::to_string),
        sns_topic_arn: cluster.sns_topic_arn().map(str::to_string),
        sns_topic_status: cluster.sns_topic_status().map(str::to_string),
        snapshot_window: cluster.snapshot_window().map(str::to_string),
        snapshot_retention_limit: cluster.snapshot_retention_limit(),
        node_type: cluster.node_type().map(str::to_string),
        engine_version: cluster.engine_version().map(str::to_string),
        parameter_group_name: cluster.parameter_group_name().map(str::to_string),
        num_replicas_per_shard,
        num_shards: cluster.number_of_shards(),
        acl_name: cluster.acl_name().map(str::to_string),
        tags: Default::default(),
    }
}

/// Set exactly one field of an `UpdateCluster` call
pub fn with_change(
    builder: UpdateClusterFluentBuilder,
    change: &FieldChange,
) -> UpdateClusterFluentBuilder {
    match change.clone() {
        FieldChange::Description(v) => builder.set_description(v),
        FieldChange::SecurityGroupIds(v) => {
            builder.set_security_group_ids(v.map(|ids| ids.into_iter().collect()))
        }
        FieldChange::MaintenanceWindow(v) => builder.set_maintenance_window(v),
        FieldChange::SnsTopicArn(v) => builder.set_sns_topic_arn(v),
        FieldChange::SnsTopicStatus(v) => builder.set_sns_topic_status(v),
        FieldChange::SnapshotWindow(v) => builder.set_snapshot_window(v),
        FieldChange::SnapshotRetentionLimit(v) => builder.set_snapshot_retention_limit(v),
        FieldChange::NodeType(v) => builder.set_node_type(v),
        FieldChange::EngineVersion(v) => builder.set_engine_version(v),
        FieldChange::ParameterGroupName(v) => builder.set_parameter_group_name(v),
        FieldChange::ReplicaCount(v) => builder.set_replica_configuration(
            v.map(|count| ReplicaConfigurationRequest::builder().replica_count(count).build()),
        ),
        FieldChange::ShardCount(v) => builder.set_shard_configuration(
            v.map(|count| ShardConfigurationRequest::builder().shard_count(count).build()),
        ),
        FieldChange::AclName(v) => builder.set_acl_name(v),
    }
}

/// Convert an SDK failure into a [`RemoteError`], keeping the service code
pub fn remote_error<E>(err: E) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    remote_error_from_parts(
        err.code(),
        err.message(),
        || DisplayErrorContext(&err).to_string(),
    )
}

fn remote_error_from_parts(
    code: Option<&str>,
    message: Option<&str>,
    fallback: impl FnOnce() -> String,
) -> RemoteError {
    let message = match message {
        Some(message) => message.to_string(),
        None => fallback(),
    };
    RemoteError::new(code.unwrap_or(UNKNOWN_ERROR_CODE), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_memorydb::config::{BehaviorVersion, Region};
    use aws_sdk_memorydb::types::{SecurityGroupMembership, Shard};
    use aws_sdk_memorydb::{Client, Config};
    use clusterflow_reconcile::ErrorClass;

    fn offline_client() -> Client {
        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        Client::from_conf(config)
    }

    fn described_cluster() -> Cluster {
        Cluster::builder()
            .name("cache")
            .arn("arn:aws:memorydb:us-east-1:123456789012:cluster/cache")
            .status("available")
            .description("session cache")
            .node_type("db.r6g.large")
            .engine_version("7.0")
            .parameter_group_name("default.memorydb-redis7")
            .number_of_shards(2)
            .shards(Shard::builder().name("0001").number_of_nodes(3).build())
            .shards(Shard::builder().name("0002").number_of_nodes(3).build())
            .security_groups(
                SecurityGroupMembership::builder()
                    .security_group_id("sg-2")
                    .status("active")
                    .build(),
            )
            .security_groups(
                SecurityGroupMembership::builder()
                    .security_group_id("sg-1")
                    .status("active")
                    .build(),
            )
            .snapshot_retention_limit(7)
            .acl_name("open-access")
            .build()
    }

    #[test]
    fn test_snapshot_from_cluster() {
        let snapshot = snapshot_from_cluster(&described_cluster());

        assert_eq!(snapshot.cluster_name, "cache");
        assert_eq!(snapshot.status.as_deref(), Some("available"));
        assert_eq!(snapshot.node_type.as_deref(), Some("db.r6g.large"));
        assert_eq!(snapshot.num_shards, Some(2));
        assert_eq!(snapshot.num_replicas_per_shard, Some(2));
        assert_eq!(snapshot.snapshot_retention_limit, Some(7));
        assert_eq!(
            snapshot.security_group_ids,
            Some(["sg-1".to_string(), "sg-2".to_string()].into_iter().collect())
        );
        assert!(snapshot.tags.is_empty());
        assert_eq!(snapshot.sns_topic_arn, None);
    }

    #[test]
    fn test_cluster_without_shard_details() {
        let cluster = Cluster::builder().name("cache").number_of_shards(1).build();
        let snapshot = snapshot_from_cluster(&cluster);

        assert_eq!(snapshot.num_replicas_per_shard, None);
        assert_eq!(snapshot.security_group_ids, None);
    }

    #[test]
    fn test_with_change_sets_only_that_field() {
        let builder = with_change(
            offline_client().update_cluster().cluster_name("cache"),
            &FieldChange::NodeType(Some("db.r6g.xlarge".into())),
        );

        assert_eq!(builder.get_node_type().as_deref(), Some("db.r6g.xlarge"));
        assert_eq!(builder.get_cluster_name().as_deref(), Some("cache"));
        assert!(builder.get_engine_version().is_none());
        assert!(builder.get_replica_configuration().is_none());
    }

    #[test]
    fn test_with_change_replica_and_shard_configuration() {
        let client = offline_client();

        let replicas = with_change(client.update_cluster(), &FieldChange::ReplicaCount(Some(2)));
        assert_eq!(
            replicas.get_replica_configuration(),
            &Some(ReplicaConfigurationRequest::builder().replica_count(2).build())
        );

        let shards = with_change(client.update_cluster(), &FieldChange::ShardCount(Some(4)));
        assert_eq!(
            shards.get_shard_configuration(),
            &Some(ShardConfigurationRequest::builder().shard_count(4).build())
        );
    }

    #[test]
    fn test_with_change_security_groups_in_order() {
        let ids = ["sg-b", "sg-a"].iter().map(|s| s.to_string()).collect();
        let builder = with_change(
            offline_client().update_cluster(),
            &FieldChange::SecurityGroupIds(Some(ids)),
        );

        assert_eq!(
            builder.get_security_group_ids(),
            &Some(vec!["sg-a".to_string(), "sg-b".to_string()])
        );
    }

    #[test]
    fn test_remote_error_keeps_service_code() {
        let err = remote_error_from_parts(
            Some("ClusterNotFoundFault"),
            Some("Cluster cache not found"),
            || unreachable!(),
        );
        assert_eq!(err.code, "ClusterNotFoundFault");
        assert_eq!(clusterflow_reconcile::classify(&err), ErrorClass::NotFound);
    }

    #[test]
    fn test_remote_error_without_metadata() {
        let err = remote_error_from_parts(None, None, || "dispatch failure".to_string());
        assert_eq!(err, RemoteError::new(UNKNOWN_ERROR_CODE, "dispatch failure"));
        assert_eq!(clusterflow_reconcile::classify(&err), ErrorClass::Unclassified);
    }
}
