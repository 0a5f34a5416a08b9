//! `ClusterClient` backed by the MemoryDB API

use crate::convert::{remote_error, snapshot_from_cluster, with_change};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_memorydb::Client;
use aws_sdk_memorydb::types::Tag;
use clusterflow_reconcile::{ClusterClient, RemoteError, ResourceSnapshot, UpdateRequest};
use std::collections::{BTreeMap, BTreeSet};

/// MemoryDB cluster API client
#[derive(Clone)]
pub struct MemoryDbClusterClient {
    client: Client,
}

impl MemoryDbClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential and region chain
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            tracing::debug!("Using AWS region {}", region);
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ClusterClient for MemoryDbClusterClient {
    async fn read_resource(&self, cluster_name: &str) -> Result<ResourceSnapshot, RemoteError> {
        tracing::debug!("DescribeClusters {}", cluster_name);
        let output = self
            .client
            .describe_clusters()
            .cluster_name(cluster_name)
            .show_shard_details(true)
            .send()
            .await
            .map_err(remote_error)?;

        output
            .clusters()
            .first()
            .map(snapshot_from_cluster)
            .ok_or_else(|| RemoteError::not_found(cluster_name))
    }

    async fn submit_field_mutation(&self, request: &UpdateRequest) -> Result<(), RemoteError> {
        tracing::debug!("UpdateCluster {} ({})", request.cluster_name, request.field());
        let builder = self
            .client
            .update_cluster()
            .cluster_name(&request.cluster_name);

        with_change(builder, &request.change)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn submit_add_tags(
        &self,
        arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        tracing::debug!("TagResource {} ({} tag(s))", arn, tags.len());
        let tags = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect();

        self.client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn submit_remove_tags(
        &self,
        arn: &str,
        keys: &BTreeSet<String>,
    ) -> Result<(), RemoteError> {
        tracing::debug!("UntagResource {} ({} key(s))", arn, keys.len());
        self.client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(keys.iter().cloned().collect()))
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>, RemoteError> {
        tracing::debug!("ListTags {}", arn);
        let output = self
            .client
            .list_tags()
            .resource_arn(arn)
            .send()
            .await
            .map_err(remote_error)?;

        Ok(output
            .tag_list()
            .iter()
            .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
            .collect())
    }
}
