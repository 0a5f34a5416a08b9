//! Remote collaborators consumed by the engine

use crate::error::RemoteError;
use crate::field::UpdateRequest;
use crate::snapshot::ResourceSnapshot;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// Remote cluster API
///
/// Implementations execute a single call each (retrying transient transport
/// failures on their own if they wish) and report service failures as
/// [`RemoteError`] with the service's error code.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read the cluster's current configuration and status
    async fn read_resource(&self, cluster_name: &str) -> Result<ResourceSnapshot, RemoteError>;

    /// Submit a single-field update
    async fn submit_field_mutation(&self, request: &UpdateRequest) -> Result<(), RemoteError>;

    /// Add (or overwrite) tags on the resource identified by `arn`
    async fn submit_add_tags(
        &self,
        arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError>;

    /// Remove tag keys from the resource identified by `arn`
    async fn submit_remove_tags(
        &self,
        arn: &str,
        keys: &BTreeSet<String>,
    ) -> Result<(), RemoteError>;

    /// List the tags currently associated with `arn`
    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>, RemoteError>;
}

#[async_trait]
impl<T: ClusterClient + ?Sized> ClusterClient for Arc<T> {
    async fn read_resource(&self, cluster_name: &str) -> Result<ResourceSnapshot, RemoteError> {
        (**self).read_resource(cluster_name).await
    }

    async fn submit_field_mutation(&self, request: &UpdateRequest) -> Result<(), RemoteError> {
        (**self).submit_field_mutation(request).await
    }

    async fn submit_add_tags(
        &self,
        arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        (**self).submit_add_tags(arn, tags).await
    }

    async fn submit_remove_tags(
        &self,
        arn: &str,
        keys: &BTreeSet<String>,
    ) -> Result<(), RemoteError> {
        (**self).submit_remove_tags(arn, keys).await
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>, RemoteError> {
        (**self).list_tags(arn).await
    }
}

/// Waits between stabilization polls
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// [`Delay`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
