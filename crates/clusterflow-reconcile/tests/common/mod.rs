use async_trait::async_trait;
use clusterflow_reconcile::{
    ClusterClient, Delay, FieldChange, ReconcileConfig, RemoteError, ResourceSnapshot,
    UpdateField, UpdateRequest,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ARN: &str = "arn:aws:memorydb:us-east-1:123456789012:cluster/cache";

/// Remote calls observed by [`FakeCluster`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read,
    Update(UpdateField),
    AddTags(BTreeMap<String, String>),
    RemoveTags(BTreeSet<String>),
    ListTags,
}

struct FakeState {
    snapshot: ResourceSnapshot,
    tags: BTreeMap<String, String>,
    calls: Vec<Call>,
    /// Change accepted but not yet visible, with reads left until it settles
    pending: Option<(FieldChange, u32)>,
    settle_reads: u32,
    ignored: HashSet<UpdateField>,
    /// Fields whose accepted change stays "updating" until `settle_stalled`
    stalled: HashSet<UpdateField>,
    reject_update: Option<RemoteError>,
    vanish_after_updates: Option<usize>,
    fail_reads_after_update: Option<RemoteError>,
    updates: usize,
    hide_arn: bool,
}

/// In-memory cluster that applies updates after a few "updating" reads
#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        let mut snapshot = snapshot;
        let tags = std::mem::take(&mut snapshot.tags);
        snapshot.arn = Some(ARN.to_string());
        snapshot.status = Some("available".to_string());
        Self {
            state: Arc::new(Mutex::new(FakeState {
                snapshot,
                tags,
                calls: Vec::new(),
                pending: None,
                settle_reads: 2,
                ignored: HashSet::new(),
                stalled: HashSet::new(),
                reject_update: None,
                vanish_after_updates: None,
                fail_reads_after_update: None,
                updates: 0,
                hide_arn: false,
            })),
        }
    }

    /// Accept updates of `field` but never apply them
    pub fn ignoring(self, field: UpdateField) -> Self {
        self.state.lock().unwrap().ignored.insert(field);
        self
    }

    /// Keep updates of `field` in flight until [`FakeCluster::settle_stalled`]
    pub fn stalling(self, field: UpdateField) -> Self {
        self.state.lock().unwrap().stalled.insert(field);
        self
    }

    /// Apply a stalled change now, as if it finished between two runs
    pub fn settle_stalled(&self) {
        let mut state = self.state.lock().unwrap();
        state.stalled.clear();
        if let Some((change, _)) = state.pending.take() {
            if !state.ignored.contains(&change.field()) {
                change.apply_to(&mut state.snapshot);
            }
        }
        state.snapshot.status = Some("available".to_string());
    }

    /// Fail every read with `error` once an update was accepted
    pub fn failing_reads_after_update(self, error: RemoteError) -> Self {
        self.state.lock().unwrap().fail_reads_after_update = Some(error);
        self
    }

    pub fn rejecting_updates(self, error: RemoteError) -> Self {
        self.state.lock().unwrap().reject_update = Some(error);
        self
    }

    /// Disappear once `count` updates were accepted
    pub fn vanishing_after(self, count: usize) -> Self {
        self.state.lock().unwrap().vanish_after_updates = Some(count);
        self
    }

    /// Reads that report "updating" before an accepted change becomes visible
    pub fn settling_for(self, reads: u32) -> Self {
        self.state.lock().unwrap().settle_reads = reads;
        self
    }

    pub fn without_arn(self) -> Self {
        self.state.lock().unwrap().hide_arn = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls other than reads and tag listing
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Read | Call::ListTags))
            .collect()
    }

    pub fn updated_fields(&self) -> Vec<UpdateField> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(field) => Some(field),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        let state = self.state.lock().unwrap();
        ResourceSnapshot {
            tags: state.tags.clone(),
            ..state.snapshot.clone()
        }
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn read_resource(&self, cluster_name: &str) -> Result<ResourceSnapshot, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Read);

        if let Some(limit) = state.vanish_after_updates {
            if state.updates >= limit {
                return Err(RemoteError::not_found(cluster_name));
            }
        }

        if state.updates > 0 {
            if let Some(error) = state.fail_reads_after_update.clone() {
                return Err(error);
            }
        }

        match state.pending.take() {
            Some((change, reads)) if state.stalled.contains(&change.field()) => {
                state.pending = Some((change, reads));
                state.snapshot.status = Some("updating".to_string());
            }
            Some((change, reads)) if reads > 0 => {
                state.pending = Some((change, reads - 1));
                state.snapshot.status = Some("updating".to_string());
            }
            Some((change, _)) => {
                if !state.ignored.contains(&change.field()) {
                    change.apply_to(&mut state.snapshot);
                }
                state.snapshot.status = Some("available".to_string());
            }
            None => {}
        }

        let mut snapshot = state.snapshot.clone();
        if state.hide_arn {
            snapshot.arn = None;
        }
        Ok(snapshot)
    }

    async fn submit_field_mutation(&self, request: &UpdateRequest) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(request.field()));

        if let Some(error) = state.reject_update.clone() {
            return Err(error);
        }
        assert!(
            state.pending.is_none(),
            "update submitted while another one is in flight"
        );

        state.updates += 1;
        let reads = state.settle_reads;
        state.pending = Some((request.change.clone(), reads));
        Ok(())
    }

    async fn submit_add_tags(
        &self,
        arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        assert_eq!(arn, ARN);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddTags(tags.clone()));
        state.tags.extend(tags.clone());
        Ok(())
    }

    async fn submit_remove_tags(
        &self,
        arn: &str,
        keys: &BTreeSet<String>,
    ) -> Result<(), RemoteError> {
        assert_eq!(arn, ARN);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::RemoveTags(keys.clone()));
        state.tags.retain(|key, _| !keys.contains(key));
        Ok(())
    }

    async fn list_tags(&self, _arn: &str) -> Result<BTreeMap<String, String>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListTags);
        Ok(state.tags.clone())
    }
}

/// Delay that returns immediately and records what it was asked to wait
#[derive(Clone, Default)]
pub struct RecordingDelay {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn test_config() -> ReconcileConfig {
    let mut config = ReconcileConfig::default();
    config.poll.max_polls = 10;
    config.poll.initial_delay_ms = 5;
    config
}

/// A fully specified cluster used as the starting point of most tests
pub fn baseline() -> ResourceSnapshot {
    ResourceSnapshot {
        description: Some("session cache".into()),
        security_group_ids: Some(["sg-1".to_string()].into_iter().collect()),
        maintenance_window: Some("sun:05:00-sun:06:00".into()),
        sns_topic_arn: Some("arn:aws:sns:us-east-1:123456789012:alerts".into()),
        sns_topic_status: Some("ACTIVE".into()),
        snapshot_window: Some("03:00-04:00".into()),
        snapshot_retention_limit: Some(7),
        node_type: Some("db.r6g.large".into()),
        engine_version: Some("7.0".into()),
        parameter_group_name: Some("default.memorydb-redis7".into()),
        num_replicas_per_shard: Some(1),
        num_shards: Some(2),
        acl_name: Some("open-access".into()),
        ..ResourceSnapshot::new("cache")
    }
    .with_tag("b", "2")
    .with_tag("c", "3")
}

/// `snapshot` with exactly `field` changed
pub fn with_changed(snapshot: &ResourceSnapshot, field: UpdateField) -> ResourceSnapshot {
    let mut changed = snapshot.clone();
    match field {
        UpdateField::Description => changed.description = Some("primary cache".into()),
        UpdateField::SecurityGroupIds => {
            changed.security_group_ids =
                Some(["sg-1", "sg-2"].iter().map(|s| s.to_string()).collect())
        }
        UpdateField::MaintenanceWindow => {
            changed.maintenance_window = Some("sat:01:00-sat:02:00".into())
        }
        UpdateField::SnsTopicArn => {
            changed.sns_topic_arn = Some("arn:aws:sns:us-east-1:123456789012:pager".into())
        }
        UpdateField::SnsTopicStatus => changed.sns_topic_status = Some("INACTIVE".into()),
        UpdateField::SnapshotWindow => changed.snapshot_window = Some("06:00-07:00".into()),
        UpdateField::SnapshotRetentionLimit => changed.snapshot_retention_limit = Some(14),
        UpdateField::NodeType => changed.node_type = Some("db.r6g.xlarge".into()),
        UpdateField::EngineVersion => changed.engine_version = Some("7.1".into()),
        UpdateField::ParameterGroupName => {
            changed.parameter_group_name = Some("tuned-redis7".into())
        }
        UpdateField::ReplicaConfiguration => changed.num_replicas_per_shard = Some(2),
        UpdateField::ShardConfiguration => changed.num_shards = Some(4),
        UpdateField::AclName => changed.acl_name = Some("app-users".into()),
    }
    changed
}
