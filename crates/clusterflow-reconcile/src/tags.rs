//! Tag reconciliation

use crate::classify;
use crate::client::{ClusterClient, Delay};
use crate::error::{ReconcileError, Result};
use crate::progress::{Progress, ReconcileStep};
use crate::stabilize::{Acceptance, StabilizationWatcher};
use std::collections::{BTreeMap, BTreeSet};

/// Tags to add (with values) and tag keys to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    pub to_add: BTreeMap<String, String>,
    pub to_remove: BTreeSet<String>,
}

impl TagDelta {
    /// Compare desired tags against the currently associated ones
    ///
    /// A key whose value differs is re-added with the desired value, not removed.
    pub fn between(desired: &BTreeMap<String, String>, current: &BTreeMap<String, String>) -> Self {
        let to_add = desired
            .iter()
            .filter(|(key, value)| current.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let to_remove = current
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Applies a [`TagDelta`] add-then-remove, stabilizing after each call
pub struct TagReconciler<'a, C, D> {
    client: &'a C,
    watcher: StabilizationWatcher<'a, C, D>,
}

impl<'a, C: ClusterClient, D: Delay> TagReconciler<'a, C, D> {
    pub fn new(client: &'a C, watcher: StabilizationWatcher<'a, C, D>) -> Self {
        Self { client, watcher }
    }

    /// Add tags present in the model but missing or different in `current`
    pub async fn add_tags(
        &self,
        progress: Progress,
        current: &BTreeMap<String, String>,
    ) -> Result<Progress> {
        let step = ReconcileStep::AddTags;
        let to_add = TagDelta::between(&progress.model.tags, current).to_add;
        if to_add.is_empty() {
            tracing::debug!("No tags to add on {}", progress.model.cluster_name);
            return Ok(progress);
        }

        let (progress, arn) = self.resolve_arn(progress, step).await?;
        tracing::info!(
            "Adding {} tag(s) to {}",
            to_add.len(),
            progress.model.cluster_name
        );
        self.client
            .submit_add_tags(&arn, &to_add)
            .await
            .map_err(|e| classify::translate(step, e))?;

        let polls = self
            .watcher
            .wait(step, &progress.model, Acceptance::TerminalStatus)
            .await?;
        Ok(progress.confirm(step, polls))
    }

    /// Remove tag keys present in `current` but absent from the model
    pub async fn remove_tags(
        &self,
        progress: Progress,
        current: &BTreeMap<String, String>,
    ) -> Result<Progress> {
        let step = ReconcileStep::RemoveTags;
        let to_remove = TagDelta::between(&progress.model.tags, current).to_remove;
        if to_remove.is_empty() {
            tracing::debug!("No tags to remove on {}", progress.model.cluster_name);
            return Ok(progress);
        }

        let (progress, arn) = self.resolve_arn(progress, step).await?;
        tracing::info!(
            "Removing {} tag(s) from {}",
            to_remove.len(),
            progress.model.cluster_name
        );
        self.client
            .submit_remove_tags(&arn, &to_remove)
            .await
            .map_err(|e| classify::translate(step, e))?;

        let polls = self
            .watcher
            .wait(step, &progress.model, Acceptance::TerminalStatus)
            .await?;
        Ok(progress.confirm(step, polls))
    }

    /// Make sure the model carries the cluster ARN, reading the cluster if needed
    ///
    /// The resolved ARN stays on the returned model, so later steps reuse it.
    pub async fn resolve_arn(
        &self,
        progress: Progress,
        step: ReconcileStep,
    ) -> Result<(Progress, String)> {
        if let Some(arn) = progress.model.arn.clone() {
            return Ok((progress, arn));
        }

        tracing::debug!(
            "Resolving ARN of {} for {}",
            progress.model.cluster_name,
            step
        );
        let observed = self
            .client
            .read_resource(&progress.model.cluster_name)
            .await
            .map_err(|e| classify::translate(step, e))?;
        let arn = observed
            .arn
            .ok_or(ReconcileError::MissingIdentity { step })?;

        let mut model = progress.model.clone();
        model.arn = Some(arn.clone());
        Ok((progress.with_model(model), arn))
    }
}
