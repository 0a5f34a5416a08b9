//! Update sequencing: fields in fixed order, then tags

use crate::classify;
use crate::client::{ClusterClient, Delay, TokioDelay};
use crate::config::ReconcileConfig;
use crate::error::{Interrupted, ReconcileError, Result};
use crate::field::{self, UpdateField};
use crate::plan::{self, Plan};
use crate::progress::{Progress, ReconcileStep};
use crate::snapshot::ResourceSnapshot;
use crate::stabilize::{Acceptance, StabilizationWatcher};
use crate::tags::TagReconciler;

/// Drives a cluster from its previous state to a desired one
///
/// At most one mutation is in flight at any time: every submitted change is
/// confirmed stable before the next one is considered, and the first failure
/// aborts everything after it. Fields that already converged are no-ops on a
/// retry, so a failed run can simply be re-run.
pub struct Reconciler<C, D = TokioDelay> {
    client: C,
    delay: D,
    config: ReconcileConfig,
}

impl<C: ClusterClient> Reconciler<C, TokioDelay> {
    pub fn new(client: C, config: ReconcileConfig) -> Self {
        Self::with_delay(client, TokioDelay, config)
    }
}

impl<C: ClusterClient, D: Delay> Reconciler<C, D> {
    pub fn with_delay(client: C, delay: D, config: ReconcileConfig) -> Self {
        Self {
            client,
            delay,
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Compute the steps a reconciliation would take, without remote calls
    pub fn plan(&self, desired: &ResourceSnapshot, previous: &ResourceSnapshot) -> Plan {
        plan::plan(desired, previous, self.config.unset_policy)
    }

    /// Converge the cluster from `previous` to `desired`
    pub async fn reconcile(
        &self,
        desired: &ResourceSnapshot,
        previous: &ResourceSnapshot,
    ) -> Result<Progress> {
        self.resume(Progress::new(desired.clone()), previous).await
    }

    /// Like [`Reconciler::reconcile`], but a failure keeps the progress made so far
    pub async fn reconcile_tracked(
        &self,
        desired: &ResourceSnapshot,
        previous: &ResourceSnapshot,
    ) -> std::result::Result<Progress, Interrupted> {
        self.resume_tracked(Progress::new(desired.clone()), previous)
            .await
    }

    /// Run the whole pipeline starting from an existing progress record
    ///
    /// `progress.model` is the desired state. Every field is re-diffed, so a
    /// record carried over from an interrupted run only contributes its
    /// context and any identity already resolved.
    pub async fn resume(
        &self,
        progress: Progress,
        previous: &ResourceSnapshot,
    ) -> Result<Progress> {
        self.resume_tracked(progress, previous)
            .await
            .map_err(|interrupted| interrupted.error)
    }

    pub async fn resume_tracked(
        &self,
        progress: Progress,
        previous: &ResourceSnapshot,
    ) -> std::result::Result<Progress, Interrupted> {
        tracing::info!("Reconciling cluster {}", progress.model.cluster_name);

        let mut progress = progress;
        for field in UpdateField::ALL {
            progress = match self.update_field(progress.clone(), previous, field).await {
                Ok(next) => next,
                Err(error) => return Err(Interrupted { progress, error }),
            };
        }

        progress = match self.refresh(progress.clone()).await {
            Ok(next) => next,
            Err(error) => return Err(Interrupted { progress, error }),
        };

        let tags = TagReconciler::new(&self.client, self.watcher());
        progress = match tags.add_tags(progress.clone(), &previous.tags).await {
            Ok(next) => next,
            Err(error) => return Err(Interrupted { progress, error }),
        };
        progress = match tags.remove_tags(progress.clone(), &previous.tags).await {
            Ok(next) => next,
            Err(error) => return Err(Interrupted { progress, error }),
        };

        progress = match self.list_tags(progress.clone()).await {
            Ok(next) => next,
            Err(error) => return Err(Interrupted { progress, error }),
        };

        tracing::info!(
            "Cluster {} reconciled ({} step(s) applied, {} poll(s))",
            progress.model.cluster_name,
            progress.context.confirmed_steps.len(),
            progress.context.poll_count
        );
        Ok(progress)
    }

    /// Update a single field if it differs, then wait until the change is visible
    pub async fn update_field(
        &self,
        progress: Progress,
        previous: &ResourceSnapshot,
        field: UpdateField,
    ) -> Result<Progress> {
        let spec = field::lookup(field).ok_or(ReconcileError::ProgrammingContract { field })?;
        let step = ReconcileStep::Field(field);

        if !spec.is_modified(&progress.model, previous, self.config.unset_policy) {
            tracing::debug!("{} unchanged, skipping", field);
            return Ok(progress);
        }

        let request = spec.request(&progress.model);
        tracing::info!(
            "Updating {} of {} to {}",
            field,
            request.cluster_name,
            request.change.value_json()
        );
        self.client
            .submit_field_mutation(&request)
            .await
            .map_err(|e| classify::translate(step, e))?;

        let polls = self
            .watcher()
            .wait(step, &progress.model, Acceptance::Field(spec))
            .await?;
        Ok(progress.confirm(step, polls))
    }

    /// Carry the cluster's identity and status into the model
    async fn refresh(&self, progress: Progress) -> Result<Progress> {
        let observed = self
            .client
            .read_resource(&progress.model.cluster_name)
            .await
            .map_err(|e| classify::translate(ReconcileStep::Refresh, e))?;

        let mut model = progress.model.clone();
        model.arn = observed.arn.or(model.arn);
        model.status = observed.status;
        Ok(progress.with_model(model))
    }

    /// Replace the model's tags with what the remote actually reports
    async fn list_tags(&self, progress: Progress) -> Result<Progress> {
        let step = ReconcileStep::ListTags;
        let arn = progress
            .model
            .arn
            .clone()
            .ok_or(ReconcileError::MissingIdentity { step })?;

        let tags = self
            .client
            .list_tags(&arn)
            .await
            .map_err(|e| classify::translate(step, e))?;

        let mut model = progress.model.clone();
        model.tags = tags;
        Ok(progress.with_model(model))
    }

    fn watcher(&self) -> StabilizationWatcher<'_, C, D> {
        StabilizationWatcher::new(&self.client, &self.delay, &self.config)
    }
}
