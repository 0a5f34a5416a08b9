//! Reconciliation against the applied-state store
//!
//! [`Reconciler::apply`] is the unit of work behind `clusterflow apply`: it
//! holds the store lock for the whole run, picks the previous state, and
//! records either the converged model or how far a failed run got.

use crate::classify;
use crate::client::{ClusterClient, Delay};
use crate::error::Result;
use crate::field;
use crate::plan::Plan;
use crate::progress::{Progress, ReconcileStep};
use crate::reconciler::Reconciler;
use crate::snapshot::ResourceSnapshot;
use crate::state::{AppliedState, StateManager};

impl<C: ClusterClient, D: Delay> Reconciler<C, D> {
    /// Previous state to diff `desired` against
    ///
    /// Order of precedence:
    /// 1. an interrupted record in `state`, with the step it stopped at
    ///    re-read from the cluster (its outcome is unknown)
    /// 2. `explicit`
    /// 3. the last applied snapshot in `state`
    /// 4. the live cluster
    pub async fn previous_state(
        &self,
        state: &AppliedState,
        desired: &ResourceSnapshot,
        explicit: Option<&ResourceSnapshot>,
    ) -> Result<ResourceSnapshot> {
        let cluster_name = &desired.cluster_name;

        if let Some(stored) = state.get(cluster_name).filter(|c| c.is_interrupted()) {
            if explicit.is_some() {
                tracing::warn!(
                    "Last run on {} was interrupted; resuming from the stored state instead of the given previous snapshot",
                    cluster_name
                );
            }

            let mut previous = stored.snapshot.clone();
            match stored.interrupted_at {
                Some(ReconcileStep::Field(field)) => {
                    let live = self.live_snapshot(cluster_name).await?;
                    if let Some(spec) = field::lookup(field) {
                        tracing::debug!("Re-reading {} of {} from the cluster", field, cluster_name);
                        spec.change(&live).apply_to(&mut previous);
                    }
                }
                Some(ReconcileStep::AddTags | ReconcileStep::RemoveTags | ReconcileStep::ListTags) => {
                    previous.tags = self.live_snapshot(cluster_name).await?.tags;
                }
                Some(ReconcileStep::Refresh) | None => {}
            }
            return Ok(previous);
        }

        if let Some(explicit) = explicit {
            return Ok(explicit.clone());
        }
        if let Some(stored) = state.previous_snapshot(cluster_name) {
            return Ok(stored.clone());
        }

        tracing::info!(
            "No previous state for {}, using its current configuration",
            cluster_name
        );
        self.live_snapshot(cluster_name).await
    }

    /// Reconcile `desired` under the store lock and record the outcome
    ///
    /// `on_plan` sees the plan before anything is submitted. On failure the
    /// progress made so far is saved, so re-running resumes at the first
    /// step that had not converged.
    pub async fn apply(
        &self,
        store: &StateManager,
        desired: &ResourceSnapshot,
        explicit: Option<&ResourceSnapshot>,
        on_plan: impl FnOnce(&Plan),
    ) -> Result<Progress> {
        let lock = store.acquire_lock().await?;
        let mut state = store.load().await?;

        let previous = self.previous_state(&state, desired, explicit).await?;
        on_plan(&self.plan(desired, &previous));

        match self.reconcile_tracked(desired, &previous).await {
            Ok(progress) => {
                state.record(&progress);
                store.save(&state).await?;
                lock.release().await?;
                Ok(progress)
            }
            Err(interrupted) => {
                state.record_interrupted(&interrupted, &previous);
                if let Err(e) = store.save(&state).await {
                    tracing::error!("Failed to save progress of {}: {}", desired.cluster_name, e);
                }
                drop(lock);
                Err(interrupted.error)
            }
        }
    }

    /// Current configuration and tags of the cluster
    async fn live_snapshot(&self, cluster_name: &str) -> Result<ResourceSnapshot> {
        let mut live = self
            .client()
            .read_resource(cluster_name)
            .await
            .map_err(|e| classify::translate(ReconcileStep::Refresh, e))?;

        if let Some(arn) = live.arn.clone() {
            live.tags = self
                .client()
                .list_tags(&arn)
                .await
                .map_err(|e| classify::translate(ReconcileStep::ListTags, e))?;
        }
        Ok(live)
    }
}
