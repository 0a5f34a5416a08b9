//! Post-mutation stabilization polling

use crate::classify;
use crate::client::{ClusterClient, Delay};
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::field::FieldSpec;
use crate::progress::ReconcileStep;
use crate::snapshot::ResourceSnapshot;

/// Result of evaluating one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizationOutcome {
    /// A modification is still in progress
    Settling,
    /// Terminal status reached and the change is visible
    Confirmed,
    /// Terminal status reached but the field still differs from the desired value
    Mismatched,
}

/// What must hold once the cluster reaches a terminal status
#[derive(Debug, Clone, Copy)]
pub enum Acceptance {
    /// The just-mutated field must match the desired snapshot
    Field(&'static FieldSpec),
    /// Terminal status alone is enough (tag changes)
    TerminalStatus,
}

/// Polls a cluster until a submitted change has settled
pub struct StabilizationWatcher<'a, C, D> {
    client: &'a C,
    delay: &'a D,
    config: &'a ReconcileConfig,
}

impl<'a, C: ClusterClient, D: Delay> StabilizationWatcher<'a, C, D> {
    pub fn new(client: &'a C, delay: &'a D, config: &'a ReconcileConfig) -> Self {
        Self {
            client,
            delay,
            config,
        }
    }

    /// Evaluate a single observation against `desired`
    pub fn evaluate(
        &self,
        desired: &ResourceSnapshot,
        observed: &ResourceSnapshot,
        acceptance: Acceptance,
    ) -> StabilizationOutcome {
        if !observed.is_terminal(&self.config.terminal_statuses) {
            return StabilizationOutcome::Settling;
        }

        match acceptance {
            Acceptance::TerminalStatus => StabilizationOutcome::Confirmed,
            Acceptance::Field(spec) => {
                if spec.is_modified(desired, observed, self.config.unset_policy) {
                    StabilizationOutcome::Mismatched
                } else {
                    StabilizationOutcome::Confirmed
                }
            }
        }
    }

    /// Poll until `acceptance` holds, returning the number of polls issued
    ///
    /// Every poll is preceded by the configured delay so that the remote has
    /// a chance to leave its terminal status after accepting the change.
    pub async fn wait(
        &self,
        step: ReconcileStep,
        desired: &ResourceSnapshot,
        acceptance: Acceptance,
    ) -> Result<u32> {
        let max_polls = self.config.poll.max_polls;

        for attempt in 0..max_polls {
            self.delay
                .wait(self.config.poll.delay_for_attempt(attempt))
                .await;

            let observed = self
                .client
                .read_resource(&desired.cluster_name)
                .await
                .map_err(|e| classify::translate(step, e))?;

            match (self.evaluate(desired, &observed, acceptance), acceptance) {
                (StabilizationOutcome::Settling, _) => {
                    tracing::debug!(
                        "{} still settling on {} (status: {}, poll {}/{})",
                        desired.cluster_name,
                        step,
                        observed.status.as_deref().unwrap_or("unknown"),
                        attempt + 1,
                        max_polls
                    );
                }
                (StabilizationOutcome::Mismatched, Acceptance::Field(spec)) => {
                    // Terminal without the change: the remote accepted the request
                    // but could not honor it (e.g. node type out of capacity).
                    tracing::warn!(
                        "{} reached status {} but {} was not applied",
                        desired.cluster_name,
                        observed.status.as_deref().unwrap_or("unknown"),
                        spec.field
                    );
                    return Err(ReconcileError::StabilizationMismatch { field: spec.field });
                }
                (StabilizationOutcome::Confirmed, _)
                | (StabilizationOutcome::Mismatched, Acceptance::TerminalStatus) => {
                    tracing::debug!(
                        "{} stabilized after {} on poll {}",
                        desired.cluster_name,
                        step,
                        attempt + 1
                    );
                    return Ok(attempt + 1);
                }
            }
        }

        Err(ReconcileError::StabilizationTimeout {
            step,
            polls: max_polls,
        })
    }
}
