//! Reconciliation error types

use crate::field::UpdateField;
use crate::progress::{Progress, ReconcileStep};
use thiserror::Error;

/// Failure reported by a remote cluster API call
///
/// `code` is the service's error code (e.g. `ClusterNotFoundFault`) and is
/// what [`crate::classify`] inspects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(cluster_name: &str) -> Self {
        Self::new(
            crate::classify::CLUSTER_NOT_FOUND,
            format!("Cluster {} not found", cluster_name),
        )
    }
}

/// A failed run together with the steps it confirmed before failing
#[derive(Error, Debug)]
#[error("Reconciliation of {} stopped", .progress.model.cluster_name)]
pub struct Interrupted {
    /// Progress as of the last confirmed step
    pub progress: Progress,

    #[source]
    pub error: ReconcileError,
}

/// Reconciliation errors
///
/// Every variant raised by the update pipeline names the step it stopped at.
/// Steps after it were never attempted.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Cluster not found during {step}: {message}")]
    NotFound {
        step: ReconcileStep,
        message: String,
    },

    #[error("Invalid request during {step}: {message}")]
    InvalidRequest {
        step: ReconcileStep,
        message: String,
    },

    #[error("Update of {field} stabilized but the field was not changed")]
    StabilizationMismatch { field: UpdateField },

    #[error("Remote call failed during {step}: {source}")]
    Remote {
        step: ReconcileStep,
        #[source]
        source: RemoteError,
    },

    #[error("No handler registered for update field {field}")]
    ProgrammingContract { field: UpdateField },

    #[error("Cluster did not stabilize during {step} after {polls} polls")]
    StabilizationTimeout { step: ReconcileStep, polls: u32 },

    #[error("Cluster identity could not be resolved during {step}")]
    MissingIdentity { step: ReconcileStep },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconcileError {
    /// The pipeline step this error stopped at, if it came from the pipeline
    pub fn step(&self) -> Option<ReconcileStep> {
        match self {
            ReconcileError::NotFound { step, .. }
            | ReconcileError::InvalidRequest { step, .. }
            | ReconcileError::Remote { step, .. }
            | ReconcileError::StabilizationTimeout { step, .. }
            | ReconcileError::MissingIdentity { step } => Some(*step),
            ReconcileError::StabilizationMismatch { field }
            | ReconcileError::ProgrammingContract { field } => Some(ReconcileStep::Field(*field)),
            _ => None,
        }
    }

    /// Whether the caller's own retry policy may re-run the reconciliation
    ///
    /// Only unclassified remote failures and an exhausted poll budget qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Remote { .. } | ReconcileError::StabilizationTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
