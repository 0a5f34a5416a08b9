//! Mapping of remote API failures onto the local error taxonomy

use crate::error::{ReconcileError, RemoteError};
use crate::progress::ReconcileStep;

pub const CLUSTER_NOT_FOUND: &str = "ClusterNotFoundFault";
pub const INVALID_PARAMETER_VALUE: &str = "InvalidParameterValueException";
pub const INVALID_PARAMETER_COMBINATION: &str = "InvalidParameterCombinationException";

/// Local classification of a remote failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The cluster no longer exists. Terminal.
    NotFound,
    /// The remote rejected the request as invalid. Terminal.
    InvalidRequest,
    /// Anything else; left to the caller's retry policy.
    Unclassified,
}

pub fn classify(error: &RemoteError) -> ErrorClass {
    match error.code.as_str() {
        CLUSTER_NOT_FOUND => ErrorClass::NotFound,
        INVALID_PARAMETER_VALUE | INVALID_PARAMETER_COMBINATION => ErrorClass::InvalidRequest,
        _ => ErrorClass::Unclassified,
    }
}

/// Translate a remote failure raised at `step` into a [`ReconcileError`]
pub fn translate(step: ReconcileStep, error: RemoteError) -> ReconcileError {
    match classify(&error) {
        ErrorClass::NotFound => ReconcileError::NotFound {
            step,
            message: error.message,
        },
        ErrorClass::InvalidRequest => ReconcileError::InvalidRequest {
            step,
            message: error.message,
        },
        ErrorClass::Unclassified => ReconcileError::Remote {
            step,
            source: error,
        },
    }
}
