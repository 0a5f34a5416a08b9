//! Per-field comparison of desired and current values

use serde::{Deserialize, Serialize};

/// How an unset desired value is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsetPolicy {
    /// Unset is a value of its own: unset vs. set counts as modified
    #[default]
    Literal,
    /// An unset desired value leaves the field unmanaged
    IgnoreUnset,
}

/// Whether `desired` differs from `current`
///
/// Set-valued fields are stored as `BTreeSet`, so their comparison is
/// order-independent.
pub fn is_modified<T: PartialEq>(
    desired: &Option<T>,
    current: &Option<T>,
    policy: UnsetPolicy,
) -> bool {
    match (policy, desired) {
        (UnsetPolicy::IgnoreUnset, None) => false,
        _ => desired != current,
    }
}
