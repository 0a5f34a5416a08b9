//! Dry-run plan of a reconciliation

use crate::diff::UnsetPolicy;
use crate::field::{FIELD_TABLE, UpdateField};
use crate::progress::ReconcileStep;
use crate::snapshot::ResourceSnapshot;
use crate::tags::TagDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mutating step the reconciler would take
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Step to perform
    pub step: ReconcileStep,

    /// Human readable description
    pub description: String,

    /// Additional details (old/new values, tag keys)
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Ordered steps needed to converge a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub cluster_name: String,

    /// Steps in execution order
    pub steps: Vec<PlannedStep>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(cluster_name: impl Into<String>, steps: Vec<PlannedStep>) -> Self {
        let has_changes = !steps.is_empty();
        Self {
            cluster_name: cluster_name.into(),
            steps,
            has_changes,
        }
    }

    pub fn empty(cluster_name: impl Into<String>) -> Self {
        Self::new(cluster_name, Vec::new())
    }

    /// Fields that would be updated, in order
    pub fn field_updates(&self) -> Vec<UpdateField> {
        self.steps
            .iter()
            .filter_map(|s| match s.step {
                ReconcileStep::Field(field) => Some(field),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        let tag_count = |step: ReconcileStep| {
            self.steps
                .iter()
                .filter(|s| s.step == step)
                .filter_map(|s| s.details.get("keys"))
                .filter_map(|keys| keys.as_array().map(Vec::len))
                .sum()
        };

        PlanSummary {
            field_updates: self.field_updates().len(),
            tags_added: tag_count(ReconcileStep::AddTags),
            tags_removed: tag_count(ReconcileStep::RemoveTags),
        }
    }
}

/// Summary of planned steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub field_updates: usize,
    pub tags_added: usize,
    pub tags_removed: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} field(s) to update, {} tag(s) to add, {} tag(s) to remove",
            self.field_updates, self.tags_added, self.tags_removed
        )
    }
}

/// Build the plan for converging `previous` to `desired`
pub fn plan(desired: &ResourceSnapshot, previous: &ResourceSnapshot, policy: UnsetPolicy) -> Plan {
    let mut steps = Vec::new();

    for spec in FIELD_TABLE.iter() {
        if !spec.is_modified(desired, previous, policy) {
            continue;
        }
        steps.push(PlannedStep {
            step: ReconcileStep::Field(spec.field),
            description: format!("Update {} of {}", spec.field, desired.cluster_name),
            details: [
                ("from".to_string(), spec.change(previous).value_json()),
                ("to".to_string(), spec.change(desired).value_json()),
            ]
            .into_iter()
            .collect(),
        });
    }

    let delta = TagDelta::between(&desired.tags, &previous.tags);
    if !delta.to_add.is_empty() {
        steps.push(PlannedStep {
            step: ReconcileStep::AddTags,
            description: format!("Add {} tag(s) to {}", delta.to_add.len(), desired.cluster_name),
            details: [
                (
                    "keys".to_string(),
                    serde_json::Value::from(delta.to_add.keys().cloned().collect::<Vec<_>>()),
                ),
                (
                    "tags".to_string(),
                    serde_json::to_value(&delta.to_add).unwrap_or_default(),
                ),
            ]
            .into_iter()
            .collect(),
        });
    }
    if !delta.to_remove.is_empty() {
        steps.push(PlannedStep {
            step: ReconcileStep::RemoveTags,
            description: format!(
                "Remove {} tag(s) from {}",
                delta.to_remove.len(),
                desired.cluster_name
            ),
            details: [(
                "keys".to_string(),
                serde_json::Value::from(delta.to_remove.iter().cloned().collect::<Vec<_>>()),
            )]
            .into_iter()
            .collect(),
        });
    }

    Plan::new(desired.cluster_name.clone(), steps)
}
