//! Progress token threaded through every reconciliation step

use crate::field::{self, UpdateField};
use crate::snapshot::ResourceSnapshot;
use serde::{Deserialize, Serialize};

/// A single step of the reconciliation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum ReconcileStep {
    /// Update of one field
    Field(UpdateField),
    /// Re-read of the cluster after all field updates
    Refresh,
    /// Addition of missing or changed tags
    AddTags,
    /// Removal of tags no longer desired
    RemoveTags,
    /// Final listing of the cluster's tags
    ListTags,
}

impl std::fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileStep::Field(field) => write!(f, "update {}", field),
            ReconcileStep::Refresh => write!(f, "refresh"),
            ReconcileStep::AddTags => write!(f, "add tags"),
            ReconcileStep::RemoveTags => write!(f, "remove tags"),
            ReconcileStep::ListTags => write!(f, "list tags"),
        }
    }
}

/// Bookkeeping carried alongside the model between steps
///
/// Purely informational: a resumed run re-diffs every field rather than
/// trusting `confirmed_steps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    /// Mutating steps that were submitted and confirmed stable
    pub confirmed_steps: Vec<ReconcileStep>,

    /// Total stabilization polls issued so far
    pub poll_count: u32,
}

/// Immutable progress record: each step takes one and returns the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Desired model, enriched with identity and tags as steps complete
    pub model: ResourceSnapshot,

    pub context: CallbackContext,
}

impl Progress {
    pub fn new(model: ResourceSnapshot) -> Self {
        Self {
            model,
            context: CallbackContext::default(),
        }
    }

    pub fn resume(model: ResourceSnapshot, context: CallbackContext) -> Self {
        Self { model, context }
    }

    /// Record `step` as confirmed after `polls` stabilization polls
    pub fn confirm(mut self, step: ReconcileStep, polls: u32) -> Self {
        self.context.confirmed_steps.push(step);
        self.context.poll_count = self.context.poll_count.saturating_add(polls);
        self
    }

    pub fn with_model(mut self, model: ResourceSnapshot) -> Self {
        self.model = model;
        self
    }

    pub fn is_confirmed(&self, step: ReconcileStep) -> bool {
        self.context.confirmed_steps.contains(&step)
    }

    /// `previous` with every confirmed step's effect applied
    ///
    /// This is what the cluster is known to look like when a run stops early.
    pub fn applied_over(&self, previous: &ResourceSnapshot) -> ResourceSnapshot {
        let mut applied = previous.clone();
        for step in &self.context.confirmed_steps {
            match step {
                ReconcileStep::Field(field) => {
                    if let Some(spec) = field::lookup(*field) {
                        spec.change(&self.model).apply_to(&mut applied);
                    }
                }
                ReconcileStep::AddTags => applied.tags.extend(self.model.tags.clone()),
                ReconcileStep::RemoveTags => {
                    applied.tags.retain(|key, _| self.model.tags.contains_key(key))
                }
                ReconcileStep::Refresh | ReconcileStep::ListTags => {}
            }
        }
        if self.model.arn.is_some() {
            applied.arn = self.model.arn.clone();
        }
        applied
    }
}
