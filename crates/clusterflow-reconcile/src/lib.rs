//! ClusterFlow update reconciliation
//!
//! This crate converges a managed cluster (a MemoryDB-style clustered data
//! store) from its last applied configuration to a desired one. Each
//! updatable field is diffed, submitted as its own remote mutation and
//! confirmed stable before the next one starts; tags are reconciled last.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 ClusterFlow CLI                  │
//! │             (clusterflow plan/apply)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              clusterflow-reconcile               │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler (field sequence → tags)       │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Stabilization│  │ Tag deltas   │            │
//! │  │   watcher    │  │              │            │
//! │  └──────────────┘  └──────────────┘            │
//! │  trait ClusterClient { ... }  trait Delay { ... }│
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │   memorydb    │
//! │    client     │
//! └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use clusterflow_reconcile::{ReconcileConfig, Reconciler};
//!
//! let reconciler = Reconciler::new(client, ReconcileConfig::default());
//! let progress = reconciler.reconcile(&desired, &previous).await?;
//! println!("converged: {:?}", progress.context.confirmed_steps);
//! ```

pub mod apply;
pub mod classify;
pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod field;
pub mod plan;
pub mod progress;
pub mod reconciler;
pub mod snapshot;
pub mod stabilize;
pub mod state;
pub mod tags;

// Re-exports
pub use classify::{ErrorClass, classify};
pub use client::{ClusterClient, Delay, TokioDelay};
pub use config::{PollConfig, ReconcileConfig};
pub use diff::UnsetPolicy;
pub use error::{Interrupted, ReconcileError, RemoteError, Result};
pub use field::{FieldChange, FieldSpec, UpdateField, UpdateRequest};
pub use plan::{Plan, PlanSummary, PlannedStep};
pub use progress::{CallbackContext, Progress, ReconcileStep};
pub use reconciler::Reconciler;
pub use snapshot::ResourceSnapshot;
pub use stabilize::{Acceptance, StabilizationOutcome, StabilizationWatcher};
pub use state::{AppliedCluster, AppliedState, StateLock, StateManager};
pub use tags::{TagDelta, TagReconciler};
