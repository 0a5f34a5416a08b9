//! Amazon MemoryDB backend for the reconciliation engine
//!
//! [`MemoryDbClusterClient`] implements
//! [`clusterflow_reconcile::ClusterClient`] on top of `aws-sdk-memorydb`.
//! Service failures keep their AWS error code so the engine can classify
//! them.

pub mod client;
pub mod convert;

pub use client::MemoryDbClusterClient;
pub use convert::{remote_error, snapshot_from_cluster, with_change};
