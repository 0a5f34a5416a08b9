//! Applied-state management
//!
//! Manages the `.clusterflow/state.json` file which records the last
//! successfully applied snapshot of every cluster, used as the previous state
//! of the next reconciliation.

use crate::error::{Interrupted, ReconcileError, Result};
use crate::progress::{Progress, ReconcileStep};
use crate::snapshot::ResourceSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".clusterflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// All applied clusters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Clusters indexed by cluster name
    pub clusters: HashMap<String, AppliedCluster>,
}

impl Default for AppliedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            clusters: HashMap::new(),
        }
    }
}

impl AppliedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a successful reconciliation
    pub fn record(&mut self, progress: &Progress) {
        let cluster = AppliedCluster {
            snapshot: progress.model.clone(),
            confirmed_steps: progress.context.confirmed_steps.clone(),
            applied_at: Utc::now(),
            interrupted_at: None,
        };
        self.clusters
            .insert(progress.model.cluster_name.clone(), cluster);
        self.updated_at = Utc::now();
    }

    /// Record how far a failed reconciliation got
    ///
    /// The stored snapshot is `previous` with the confirmed steps applied, so
    /// the next run only diffs what is still outstanding. The failing step's
    /// own outcome is unknown and is re-read from the cluster next time.
    pub fn record_interrupted(&mut self, interrupted: &Interrupted, previous: &ResourceSnapshot) {
        let progress = &interrupted.progress;
        let cluster = AppliedCluster {
            snapshot: progress.applied_over(previous),
            confirmed_steps: progress.context.confirmed_steps.clone(),
            applied_at: Utc::now(),
            interrupted_at: interrupted.error.step(),
        };
        self.clusters
            .insert(progress.model.cluster_name.clone(), cluster);
        self.updated_at = Utc::now();
    }

    pub fn get(&self, cluster_name: &str) -> Option<&AppliedCluster> {
        self.clusters.get(cluster_name)
    }

    /// Last applied snapshot, usable as the previous state
    pub fn previous_snapshot(&self, cluster_name: &str) -> Option<&ResourceSnapshot> {
        self.get(cluster_name).map(|c| &c.snapshot)
    }

    pub fn remove(&mut self, cluster_name: &str) -> Option<AppliedCluster> {
        let result = self.clusters.remove(cluster_name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }
}

/// Last applied state of a single cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedCluster {
    /// Snapshot returned by the reconciliation
    pub snapshot: ResourceSnapshot,

    /// Steps that changed something in that run
    pub confirmed_steps: Vec<ReconcileStep>,

    pub applied_at: DateTime<Utc>,

    /// Step the last run failed at, if it did not finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted_at: Option<ReconcileStep>,
}

impl AppliedCluster {
    pub fn is_interrupted(&self) -> bool {
        self.interrupted_at.is_some()
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the applied state
    pub async fn load(&self) -> Result<AppliedState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(AppliedState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: AppliedState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(ReconcileError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} clusters", state.clusters.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &AppliedState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} clusters", state.clusters.len());
        Ok(())
    }

    /// Acquire a lock for exclusive access
    ///
    /// The lock file is created exclusively, so only one caller can win. A
    /// lock older than one hour is considered stale and broken once.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&lock_info)?;

        for _ in 0..2 {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
                .await;

            match created {
                Ok(mut file) => {
                    file.write_all(content.as_bytes()).await?;
                    file.flush().await?;
                    tracing::debug!("Acquired state lock");
                    return Ok(StateLock {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    Self::break_stale_lock(&lock_path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReconcileError::LockError(
            "State lock is contended by another process".to_string(),
        ))
    }

    /// Remove an existing lock if it is stale, fail if it is held
    async fn break_stale_lock(lock_path: &Path) -> Result<()> {
        let content = match fs::read_to_string(lock_path).await {
            Ok(content) => content,
            // Released in the meantime
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // An unreadable lock is one still being written by its holder
        let Ok(lock_info) = serde_json::from_str::<LockInfo>(&content) else {
            return Err(ReconcileError::LockError(
                "State is being locked by another process".to_string(),
            ));
        };

        let age = Utc::now().signed_duration_since(lock_info.acquired_at);
        if age.num_hours() < 1 {
            return Err(ReconcileError::LockError(format!(
                "State is locked by {} since {}",
                lock_info.holder, lock_info.acquired_at
            )));
        }

        tracing::warn!("Removing stale lock from {}", lock_info.holder);
        match fs::remove_file(lock_path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
