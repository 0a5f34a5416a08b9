use clusterflow_reconcile::ReconcileConfig;
use serde::Deserialize;

/// Contents of `clusterflow.yaml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// AWS region used when `--region` is not given
    pub region: Option<String>,

    /// Engine settings
    pub reconcile: ReconcileConfig,
}
