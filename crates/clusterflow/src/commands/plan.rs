use crate::settings::Settings;
use crate::utils;
use clusterflow_reconcile::{ResourceSnapshot, StateManager, plan};
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    project_root: &Path,
    settings: &Settings,
    desired: &Path,
    previous: Option<&Path>,
) -> anyhow::Result<()> {
    let desired = utils::load_snapshot(desired)?;
    let state = StateManager::new(project_root).load().await?;

    let previous = match utils::resolve_previous(previous, &state, &desired.cluster_name)? {
        Some(previous) => previous,
        None => {
            println!(
                "{}",
                "No previous state found; planning against an empty cluster.".yellow()
            );
            ResourceSnapshot::new(desired.cluster_name.clone())
        }
    };

    let plan = plan::plan(&desired, &previous, settings.reconcile.unset_policy);
    utils::print_plan(&plan);
    Ok(())
}
