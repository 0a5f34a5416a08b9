use crate::settings::Settings;
use crate::utils;
use clusterflow_memorydb::MemoryDbClusterClient;
use clusterflow_reconcile::{Reconciler, StateManager};
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    project_root: &Path,
    settings: &Settings,
    desired: &Path,
    previous: Option<&Path>,
    region: Option<String>,
) -> anyhow::Result<()> {
    let desired = utils::load_snapshot(desired)?;
    let cluster_name = desired.cluster_name.clone();
    let previous = previous
        .map(|path| utils::load_previous(path, &cluster_name))
        .transpose()?;

    let region = region.or_else(|| settings.region.clone());
    let client = MemoryDbClusterClient::from_env(region).await;
    let reconciler = Reconciler::new(client, settings.reconcile.clone());
    let manager = StateManager::new(project_root);

    let mut started = false;
    let result = reconciler
        .apply(&manager, &desired, previous.as_ref(), |plan| {
            started = true;
            utils::print_plan(plan);
            println!();
            println!("{}", format!("Applying to {}...", cluster_name).blue());
        })
        .await;

    let progress = match result {
        Ok(progress) => progress,
        Err(e) => {
            if started && e.step().is_some() {
                eprintln!(
                    "{}",
                    "Progress was saved; re-running apply continues from the step that failed."
                        .yellow()
                );
            }
            if e.is_retryable() {
                eprintln!("{}", "The failure may be transient.".yellow());
            }
            return Err(e.into());
        }
    };

    println!(
        "{} {} ({} step(s), {} poll(s))",
        "✓".green(),
        format!("Cluster {} is up to date", cluster_name).green().bold(),
        progress.context.confirmed_steps.len(),
        progress.context.poll_count
    );
    Ok(())
}
