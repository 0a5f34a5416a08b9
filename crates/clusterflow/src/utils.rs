use anyhow::Context;
use clusterflow_reconcile::{AppliedState, Plan, ReconcileStep, ResourceSnapshot};
use colored::Colorize;
use std::path::Path;

/// Load a cluster snapshot from a YAML file
pub fn load_snapshot(path: &Path) -> anyhow::Result<ResourceSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: ResourceSnapshot = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;

    if snapshot.cluster_name.is_empty() {
        anyhow::bail!("{} does not name a cluster (cluster_name)", path.display());
    }
    Ok(snapshot)
}

/// Snapshot given with `--previous`, which must describe the desired cluster
pub fn load_previous(path: &Path, cluster_name: &str) -> anyhow::Result<ResourceSnapshot> {
    let snapshot = load_snapshot(path)?;
    if snapshot.cluster_name != cluster_name {
        anyhow::bail!(
            "Previous snapshot is for cluster {}, desired is for {}",
            snapshot.cluster_name,
            cluster_name
        );
    }
    Ok(snapshot)
}

/// Previous state for a plan without remote calls
///
/// An interrupted run's record wins over `--previous`, then the file, then
/// the last applied snapshot.
pub fn resolve_previous(
    previous: Option<&Path>,
    state: &AppliedState,
    cluster_name: &str,
) -> anyhow::Result<Option<ResourceSnapshot>> {
    if let Some(stored) = state.get(cluster_name).filter(|c| c.is_interrupted()) {
        if let Some(step) = stored.interrupted_at {
            println!(
                "{}",
                format!(
                    "Last apply stopped at {}; its outcome is checked against the cluster on apply.",
                    step
                )
                .yellow()
            );
        }
        return Ok(Some(stored.snapshot.clone()));
    }

    if let Some(path) = previous {
        return load_previous(path, cluster_name).map(Some);
    }

    Ok(state.previous_snapshot(cluster_name).cloned())
}

/// Print a plan in execution order
pub fn print_plan(plan: &Plan) {
    println!("Plan for cluster {}:", plan.cluster_name.cyan());

    if !plan.has_changes {
        println!("  {}", "No changes. Cluster is up to date.".green());
        return;
    }

    for planned in &plan.steps {
        match planned.step {
            ReconcileStep::Field(field) => {
                let from = planned.details.get("from").cloned().unwrap_or_default();
                let to = planned.details.get("to").cloned().unwrap_or_default();
                println!(
                    "  {} {}: {} -> {}",
                    "~".yellow(),
                    field.to_string().bold(),
                    from,
                    to
                );
            }
            ReconcileStep::AddTags => {
                println!("  {} {}", "+".green(), planned.description);
                print_keys(planned.details.get("keys"));
            }
            ReconcileStep::RemoveTags => {
                println!("  {} {}", "-".red(), planned.description);
                print_keys(planned.details.get("keys"));
            }
            _ => println!("    {}", planned.description),
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

fn print_keys(keys: Option<&serde_json::Value>) {
    let keys = keys.and_then(|k| k.as_array()).into_iter().flatten();
    for key in keys.filter_map(|k| k.as_str()) {
        println!("      {}", key);
    }
}
