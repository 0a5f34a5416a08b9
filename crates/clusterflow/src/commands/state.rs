use crate::StateCommands;
use clusterflow_reconcile::StateManager;
use colored::Colorize;
use std::path::Path;

pub async fn handle(project_root: &Path, command: StateCommands) -> anyhow::Result<()> {
    let state = StateManager::new(project_root).load().await?;

    match command {
        StateCommands::List => {
            if state.clusters.is_empty() {
                println!("{}", "No applied clusters.".yellow());
                return Ok(());
            }
            let mut names: Vec<&String> = state.clusters.keys().collect();
            names.sort();
            for name in names {
                if let Some(cluster) = state.get(name) {
                    let applied_at = cluster.applied_at.format("%Y-%m-%d %H:%M:%S UTC");
                    match cluster.interrupted_at {
                        Some(step) => println!(
                            "  {} (stopped at {} on {})",
                            name.cyan(),
                            step.to_string().yellow(),
                            applied_at
                        ),
                        None => println!("  {} (applied {})", name.cyan(), applied_at),
                    }
                }
            }
        }
        StateCommands::Show { cluster } => {
            let applied = state
                .get(&cluster)
                .ok_or_else(|| anyhow::anyhow!("No applied state for cluster {}", cluster))?;

            println!("# applied at {}", applied.applied_at.to_rfc3339());
            if !applied.confirmed_steps.is_empty() {
                let steps: Vec<String> =
                    applied.confirmed_steps.iter().map(|s| s.to_string()).collect();
                println!("# steps: {}", steps.join(", "));
            }
            if let Some(step) = applied.interrupted_at {
                println!("# stopped at: {}", step);
            }
            print!("{}", serde_yaml::to_string(&applied.snapshot)?);
        }
    }

    Ok(())
}
