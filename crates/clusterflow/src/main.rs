mod commands;
mod settings;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clusterflow")]
#[command(about = "宣言した構成へ、一歩ずつ。MemoryDB クラスタの更新を収束させる。", long_about = None)]
struct Cli {
    /// デバッグログを有効にする
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 目標状態までに必要なステップを表示
    Plan {
        /// 目標状態のクラスタスナップショット (YAML)
        #[arg(short, long)]
        desired: PathBuf,
        /// 前回のクラスタスナップショット (YAML)。省略時は最後に適用した状態
        /// (中断された apply の記録があればそちらを優先)
        #[arg(short, long)]
        previous: Option<PathBuf>,
    },
    /// クラスタを目標状態に収束させる
    Apply {
        /// 目標状態のクラスタスナップショット (YAML)
        #[arg(short, long)]
        desired: PathBuf,
        /// 前回のクラスタスナップショット (YAML)。省略時は最後に適用した状態
        /// (中断された apply の記録があればそちらを優先)
        #[arg(short, long)]
        previous: Option<PathBuf>,
        /// AWS リージョン (--region フラグ、AWS_REGION 環境変数)
        #[arg(short, long, env = "AWS_REGION")]
        region: Option<String>,
    },
    /// 適用済み状態を参照
    #[command(subcommand)]
    State(StateCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// 適用済み状態を持つクラスタの一覧を表示
    List,
    /// クラスタの最後に適用したスナップショットを表示
    Show {
        /// クラスタ名
        cluster: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Version => {
            println!("clusterflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        command => command,
    };

    let settings: settings::Settings = clusterflow_config::load_settings()?;
    let project_root = std::env::current_dir()?;

    match command {
        Commands::Plan { desired, previous } => {
            commands::plan::handle(&project_root, &settings, &desired, previous.as_deref())
                .await?;
        }
        Commands::Apply {
            desired,
            previous,
            region,
        } => {
            commands::apply::handle(
                &project_root,
                &settings,
                &desired,
                previous.as_deref(),
                region,
            )
            .await?;
        }
        Commands::State(state_cmd) => {
            commands::state::handle(&project_root, state_cmd).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}
