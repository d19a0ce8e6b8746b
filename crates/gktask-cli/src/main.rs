//! gktask - policy test bundle rewriter
//!
//! Turns policy test cases into isolated, deployable benchmark artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gktask_cli::{load_config, rewrite_plan, Plan};
use gktask_manifest::Scope;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// gktask - policy test bundle rewriter
#[derive(Parser, Debug)]
#[command(name = "gktask")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite every case of a plan into task artifacts
    Rewrite {
        /// Path to the plan file
        #[arg(long)]
        plan: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Path to generator configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the scope of each kind
    Scope {
        /// Resource kinds, e.g. `ClusterRole`
        #[arg(required = true)]
        kinds: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }

    match cli.command {
        Commands::Rewrite { plan, out, config } => {
            let config = load_config(config.as_deref()).context("failed to load configuration")?;
            let plan = Plan::from_file(&plan)
                .with_context(|| format!("failed to load plan {}", plan.display()))?;
            let summary = rewrite_plan(&plan, &config, &out)
                .with_context(|| format!("failed to write run to {}", out.display()))?;

            println!(
                "{} tasks written to {} ({} tasks skipped, {} cases skipped, {} fallbacks)",
                summary.tasks.len(),
                out.display(),
                summary.skipped_tasks.len(),
                summary.skipped_cases.len(),
                summary.diagnostics.len(),
            );
            Ok(())
        }
        Commands::Scope { kinds } => {
            for kind in kinds {
                println!("{kind}\t{}", Scope::of(&kind));
            }
            Ok(())
        }
    }
}
