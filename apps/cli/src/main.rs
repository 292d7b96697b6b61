//! train-procgen - launch RL training on a procgen environment.
//!
//! With no arguments this registers the environments and components, builds
//! the experiment definition and trains until the stop criteria are met.

mod config;
mod launcher;

use anyhow::{Context, Result};
use clap::Parser;
use launcher::ProcgenLauncher;
use procgen_core::{framework_registries, BackendKind, LocalRolloutTrainer};
use procgen_training::{train_main, Launcher, StdoutProgressSink, Trainer};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "train-procgen",
    author,
    version,
    about = "Train a reinforcement learning agent on a procgen environment"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the experiment definition as JSON and exit without training
    #[arg(long)]
    print_config: bool,

    /// Artifact root directory (overrides settings and PROCGEN_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn parse_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = config::load_settings()?;

    let level = parse_level(args.log_level.as_deref().unwrap_or_else(|| settings.log_level()));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let launcher = ProcgenLauncher;

    if args.print_config {
        let plan = launcher.launch(framework_registries()?).context("failed to assemble experiment")?;
        println!("{}", serde_json::to_string_pretty(&plan.definition)?);
        return Ok(());
    }

    let output_dir = args.output_dir.unwrap_or_else(|| settings.output_dir());
    let trainer = match settings.backend {
        BackendKind::Local => LocalRolloutTrainer::new(output_dir.clone()),
    };
    info!(output_dir = %output_dir.display(), backend = trainer.id(), "Launching training");

    let manifest = train_main(&launcher, framework_registries()?, &trainer, &StdoutProgressSink)
        .await
        .context("training failed")?;

    info!(
        job_id = %manifest.job_id,
        iterations = manifest.metrics.training_iteration,
        checkpoints = manifest.checkpoints().count(),
        "Training complete"
    );
    Ok(())
}
