//! hand_volume — command-line entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hand_volume::app::{RunOptions, SourceKind, run};
use hand_volume::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hand_volume", version, about = "Set the system volume with a pinch")]
struct Cli {
    /// JSON config file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where hand detections come from
    #[arg(long, value_enum, default_value_t = SourceKind::Sim)]
    source: SourceKind,

    /// Landmark stream for `--source jsonl` (`-` for stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Run without a window (stream sources only)
    #[arg(long)]
    headless: bool,

    /// Override the display scale factor
    #[arg(long)]
    scale: Option<f64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(scale) = cli.scale {
        cfg.scale = scale;
    }
    cfg.validate().context("invalid command-line override")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    if !cli.headless {
        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║        Hand Volume — pinch to set, fist to mute              ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        match cli.source {
            SourceKind::Sim   => println!("  Mode: Keyboard/mouse simulation  (use --source jsonl for a detector)"),
            SourceKind::Jsonl => println!("  Mode: Landmark stream"),
        }
        println!("  Opening visualizer window…");
        println!();
    }

    run(cfg, RunOptions {
        source:   cli.source,
        input:    cli.input,
        headless: cli.headless,
    })
}
