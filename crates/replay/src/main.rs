//! Proctoring Trace Replay - Main Entry Point

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use replay::{init_logging, parse_trace, replay, EngineConfig};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{FileStore, MemoryStore, SideStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSONL trace to replay
    #[arg(long)]
    trace: PathBuf,

    /// TOML engine configuration
    #[arg(long, env = "PROCTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Durable side-store file; in-memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics after the replay
    #[arg(long)]
    metrics: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs, args.verbose)?;

    info!("=== Proctor Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("installing metrics recorder")?,
        )
    } else {
        None
    };

    let config = EngineConfig::load(args.config.as_deref()).context("loading configuration")?;

    let store: Arc<dyn SideStore> = match &args.store {
        Some(path) => Arc::new(
            FileStore::open(path)
                .with_context(|| format!("opening side-store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let raw = tokio::fs::read_to_string(&args.trace)
        .await
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let lines = parse_trace(Cursor::new(raw))?;

    let report = replay(&lines, &config, store)?;

    match &report.payload {
        Some(payload) => println!("{}", serde_json::to_string_pretty(payload)?),
        None => info!("Trace ended without a submission"),
    }

    if let Some(handle) = metrics {
        print!("{}", handle.render());
    }

    Ok(())
}
