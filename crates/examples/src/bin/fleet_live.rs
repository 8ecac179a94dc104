use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use sf_core::telemetry::FleetSummary;
use sf_machines::MachineFactory;
use sf_runtime::{init_tracing, FleetScheduler, JsonLinesSink, SimulationConfig, SnapshotSink};

/// Run the fleet in real time and stream persisted snapshots to stdout as JSON lines.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many updates; runs until Ctrl-C when absent.
    #[arg(long)]
    ticks: Option<u64>,
    /// Override the configured tick interval.
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.tick_interval_ms = interval_ms;
    }
    config.validate()?;

    let fleet = MachineFactory::new(config.factory_options()).create_default_fleet();
    let (scheduler, handle) = FleetScheduler::new(fleet, config);
    let mut updates = handle.subscribe();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let mut sink = JsonLinesSink::new(std::io::stdout());
    let mut last_summary: Option<FleetSummary> = None;
    let mut seen = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received");
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    sink.record(&update)?;
                    sink.flush()?;
                    last_summary = Some(update.summary.clone());
                    seen += 1;
                    if args.ticks.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    let _ = shutdown_tx.send(());
    scheduler_task.await.context("scheduler task failed")?;

    let metrics = handle.metrics().snapshot();
    info!(lines = sink.lines_written(), summary = ?last_summary, "fleet_live stopped");
    eprintln!("{}", metrics.to_json_line("fleet_live", None));
    Ok(())
}
