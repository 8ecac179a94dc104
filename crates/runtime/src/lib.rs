//! Runtime for the shop-floor simulation: tracing bootstrap, configuration, the
//! single authoritative fleet scheduler, snapshot sinks, metrics and the timely
//! worker bootstrap used by the dataflow views.

use anyhow::{anyhow, Result};
use timely::communication::allocator::Generic;
use timely::worker::Worker;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod metrics;
pub mod scheduler;
pub mod sink;

pub use config::SimulationConfig;
pub use metrics::{EpochTimer, MetricsRegistry, MetricsSnapshot};
pub use scheduler::{FleetHandle, FleetScheduler, FleetUpdate};
pub use sink::{JsonLinesSink, SnapshotSink};

/// Logs go to stderr; stdout is reserved for JSON-lines output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Start a single-process timely runtime with `workers` threads, run `f` once per
/// worker and collect each worker's result in index order.
pub fn start_runtime<T, F>(workers: usize, f: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(&mut Worker<Generic>) -> T + Send + Sync + 'static,
{
    let workers = workers.max(1);
    info!(%workers, "starting timely runtime");
    let guards = timely::execute(timely::Config::process(workers), f).map_err(|e| anyhow!(e))?;
    guards
        .join()
        .into_iter()
        .map(|result| result.map_err(|e| anyhow!("timely worker failed: {e}")))
        .collect()
}
