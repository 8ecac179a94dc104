use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use differential_dataflow::input::InputSession;
use timely::dataflow::operators::probe::Handle as ProbeHandle;

use sf_machines::MachineFactory;
use sf_runtime::metrics::EpochTimer;
use sf_runtime::{init_tracing, start_runtime, FleetScheduler, SimulationConfig};
use sf_views::{alarm_alerts, execution_counts, top_k_by_load, MachineRow, RowTracker, TopKConfig};

/// Tick the default fleet and maintain incremental views over it.
#[derive(Parser, Debug)]
struct Args {
    /// JSON simulation config.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 120)]
    ticks: u64,
    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0)]
    dt: f64,
    #[arg(long, default_value_t = 3)]
    top_k: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    info!(?config, ticks = args.ticks, "fleet_demo starting");

    let ticks = args.ticks;
    let dt = args.dt;
    let k = args.top_k;
    let results = start_runtime(1, move |worker| {
        let fleet = MachineFactory::new(config.factory_options()).create_default_fleet();
        let (mut scheduler, handle) = FleetScheduler::new(fleet, config.clone());
        let metrics = handle.metrics();

        let mut input: InputSession<u64, MachineRow, isize> = InputSession::new();
        let mut probe = ProbeHandle::new();

        worker.dataflow::<u64, _, _>(|scope| {
            let rows = input.to_collection(scope);

            execution_counts(&rows)
                .inspect(|x| info!(?x, "execution mode count"))
                .probe_with(&mut probe);

            top_k_by_load(&TopKConfig { k }, &rows)
                .inspect(|x| info!(?x, "top spindle load"))
                .probe_with(&mut probe);

            alarm_alerts(&rows)
                .inspect(|x| info!(?x, "ALERT: machine in alarm"))
                .probe_with(&mut probe);
        });

        let mut tracker = RowTracker::default();
        for epoch in 0..ticks {
            let epoch_timer = EpochTimer::start();
            let update = scheduler.tick(dt);
            for (row, diff) in tracker.diff(update.snapshot.values()) {
                input.update(row, diff);
            }

            input.advance_to(epoch + 1);
            input.flush();
            while probe.less_than(input.time()) {
                worker.step();
            }

            let summary = &update.summary;
            info!(
                epoch,
                duration_ms = epoch_timer.elapsed().as_millis(),
                running = summary.running_machines,
                idle = summary.idle_machines,
                alarm = summary.alarm_machines,
                parts = summary.total_parts,
                avg_load = summary.average_spindle_load,
                "epoch complete"
            );
        }
        metrics.snapshot()
    })?;

    for snapshot in results {
        println!("{}", snapshot.to_json_line("fleet_demo", None));
    }
    Ok(())
}
