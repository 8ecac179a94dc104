//! Single authoritative ticker for the fleet.
//!
//! `FleetScheduler` is the only value that can advance machines. It is not
//! `Clone`; everything else talks to the fleet through `FleetHandle`, which can
//! read snapshots, subscribe to updates and trigger the operator transitions
//! (power, alarm clear/inject, tool change) but never tick.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use sf_core::telemetry::{FleetSummary, MachineSnapshot};
use sf_core::AlarmCode;
use sf_machines::{Fleet, FleetError, FleetSnapshot, TickReport};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::metrics::MetricsRegistry;

/// Everything observers learn about one tick.
#[derive(Debug, Clone)]
pub struct FleetUpdate {
    pub tick: u64,
    /// Whether persistence layers should sample this update.
    pub persist: bool,
    pub snapshot: FleetSnapshot,
    pub summary: FleetSummary,
    pub report: TickReport,
}

pub struct FleetScheduler {
    fleet: Arc<RwLock<Fleet>>,
    updates: broadcast::Sender<Arc<FleetUpdate>>,
    config: SimulationConfig,
    metrics: MetricsRegistry,
    tick: u64,
}

#[derive(Clone)]
pub struct FleetHandle {
    fleet: Arc<RwLock<Fleet>>,
    updates: broadcast::Sender<Arc<FleetUpdate>>,
    metrics: MetricsRegistry,
}

impl FleetScheduler {
    pub fn new(fleet: Fleet, config: SimulationConfig) -> (Self, FleetHandle) {
        let fleet = Arc::new(RwLock::new(fleet));
        let (updates, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let metrics = MetricsRegistry::default();
        let handle = FleetHandle {
            fleet: fleet.clone(),
            updates: updates.clone(),
            metrics: metrics.clone(),
        };
        let scheduler = Self {
            fleet,
            updates,
            config,
            metrics,
            tick: 0,
        };
        (scheduler, handle)
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Advance every machine by `dt` seconds, export under the same lock and fan
    /// the result out to subscribers.
    pub fn tick(&mut self, dt: f64) -> Arc<FleetUpdate> {
        let (report, snapshot, summary) = {
            let mut fleet = self.fleet.write();
            let report = fleet.advance_all(dt);
            let snapshot = fleet.export_all();
            let timestamp = fleet.latest_clock().unwrap_or_else(Utc::now);
            let summary = FleetSummary::from_snapshots(snapshot.values(), timestamp);
            (report, snapshot, summary)
        };

        let update = Arc::new(FleetUpdate {
            tick: self.tick,
            persist: self.tick % self.config.persist_every_ticks.max(1) == 0,
            snapshot,
            summary,
            report,
        });
        self.metrics.record_tick(&report);
        if report.alarms_raised > 0 {
            debug!(tick = self.tick, raised = report.alarms_raised, "alarms raised this tick");
        }

        // Sending only fails when nobody is subscribed.
        let receivers = self.updates.send(update.clone()).unwrap_or(0);
        self.metrics.record_subscriber_peak(receivers as u64);

        self.tick += 1;
        update
    }

    /// Tick on the configured interval until `shutdown` fires or its sender is
    /// dropped. The dt handed to the machines is the measured wall-clock gap,
    /// clamped to `max_tick_secs`.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let nominal = self.config.tick_interval().as_secs_f64();
        let mut last: Option<Instant> = None;
        info!(interval_ms = self.config.tick_interval_ms, "fleet scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("scheduler shutdown signal received");
                    break;
                }
                instant = interval.tick() => {
                    let now = instant.into_std();
                    let dt = match last {
                        Some(previous) => now.duration_since(previous).as_secs_f64(),
                        None => nominal,
                    };
                    last = Some(now);
                    let dt = if dt > self.config.max_tick_secs {
                        warn!(dt, max = self.config.max_tick_secs, "tick gap clamped");
                        self.config.max_tick_secs
                    } else {
                        dt
                    };
                    self.tick(dt);
                }
            }
        }
        info!(ticks = self.tick, "fleet scheduler stopped");
    }
}

impl FleetHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FleetUpdate>> {
        self.updates.subscribe()
    }

    pub fn metrics(&self) -> MetricsRegistry {
        self.metrics.clone()
    }

    pub fn snapshot(&self, id: &str) -> Result<MachineSnapshot, FleetError> {
        self.fleet.read().export(id)
    }

    pub fn snapshot_all(&self) -> FleetSnapshot {
        self.fleet.read().export_all()
    }

    pub fn summary(&self) -> FleetSummary {
        self.fleet.read().summary()
    }

    pub fn set_power(&self, id: &str, on: bool) -> Result<(), FleetError> {
        self.fleet.write().set_power(id, on)
    }

    pub fn toggle_power(&self, id: &str) -> Result<bool, FleetError> {
        self.fleet.write().toggle_power(id)
    }

    pub fn clear_alarm(&self, id: &str) -> Result<bool, FleetError> {
        self.fleet.write().clear_alarm(id)
    }

    pub fn inject_alarm(
        &self,
        id: &str,
        code: Option<AlarmCode>,
        message: impl Into<String>,
    ) -> Result<(), FleetError> {
        self.fleet.write().inject_alarm(id, code, message)
    }

    pub fn change_tool(&self, id: &str, slot: u16) -> Result<(), FleetError> {
        self.fleet.write().change_tool(id, slot)
    }
}
