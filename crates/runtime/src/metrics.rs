use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sf_machines::TickReport;

/// Scheduler counters. Clones share the same counters.
#[derive(Clone, Default, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default, Debug)]
struct MetricsInner {
    ticks: AtomicU64,
    machine_updates: AtomicU64,
    parts_completed: AtomicU64,
    alarms_raised: AtomicU64,
    alarms_cleared: AtomicU64,
    subscriber_peak: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_ticks(&self, delta: u64) {
        self.inner.ticks.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_machine_updates(&self, delta: u64) {
        self.inner.machine_updates.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_parts_completed(&self, delta: u64) {
        self.inner.parts_completed.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_alarms_raised(&self, delta: u64) {
        self.inner.alarms_raised.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_alarms_cleared(&self, delta: u64) {
        self.inner.alarms_cleared.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_subscriber_peak(&self, subscribers: u64) {
        self.inner
            .subscriber_peak
            .fetch_max(subscribers, Ordering::Relaxed);
    }

    pub fn record_tick(&self, report: &TickReport) {
        self.inc_ticks(1);
        self.inc_machine_updates(report.machines as u64);
        self.inc_parts_completed(report.parts_completed);
        self.inc_alarms_raised(report.alarms_raised);
        self.inc_alarms_cleared(report.alarms_cleared);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.inner.ticks.load(Ordering::Relaxed),
            machine_updates: self.inner.machine_updates.load(Ordering::Relaxed),
            parts_completed: self.inner.parts_completed.load(Ordering::Relaxed),
            alarms_raised: self.inner.alarms_raised.load(Ordering::Relaxed),
            alarms_cleared: self.inner.alarms_cleared.load(Ordering::Relaxed),
            subscriber_peak: self.inner.subscriber_peak.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub machine_updates: u64,
    pub parts_completed: u64,
    pub alarms_raised: u64,
    pub alarms_cleared: u64,
    pub subscriber_peak: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Line<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let line = Line {
            label,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&line).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct EpochTimer {
    start: Instant,
}

impl EpochTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
