//! Incremental fleet views over a differential collection of machine rows.
//!
//! Each tick the driver diffs the new snapshots against the previous rows with
//! [`RowTracker`] and feeds only the changes into an `InputSession`; the views
//! below then update incrementally.

use std::collections::BTreeMap;

use differential_dataflow::lattice::Lattice;
use differential_dataflow::operators::reduce::Reduce;
use differential_dataflow::Collection;
use serde::{Deserialize, Serialize};
use sf_core::telemetry::MachineSnapshot;
use sf_core::{ExecutionMode, MachineId};
use timely::dataflow::Scope;

pub struct TopKConfig {
    pub k: usize,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self { k: 3 }
    }
}

/// The slice of a snapshot the views care about. Spindle load is kept in integer
/// tenths of a percent so rows are totally ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineRow {
    pub machine_id: MachineId,
    pub execution: ExecutionMode,
    pub load_tenths: i64,
    pub alarm: Option<String>,
}

impl MachineRow {
    pub fn from_snapshot(snapshot: &MachineSnapshot) -> Self {
        Self {
            machine_id: snapshot.id.clone(),
            execution: snapshot.execution,
            load_tenths: (snapshot.spindle_load * 10.0).round() as i64,
            alarm: snapshot.alarm.clone(),
        }
    }
}

/// Remembers the last row per machine and turns new snapshots into row diffs.
#[derive(Debug, Default)]
pub struct RowTracker {
    rows: BTreeMap<MachineId, MachineRow>,
}

impl RowTracker {
    /// `(row, +1)` for new rows and `(row, -1)` for the rows they replace.
    pub fn diff<'a, I>(&mut self, snapshots: I) -> Vec<(MachineRow, isize)>
    where
        I: IntoIterator<Item = &'a MachineSnapshot>,
    {
        let mut changes = Vec::new();
        for snapshot in snapshots {
            let row = MachineRow::from_snapshot(snapshot);
            match self.rows.get(&row.machine_id) {
                Some(previous) if *previous == row => continue,
                Some(previous) => changes.push((previous.clone(), -1)),
                None => {}
            }
            changes.push((row.clone(), 1));
            self.rows.insert(row.machine_id.clone(), row);
        }
        changes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const MODES: [ExecutionMode; 4] = [
    ExecutionMode::Idle,
    ExecutionMode::Running,
    ExecutionMode::Alarm,
    ExecutionMode::Stopped,
];

fn mode_code(mode: ExecutionMode) -> u8 {
    mode as u8
}

fn mode_from_code(code: u8) -> Option<ExecutionMode> {
    MODES.get(usize::from(code)).copied()
}

/// Number of machines per execution mode. Keyed on the mode's `u8`
/// discriminant inside the reduce.
pub fn execution_counts<G>(rows: &Collection<G, MachineRow>) -> Collection<G, (ExecutionMode, i64)>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    rows.map(|row| (mode_code(row.execution), ()))
        .reduce(|_code, inputs, output| {
            let count: isize = inputs.iter().map(|(_, count)| *count).sum();
            output.push((count as i64, 1));
        })
        .flat_map(|(code, count)| mode_from_code(code).map(|mode| (mode, count)))
}

/// The `k` most loaded machines as `(load_tenths, machine_id)`, ties broken by id.
pub fn top_k_by_load<G>(cfg: &TopKConfig, rows: &Collection<G, MachineRow>) -> Collection<G, (i64, MachineId)>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    let k = cfg.k;
    rows.map(|row| ((), (row.load_tenths, row.machine_id)))
        .reduce(move |_unit, inputs, output| {
            let mut vals: Vec<(i64, MachineId)> = inputs.iter().map(|(val, _)| (*val).clone()).collect();
            vals.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            for val in vals.into_iter().take(k) {
                output.push((val, 1));
            }
        })
        .map(|((), pair)| pair)
}

/// Machines currently latched in an alarm, with the alarm message.
pub fn alarm_alerts<G>(rows: &Collection<G, MachineRow>) -> Collection<G, (MachineId, String)>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    rows.flat_map(|row| row.alarm.map(|message| (row.machine_id, message)))
}
