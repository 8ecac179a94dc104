//! The fleet context object: every machine, keyed by id, in catalog order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sf_core::telemetry::{FleetSummary, MachineSnapshot};
use sf_core::{AlarmCode, MachineId};
use tracing::trace;

use crate::machine::Machine;
use crate::MachineError;

pub type FleetSnapshot = IndexMap<MachineId, MachineSnapshot>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    #[error("unknown machine: {0}")]
    UnknownMachine(MachineId),
    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// What changed across one `advance_all` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub machines: usize,
    pub parts_completed: u64,
    pub alarms_raised: u64,
    pub alarms_cleared: u64,
}

#[derive(Debug, Default)]
pub struct Fleet {
    machines: IndexMap<MachineId, Machine>,
}

impl Fleet {
    pub fn insert(&mut self, machine: Machine) -> Option<Machine> {
        self.machines.insert(machine.id().clone(), machine)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MachineId> {
        self.machines.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    pub fn get(&self, id: &str) -> Result<&Machine, FleetError> {
        self.machines
            .get(id)
            .ok_or_else(|| FleetError::UnknownMachine(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Machine, FleetError> {
        self.machines
            .get_mut(id)
            .ok_or_else(|| FleetError::UnknownMachine(id.to_string()))
    }

    pub fn advance_all(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport {
            machines: self.machines.len(),
            ..TickReport::default()
        };
        for machine in self.machines.values_mut() {
            let state = machine.state();
            let parts = state.production.part_count;
            let raised = state.alarms.raised_total();
            let cleared = state.alarms.cleared_total();

            machine.advance(dt);

            let state = machine.state();
            report.parts_completed += state.production.part_count - parts;
            report.alarms_raised += state.alarms.raised_total() - raised;
            report.alarms_cleared += state.alarms.cleared_total() - cleared;
        }
        trace!(?report, dt, "fleet advanced");
        report
    }

    pub fn export(&self, id: &str) -> Result<MachineSnapshot, FleetError> {
        self.get(id).map(Machine::export)
    }

    pub fn export_all(&self) -> FleetSnapshot {
        self.machines
            .iter()
            .map(|(id, machine)| (id.clone(), machine.export()))
            .collect()
    }

    /// Roll-up stamped with the latest simulated clock in the fleet.
    pub fn summary(&self) -> FleetSummary {
        let snapshots = self.export_all();
        let timestamp = self.latest_clock().unwrap_or_else(Utc::now);
        FleetSummary::from_snapshots(snapshots.values(), timestamp)
    }

    pub fn latest_clock(&self) -> Option<DateTime<Utc>> {
        self.machines.values().map(|m| m.state().clock).max()
    }

    pub fn set_power(&mut self, id: &str, on: bool) -> Result<(), FleetError> {
        self.get_mut(id)?.set_power(on);
        Ok(())
    }

    /// Flip the power flag; returns the new value.
    pub fn toggle_power(&mut self, id: &str) -> Result<bool, FleetError> {
        let machine = self.get_mut(id)?;
        let on = !machine.is_powered();
        machine.set_power(on);
        Ok(on)
    }

    pub fn clear_alarm(&mut self, id: &str) -> Result<bool, FleetError> {
        Ok(self.get_mut(id)?.clear_alarm())
    }

    pub fn inject_alarm(
        &mut self,
        id: &str,
        code: Option<AlarmCode>,
        message: impl Into<String>,
    ) -> Result<(), FleetError> {
        self.get_mut(id)?.inject_alarm(code, message);
        Ok(())
    }

    pub fn change_tool(&mut self, id: &str, slot: u16) -> Result<(), FleetError> {
        Ok(self.get_mut(id)?.change_tool(slot)?)
    }
}
