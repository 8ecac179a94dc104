//! Wire snapshot types.
//!
//! These structs are the only contract the transport and persistence layers see,
//! so field names and nesting are fixed. Integer fields carry values that are
//! rounded to whole units on export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::CyclePhase;
use crate::spec::Capabilities;
use crate::tooling::{Coolant, ToolSlot};
use crate::{AlarmCode, Archetype, AxisSet, CoreError, ExecutionMode, MachineId};

/// Entry of a machine's alarm history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub code: Option<AlarmCode>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub cycle_phase: CyclePhase,
    pub spindle_load: f64,
    pub cleared: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    BatteryLow,
    CoolantLow,
    ToolWear,
    HighTemp,
    HighLoad,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Caution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolingTelemetry {
    pub current_tool: u16,
    pub tools: Vec<ToolSlot>,
    pub tool_change_count: u64,
    pub tool_wear: f64,
    pub coolant: Coolant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PressBrakeTelemetry {
    pub tonnage: i64,
    pub max_tonnage: f64,
    pub ram_position: i64,
    pub back_gauge: f64,
    pub bend_angle: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaserTelemetry {
    pub laser_power: i64,
    pub max_laser_power: f64,
    pub gas_pressure: i64,
    pub resonator_temp: f64,
    pub cut_speed: i64,
}

/// Archetype-specific group. Flattened into the snapshot, so only the fields of
/// the machine's own archetype appear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArchetypeTelemetry {
    Tooled(ToolingTelemetry),
    PressBrake(PressBrakeTelemetry),
    Laser(LaserTelemetry),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshot {
    pub id: MachineId,
    pub name: String,
    pub model: String,
    #[serde(rename = "type")]
    pub archetype: Archetype,
    pub specs: Capabilities,
    pub power: bool,
    pub execution: ExecutionMode,
    pub cycle_phase: CyclePhase,
    pub alarm: Option<String>,
    pub alarm_code: Option<AlarmCode>,
    pub alarm_history: Vec<AlarmRecord>,
    pub warnings: Vec<Warning>,
    pub spindle_speed: i64,
    pub spindle_load: f64,
    pub spindle_temp: f64,
    pub spindle_hours: f64,
    pub spindle_orientation: i64,
    pub feed_rate: i64,
    pub rapid_rate: i64,
    pub axis_positions: AxisSet<f64>,
    pub servo_load: AxisSet<f64>,
    pub servo_following_error: AxisSet<f64>,
    pub servo_temp: AxisSet<f64>,
    pub part_count: u64,
    pub total_cycles: u64,
    pub machine_on_hours: f64,
    pub production_rate: u32,
    pub battery_voltage: f64,
    pub temperature: i64,
    pub vibration: f64,
    pub current_amps: f64,
    pub oil_pressure: i64,
    pub oil_level: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub program_running: Option<String>,
    #[serde(flatten)]
    pub payload: ArchetypeTelemetry,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fleet-level roll-up of the current snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FleetSummary {
    pub total_machines: usize,
    pub running_machines: usize,
    pub idle_machines: usize,
    pub alarm_machines: usize,
    pub total_parts: u64,
    pub average_spindle_load: f64,
    pub timestamp: DateTime<Utc>,
}

impl FleetSummary {
    pub fn from_snapshots<'a, I>(snapshots: I, timestamp: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a MachineSnapshot>,
    {
        let mut total = 0usize;
        let mut running = 0usize;
        let mut alarmed = 0usize;
        let mut parts = 0u64;
        let mut load_sum = 0.0;
        for snapshot in snapshots {
            total += 1;
            if snapshot.execution == ExecutionMode::Running {
                running += 1;
            }
            if snapshot.alarm.is_some() {
                alarmed += 1;
            }
            parts += snapshot.part_count;
            load_sum += snapshot.spindle_load;
        }
        let average = if total == 0 { 0.0 } else { load_sum / total as f64 };
        Self {
            total_machines: total,
            running_machines: running,
            idle_machines: total.saturating_sub(running + alarmed),
            alarm_machines: alarmed,
            total_parts: parts,
            average_spindle_load: crate::round_to(average, 2),
            timestamp,
        }
    }
}
