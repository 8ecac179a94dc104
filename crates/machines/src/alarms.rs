//! Alarm manager: stochastic fault detection, latching, auto-clear and a bounded
//! history.

use std::collections::VecDeque;

use sf_core::spec::MachineSpec;
use sf_core::telemetry::AlarmRecord;
use sf_core::{round_to, AlarmCode, Axis, ExecutionMode};
use sf_randomness::RandomnessSource;

use crate::cycle;
use crate::state::{MachineState, Process};

pub const HISTORY_CAPACITY: usize = 20;
/// Newest history entries carried in a snapshot.
pub const EXPORTED_HISTORY: usize = 5;
pub const AUTO_CLEAR_CHANCE: f64 = 0.02;

const FOLLOWING_ERROR_LIMIT: f64 = 0.005;
const LOW_BATTERY_VOLTS: f64 = 3.0;
const COOLANT_CRITICAL_LEVEL: f64 = 10.0;
const OVERLOAD_PERCENT: f64 = 95.0;
const SPINDLE_OVER_TEMP: f64 = 85.0;
const TOOL_LIFE_EXPIRED: f64 = 5.0;
const VIBRATION_LIMIT: f64 = 5.0;
const OVER_TONNAGE_SHARE: f64 = 0.9;
const RESONATOR_LIMIT: f64 = 85.0;

/// Built-in fault conditions, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmKind {
    FollowingError(Axis),
    LowBattery,
    CoolantCritical,
    SpindleOverload,
    SpindleOverTemp,
    ToolLifeExpired,
    HighVibration,
    OverTonnage,
    LaserPowerFault,
    ResonatorOverheat,
}

impl AlarmKind {
    /// Evaluation order; the first holding condition whose draw succeeds wins.
    /// On the laser the load channel is beam power, so high load there is
    /// reported as `LaserPowerFault` and never as `SpindleOverload`.
    pub const PRIORITY: [AlarmKind; 12] = [
        AlarmKind::FollowingError(Axis::X),
        AlarmKind::FollowingError(Axis::Y),
        AlarmKind::FollowingError(Axis::Z),
        AlarmKind::LowBattery,
        AlarmKind::CoolantCritical,
        AlarmKind::SpindleOverload,
        AlarmKind::SpindleOverTemp,
        AlarmKind::ToolLifeExpired,
        AlarmKind::HighVibration,
        AlarmKind::OverTonnage,
        AlarmKind::LaserPowerFault,
        AlarmKind::ResonatorOverheat,
    ];

    pub fn code(self) -> Option<AlarmCode> {
        match self {
            AlarmKind::FollowingError(Axis::X) => Some(103),
            AlarmKind::FollowingError(Axis::Y) => Some(104),
            AlarmKind::FollowingError(Axis::Z) => Some(105),
            AlarmKind::LowBattery => Some(9100),
            AlarmKind::CoolantCritical => Some(115),
            AlarmKind::SpindleOverTemp => Some(200),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AlarmKind::FollowingError(Axis::X) => "X AXIS FOLLOWING ERROR",
            AlarmKind::FollowingError(Axis::Y) => "Y AXIS FOLLOWING ERROR",
            AlarmKind::FollowingError(Axis::Z) => "Z AXIS FOLLOWING ERROR",
            AlarmKind::LowBattery => "LOW BATTERY",
            AlarmKind::CoolantCritical => "COOLANT PUMP FAULT",
            AlarmKind::SpindleOverload => "SPINDLE_OVERLOAD",
            AlarmKind::SpindleOverTemp => "SPINDLE OVER TEMP",
            AlarmKind::ToolLifeExpired => "TOOL_LIFE_EXPIRED",
            AlarmKind::HighVibration => "HIGH_VIBRATION",
            AlarmKind::OverTonnage => "OVER_TONNAGE",
            AlarmKind::LaserPowerFault => "LASER_POWER_FAULT",
            AlarmKind::ResonatorOverheat => "RESONATOR_OVERHEAT",
        }
    }

    /// Per-tick probability that a holding condition actually latches.
    pub fn trigger_chance(self) -> f64 {
        match self {
            AlarmKind::FollowingError(_) => 0.02,
            AlarmKind::LowBattery => 0.05,
            AlarmKind::CoolantCritical => 0.10,
            AlarmKind::SpindleOverload => 0.05,
            AlarmKind::SpindleOverTemp => 0.08,
            AlarmKind::ToolLifeExpired => 0.15,
            AlarmKind::HighVibration => 0.08,
            AlarmKind::OverTonnage => 0.10,
            AlarmKind::LaserPowerFault => 0.10,
            AlarmKind::ResonatorOverheat => 0.08,
        }
    }

    pub fn holds(self, state: &MachineState, process: &Process, spec: &MachineSpec) -> bool {
        match self {
            AlarmKind::FollowingError(axis) => {
                *state.servo.following_error.get(axis) > FOLLOWING_ERROR_LIMIT
            }
            AlarmKind::LowBattery => state.health.battery_voltage < LOW_BATTERY_VOLTS,
            AlarmKind::CoolantCritical => process
                .tooled()
                .is_some_and(|p| p.coolant.level < COOLANT_CRITICAL_LEVEL),
            // On the laser the load channel is beam power, reported as a laser fault.
            AlarmKind::SpindleOverload => {
                process.laser().is_none() && state.spindle.load > OVERLOAD_PERCENT
            }
            AlarmKind::SpindleOverTemp => state.spindle.temperature > SPINDLE_OVER_TEMP,
            AlarmKind::ToolLifeExpired => process
                .tooled()
                .and_then(|p| p.active_tool())
                .is_some_and(|tool| tool.current_life < TOOL_LIFE_EXPIRED),
            AlarmKind::HighVibration => state.health.vibration > VIBRATION_LIMIT,
            AlarmKind::OverTonnage => process
                .press_brake()
                .is_some_and(|p| p.tonnage > spec.capabilities.max_tonnage * OVER_TONNAGE_SHARE),
            AlarmKind::LaserPowerFault => {
                process.laser().is_some() && state.spindle.load > OVERLOAD_PERCENT
            }
            AlarmKind::ResonatorOverheat => process
                .laser()
                .is_some_and(|p| p.resonator_temp > RESONATOR_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlarm {
    pub code: Option<AlarmCode>,
    pub message: String,
}

/// Latched alarm plus the last `HISTORY_CAPACITY` records, oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlarmLog {
    active: Option<ActiveAlarm>,
    history: VecDeque<AlarmRecord>,
    raised_total: u64,
    cleared_total: u64,
}

impl AlarmLog {
    pub fn active(&self) -> Option<&ActiveAlarm> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn history(&self) -> impl Iterator<Item = &AlarmRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The newest `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AlarmRecord> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn raised_total(&self) -> u64 {
        self.raised_total
    }

    pub fn cleared_total(&self) -> u64 {
        self.cleared_total
    }

    fn latch(&mut self, record: AlarmRecord) {
        self.active = Some(ActiveAlarm {
            code: record.code,
            message: record.message.clone(),
        });
        self.history.push_back(record);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.raised_total += 1;
    }

    /// Drop the latched alarm; the newest record is flagged cleared once.
    fn release(&mut self) -> bool {
        if self.active.take().is_none() {
            return false;
        }
        if let Some(latest) = self.history.back_mut() {
            if !latest.cleared {
                latest.cleared = true;
            }
        }
        self.cleared_total += 1;
        true
    }
}

/// First holding condition whose trigger draw succeeds, if any. Draws are only
/// taken for conditions that hold.
pub fn detect(
    state: &MachineState,
    process: &Process,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
) -> Option<AlarmKind> {
    AlarmKind::PRIORITY
        .into_iter()
        .find(|kind| kind.holds(state, process, spec) && rng.chance(kind.trigger_chance()))
}

/// Latch an alarm, record it and abort the cycle in flight.
pub fn raise(state: &mut MachineState, process: &mut Process, code: Option<AlarmCode>, message: String) {
    let record = AlarmRecord {
        code,
        message,
        timestamp: state.clock,
        cycle_phase: process.phase(),
        spindle_load: round_to(state.spindle.load, 1),
        cleared: false,
    };
    state.alarms.release();
    state.alarms.latch(record);
    cycle::abort(state, process);
    if state.power {
        state.execution = ExecutionMode::Alarm;
    }
}

/// Returns whether an alarm was actually latched.
pub fn clear(state: &mut MachineState) -> bool {
    if !state.alarms.release() {
        return false;
    }
    state.execution = if state.power {
        ExecutionMode::Idle
    } else {
        ExecutionMode::Stopped
    };
    true
}

pub fn try_auto_clear(state: &mut MachineState, rng: &mut dyn RandomnessSource) -> bool {
    state.alarms.is_active() && rng.chance(AUTO_CLEAR_CHANCE) && clear(state)
}
