//! Per-archetype production cycle engines.

use sf_core::phase::{MachiningPhase, StrokePhase};
use sf_core::spec::MachineSpec;
use sf_core::ExecutionMode;
use sf_randomness::RandomnessSource;

use crate::state::{MachineState, Process, LASER_GAS_IDLE_PRESSURE};

pub mod laser;
pub mod machining;
pub mod press_brake;

/// Spindle deceleration while idle or held by an alarm, rpm/s.
pub(crate) const SPINDLE_COAST_RATE: f64 = 500.0;
pub(crate) const FEED_COAST_RATE: f64 = 500.0;
pub(crate) const LOAD_COAST_RATE: f64 = 5.0;

/// Run one tick of the machine's cycle engine.
pub fn step(
    state: &mut MachineState,
    process: &mut Process,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    match process {
        Process::Tooled(tooled) => machining::step(state, tooled, spec, rng, dt),
        Process::PressBrake(press) => press_brake::step(state, press, spec, rng, dt),
        Process::Laser(laser) => laser::step(state, laser, spec, rng, dt),
    }
}

/// Tick while an alarm is latched: no phase progression, the spindle coasts down
/// and passive recoveries (coolant top-up, resonator cooling) continue.
pub fn hold(state: &mut MachineState, process: &mut Process, dt: f64) {
    state.execution = ExecutionMode::Alarm;
    state.spindle.speed = (state.spindle.speed - SPINDLE_COAST_RATE * dt).max(0.0);
    state.spindle.load = (state.spindle.load - LOAD_COAST_RATE * dt).max(0.0);
    state.motion.feed_rate = 0.0;
    match process {
        Process::Tooled(tooled) => machining::recover_coolant(tooled, dt),
        Process::Laser(laser) => laser::cool_resonator(laser, dt),
        Process::PressBrake(_) => {}
    }
}

/// Drop whatever cycle is in flight and return to the archetype's idle phase.
pub fn abort(state: &mut MachineState, process: &mut Process) {
    state.time_in_phase = 0.0;
    state.motion.rapid_rate = 0.0;
    match process {
        Process::Tooled(tooled) => {
            tooled.phase = MachiningPhase::Idle;
            tooled.release_tool();
            tooled.coolant.flow = 0.0;
        }
        Process::PressBrake(press) => {
            press.phase = StrokePhase::Idle;
            press.ram_position = 0.0;
            press.tonnage = 0.0;
        }
        Process::Laser(laser) => {
            laser.phase = StrokePhase::Idle;
            laser.cut_speed = 0.0;
            laser.laser_power = 0.0;
            laser.gas_pressure = LASER_GAS_IDLE_PRESSURE;
        }
    }
}

/// Count a finished part and refresh the parts-per-hour rate.
pub(crate) fn complete_part(state: &mut MachineState) {
    let production = &mut state.production;
    production.part_count += 1;
    production.total_cycles += 1;
    if production.on_hours > 0.0 {
        production.production_rate = (production.part_count as f64 / production.on_hours).round() as u32;
    }
}

/// Move `current` toward `target` by at most `max_step`.
pub(crate) fn approach(current: f64, target: f64, max_step: f64) -> f64 {
    if current < target {
        (current + max_step).min(target)
    } else {
        (current - max_step).max(target)
    }
}
