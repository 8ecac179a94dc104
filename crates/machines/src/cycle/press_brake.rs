//! Press brake stroke cycle: IDLE ↔ RUNNING.

use sf_core::phase::StrokePhase;
use sf_core::spec::MachineSpec;
use sf_core::ExecutionMode;
use sf_randomness::RandomnessSource;
use tracing::debug;

use super::complete_part;
use crate::state::{MachineState, PressBrakeProcess};

const START_CHANCE: f64 = 0.05;
const RAM_RATE: f64 = 20.0;
const FULL_STROKE: f64 = 100.0;
/// Share of rated tonnage applied at the bottom of the stroke.
const WORKING_TONNAGE_SHARE: f64 = 0.8;
const Y_SERVO_SCALE: f64 = 80.0;
const STROKE_SECS: f64 = 5.0;

pub fn step(
    state: &mut MachineState,
    process: &mut PressBrakeProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    if process.phase == StrokePhase::Idle && rng.chance(START_CHANCE) {
        process.phase = StrokePhase::Running;
        state.time_in_phase = 0.0;
        process.bend_angle = rng.uniform(45.0, 135.0);
        process.back_gauge = rng.uniform(50.0, 500.0);
        debug!(machine = %spec.id, bend_angle = process.bend_angle, "press brake stroke started");
    }

    match process.phase {
        StrokePhase::Running => stroke(state, process, spec, dt),
        StrokePhase::Idle => {
            state.execution = ExecutionMode::Idle;
            state.spindle.load = 0.0;
            process.tonnage = 0.0;
        }
    }
}

fn stroke(state: &mut MachineState, process: &mut PressBrakeProcess, spec: &MachineSpec, dt: f64) {
    state.execution = ExecutionMode::Running;
    let max_tonnage = spec.capabilities.max_tonnage;
    process.ram_position = (process.ram_position + RAM_RATE * dt).min(FULL_STROKE);
    process.tonnage = process.ram_position / FULL_STROKE * max_tonnage * WORKING_TONNAGE_SHARE;

    let share = if max_tonnage > 0.0 { process.tonnage / max_tonnage } else { 0.0 };
    state.spindle.load = (share * 100.0).clamp(0.0, 100.0);
    state.servo.load.y = share * Y_SERVO_SCALE;

    if state.time_in_phase >= STROKE_SECS {
        complete_part(state);
        process.ram_position = 0.0;
        process.tonnage = 0.0;
        process.phase = StrokePhase::Idle;
        state.spindle.load = 0.0;
        state.servo.load.y = 0.0;
        state.execution = ExecutionMode::Idle;
        state.time_in_phase = 0.0;
        debug!(machine = %spec.id, parts = state.production.part_count, "press brake stroke finished");
    }
}
