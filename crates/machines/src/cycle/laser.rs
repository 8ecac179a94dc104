//! Laser cut cycle: IDLE ↔ RUNNING.

use sf_core::phase::StrokePhase;
use sf_core::spec::MachineSpec;
use sf_core::ExecutionMode;
use sf_randomness::RandomnessSource;
use tracing::debug;

use super::complete_part;
use crate::state::{LaserProcess, MachineState, LASER_GAS_IDLE_PRESSURE, RESONATOR_AMBIENT};

const START_CHANCE: f64 = 0.07;
const MIN_CUT_POWER: f64 = 2000.0;
const CUT_SPEED_RAMP: f64 = 300.0;
const BEAM_JITTER: f64 = 5.0;
const RESONATOR_GAIN: f64 = 0.4;
const RESONATOR_COOLING: f64 = 0.05;
const CUT_SECS: f64 = 8.0;

pub fn step(
    state: &mut MachineState,
    process: &mut LaserProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    if process.phase == StrokePhase::Idle && rng.chance(START_CHANCE) {
        process.phase = StrokePhase::Running;
        state.time_in_phase = 0.0;
        let max_power = spec.capabilities.max_laser_power.max(MIN_CUT_POWER);
        process.laser_power = rng.uniform(MIN_CUT_POWER, max_power);
        state.motion.target_feed = rng.uniform(800.0, 3000.0);
        debug!(machine = %spec.id, power = process.laser_power, "laser cut started");
    }

    match process.phase {
        StrokePhase::Running => cut(state, process, spec, rng, dt),
        StrokePhase::Idle => {
            state.execution = ExecutionMode::Idle;
            state.spindle.load = 0.0;
            state.motion.feed_rate = 0.0;
            process.cut_speed = 0.0;
            cool_resonator(process, dt);
        }
    }
}

pub(crate) fn cool_resonator(process: &mut LaserProcess, dt: f64) {
    process.resonator_temp = (process.resonator_temp - RESONATOR_COOLING * dt).max(RESONATOR_AMBIENT);
}

fn cut(
    state: &mut MachineState,
    process: &mut LaserProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    state.execution = ExecutionMode::Running;
    let max_power = spec.capabilities.max_laser_power;
    let power_share = if max_power > 0.0 { process.laser_power / max_power } else { 0.0 };
    state.spindle.load = (power_share * 100.0).clamp(0.0, 100.0);

    if process.cut_speed < state.motion.target_feed {
        process.cut_speed = (process.cut_speed + CUT_SPEED_RAMP * dt).min(state.motion.target_feed);
    }
    state.motion.feed_rate = process.cut_speed;

    let limits = spec.axis_limits();
    let positions = &mut state.motion.positions;
    positions.x = limits.x.clamp(positions.x + rng.uniform(-BEAM_JITTER, BEAM_JITTER));
    positions.y = limits.y.clamp(positions.y + rng.uniform(-BEAM_JITTER, BEAM_JITTER));

    process.resonator_temp += power_share * RESONATOR_GAIN * dt;
    process.gas_pressure = rng.uniform(230.0, 250.0);

    if state.time_in_phase >= CUT_SECS {
        complete_part(state);
        process.phase = StrokePhase::Idle;
        process.cut_speed = 0.0;
        process.laser_power = 0.0;
        process.gas_pressure = LASER_GAS_IDLE_PRESSURE;
        state.motion.feed_rate = 0.0;
        state.spindle.load = 0.0;
        state.execution = ExecutionMode::Idle;
        state.time_in_phase = 0.0;
        debug!(machine = %spec.id, parts = state.production.part_count, "laser cut finished");
    }
}
