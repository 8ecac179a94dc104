//! Milling and turning cycle:
//! IDLE → SPINDLE_RAMP → RAPID → CUTTING → RETRACT → DWELL → FINISH → IDLE.

use sf_core::phase::MachiningPhase;
use sf_core::spec::MachineSpec;
use sf_core::ExecutionMode;
use sf_randomness::RandomnessSource;
use tracing::{debug, trace};

use super::{approach, complete_part, FEED_COAST_RATE, LOAD_COAST_RATE, SPINDLE_COAST_RATE};
use crate::state::{MachineState, TooledProcess};

const START_CHANCE: f64 = 0.05;
const COOLANT_RECOVERY_RATE: f64 = 0.1;

const MIN_TARGET_RPM: f64 = 3000.0;
const SPINDLE_RAMP_RATE: f64 = 350.0;
const RAMP_LOAD_SCALE: f64 = 15.0;
const RAMP_LOAD_CAP: f64 = 20.0;

const RAPID_SECS: f64 = 3.0;

const FEED_RAMP_RATE: f64 = 200.0;
const PLUNGE_RATE: f64 = 1.0;
const Z_FLOOR_CLEARANCE: f64 = 5.0;
/// Feed rate that maps to the nominal 35% cutting load.
const REFERENCE_FEED: f64 = 1800.0;
const WEAR_PER_LOAD: f64 = 1.0 / 250_000.0;
const CUT_SHARE_OF_CYCLE: f64 = 0.6;

const RETRACT_RATE: f64 = 4.0;
const RETRACT_CLEARANCE: f64 = 10.0;
const RETRACT_LOAD_FLOOR: f64 = 5.0;
const RETRACT_LOAD_DECAY: f64 = 10.0;
const RETRACT_FEED_DECAY: f64 = 300.0;

const DWELL_SECS: f64 = 2.0;
const FINISH_LOAD_FACTOR: f64 = 0.7;

pub fn step(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    match process.phase {
        MachiningPhase::Idle => idle(state, process, spec, rng, dt),
        MachiningPhase::SpindleRamp => spindle_ramp(state, process, spec, rng, dt),
        MachiningPhase::Rapid => rapid(state, process, spec, rng),
        MachiningPhase::Cutting => cutting(state, process, spec, rng, dt),
        MachiningPhase::Retract => retract(state, process, spec, dt),
        MachiningPhase::Dwell => dwell(state, process, dt),
        MachiningPhase::Finish => finish(state, process, spec),
    }
}

fn enter(state: &mut MachineState, process: &mut TooledProcess, phase: MachiningPhase) {
    trace!(from = ?process.phase, to = ?phase, "machining phase change");
    process.phase = phase;
    state.time_in_phase = 0.0;
}

pub(crate) fn recover_coolant(process: &mut TooledProcess, dt: f64) {
    process.coolant.level = (process.coolant.level + COOLANT_RECOVERY_RATE * dt).min(100.0);
    process.coolant.flow = 0.0;
}

fn idle(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    state.execution = ExecutionMode::Idle;
    state.spindle.speed = (state.spindle.speed - SPINDLE_COAST_RATE * dt).max(0.0);
    state.motion.feed_rate = (state.motion.feed_rate - FEED_COAST_RATE * dt).max(0.0);
    state.spindle.load = (state.spindle.load - LOAD_COAST_RATE * dt).max(0.0);
    recover_coolant(process, dt);

    if rng.chance(START_CHANCE) {
        start_cycle(state, process, spec, rng);
    }
}

fn start_cycle(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
) {
    enter(state, process, MachiningPhase::SpindleRamp);
    state.execution = ExecutionMode::Running;
    state.cycle_time_target = rng.uniform(20.0, 45.0);
    let max_rpm = spec.capabilities.max_rpm.max(MIN_TARGET_RPM);
    state.spindle.target_speed = rng.uniform(MIN_TARGET_RPM, max_rpm);
    state.motion.target_feed = rng.uniform(300.0, REFERENCE_FEED);
    if state.program.is_none() {
        state.program = Some(format!("O{}", rng.int_inclusive(1000, 9999)));
    }
    debug!(
        machine = %spec.id,
        target_rpm = state.spindle.target_speed,
        target_feed = state.motion.target_feed,
        cycle_secs = state.cycle_time_target,
        "machining cycle started"
    );
}

fn spindle_ramp(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    state.execution = ExecutionMode::Running;
    let spindle = &mut state.spindle;
    spindle.speed = approach(spindle.speed, spindle.target_speed, SPINDLE_RAMP_RATE * dt);
    if spindle.target_speed > 0.0 {
        spindle.load = (spindle.speed / spindle.target_speed * RAMP_LOAD_SCALE).min(RAMP_LOAD_CAP);
    }
    spindle.orientation = (spindle.orientation + spindle.speed * dt / 60.0).rem_euclid(360.0);

    if state.spindle.speed == state.spindle.target_speed {
        enter_rapid(state, process, spec, rng);
    }
}

/// G0 move: one discrete jump to a random X/Y point with Z at its safe height.
fn enter_rapid(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
) {
    enter(state, process, MachiningPhase::Rapid);
    let limits = spec.axis_limits();
    let positions = &mut state.motion.positions;
    positions.x = limits.x.clamp(rng.uniform(limits.x.min(), limits.x.max()));
    positions.y = limits.y.clamp(rng.uniform(limits.y.min(), limits.y.max()));
    positions.z = limits.z.max();
}

fn rapid(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
) {
    state.execution = ExecutionMode::Running;
    state.motion.positions.z = spec.axis_limits().z.max();
    state.motion.rapid_rate = spec.capabilities.rapid_traverse;
    state.motion.feed_rate = 0.0;
    state.spindle.load = rng.uniform(5.0, 10.0);

    if state.time_in_phase >= RAPID_SECS {
        state.motion.rapid_rate = 0.0;
        enter(state, process, MachiningPhase::Cutting);
    }
}

fn cutting(
    state: &mut MachineState,
    process: &mut TooledProcess,
    spec: &MachineSpec,
    rng: &mut dyn RandomnessSource,
    dt: f64,
) {
    state.execution = ExecutionMode::Running;
    let motion = &mut state.motion;
    if motion.feed_rate < motion.target_feed {
        motion.feed_rate = (motion.feed_rate + FEED_RAMP_RATE * dt).min(motion.target_feed);
    }

    let z_travel = spec.axis_limits().z;
    if motion.target_feed > 0.0 {
        motion.positions.z -= PLUNGE_RATE * dt * (motion.feed_rate / motion.target_feed);
    }
    motion.positions.z = z_travel.clamp(motion.positions.z.max(z_travel.min() + Z_FLOOR_CLEARANCE));

    let base_load = motion.feed_rate / REFERENCE_FEED * 35.0;
    let wear_load = process.tool_wear * 50.0;
    let vibration_load = state.health.vibration * 8.0;
    let noise = rng.uniform(-2.0, 2.5);
    state.spindle.load = (base_load + wear_load + vibration_load + noise).clamp(0.0, 100.0);

    process.tool_wear = (process.tool_wear + state.spindle.load * WEAR_PER_LOAD).min(1.0);
    state.health.vibration = process.tool_wear * 3.0 + rng.uniform(0.0, 0.4);

    if state.spindle.speed > 300.0 {
        state.spindle.hours += dt / 3600.0;
    }

    let life_used = rng.uniform(0.0, 0.02);
    if let Some(tool) = process.active_tool_mut() {
        tool.consume_life(life_used);
        tool.in_use = true;
        tool.total_cuts += 1;
    }

    let coolant = &mut process.coolant;
    coolant.level = (coolant.level - rng.uniform(0.0, 0.08)).max(0.0);
    coolant.pressure = rng.uniform(45.0, 60.0);
    coolant.temperature = rng.uniform(72.0, 87.0);
    coolant.flow = rng.uniform(5.0, 8.0);

    let servo = &mut state.servo;
    servo.load.x = rng.uniform(20.0, 50.0);
    servo.load.y = rng.uniform(20.0, 50.0);
    servo.load.z = 30.0 + state.spindle.load * 0.5;
    servo.following_error.x = rng.uniform(0.0, 0.002);
    servo.following_error.y = rng.uniform(0.0, 0.002);
    servo.following_error.z = rng.uniform(0.0, 0.003);

    if state.time_in_phase >= state.cycle_time_target * CUT_SHARE_OF_CYCLE {
        enter(state, process, MachiningPhase::Retract);
    }
}

fn retract(state: &mut MachineState, process: &mut TooledProcess, spec: &MachineSpec, dt: f64) {
    state.execution = ExecutionMode::Running;
    let z_travel = spec.axis_limits().z;
    let retract_height = z_travel.clamp(z_travel.max() - RETRACT_CLEARANCE);

    state.spindle.load = approach(state.spindle.load, RETRACT_LOAD_FLOOR, RETRACT_LOAD_DECAY * dt);
    state.motion.feed_rate = (state.motion.feed_rate - RETRACT_FEED_DECAY * dt).max(0.0);

    let z = state.motion.positions.z + RETRACT_RATE * dt;
    if z >= retract_height {
        state.motion.positions.z = retract_height;
        enter(state, process, MachiningPhase::Dwell);
    } else {
        state.motion.positions.z = z;
    }
}

fn dwell(state: &mut MachineState, process: &mut TooledProcess, dt: f64) {
    state.execution = ExecutionMode::Running;
    state.motion.feed_rate = 0.0;
    state.spindle.load = (state.spindle.load - LOAD_COAST_RATE * dt).max(0.0);

    if state.time_in_phase >= DWELL_SECS {
        enter(state, process, MachiningPhase::Finish);
    }
}

fn finish(state: &mut MachineState, process: &mut TooledProcess, spec: &MachineSpec) {
    complete_part(state);
    state.spindle.load *= FINISH_LOAD_FACTOR;
    state.motion.feed_rate = 0.0;
    process.release_tool();
    debug!(
        machine = %spec.id,
        parts = state.production.part_count,
        rate = state.production.production_rate,
        "machining cycle finished"
    );
    enter(state, process, MachiningPhase::Idle);
    state.execution = ExecutionMode::Idle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sf_core::spec::Capabilities;
    use sf_core::Archetype;
    use sf_randomness::FixedSource;

    fn setup() -> (MachineSpec, MachineState, TooledProcess, FixedSource) {
        let spec = MachineSpec::new("vf2", "Mill", "VF-2", Archetype::Milling, Capabilities::default());
        let mut rng = FixedSource::constant(0.0);
        let state = MachineState::new(&spec, &mut rng, Utc::now());
        let process = TooledProcess::new(spec.capabilities.tool_capacity, &mut rng);
        (spec, state, process, rng)
    }

    #[test]
    fn idle_start_picks_minimum_targets_with_zero_draws() {
        let (spec, mut state, mut process, mut rng) = setup();
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(process.phase, MachiningPhase::SpindleRamp);
        assert_eq!(state.execution, ExecutionMode::Running);
        assert_eq!(state.spindle.target_speed, 3000.0);
        assert_eq!(state.motion.target_feed, 300.0);
        assert_eq!(state.cycle_time_target, 20.0);
        assert_eq!(state.program.as_deref(), Some("O1000"));
    }

    #[test]
    fn ramp_load_is_capped() {
        let (spec, mut state, mut process, mut rng) = setup();
        process.phase = MachiningPhase::SpindleRamp;
        state.spindle.target_speed = 3000.0;
        state.spindle.speed = 1500.0;
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(state.spindle.speed, 1850.0);
        assert!((state.spindle.load - 1850.0 / 3000.0 * 15.0).abs() < 1e-9);
        assert!((state.spindle.orientation - 1850.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn ramp_down_to_lower_target_still_reaches_rapid() {
        let (spec, mut state, mut process, mut rng) = setup();
        process.phase = MachiningPhase::SpindleRamp;
        state.spindle.target_speed = 3500.0;
        state.spindle.speed = 3700.0;
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(process.phase, MachiningPhase::Rapid);
        assert_eq!(state.motion.positions.z, 508.0);
    }

    #[test]
    fn cutting_respects_z_floor_and_marks_tool() {
        let (spec, mut state, mut process, mut rng) = setup();
        process.phase = MachiningPhase::Cutting;
        state.spindle.speed = 3000.0;
        state.motion.target_feed = 300.0;
        state.motion.feed_rate = 300.0;
        state.motion.positions.z = 5.2;
        state.cycle_time_target = 1_000.0;
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(state.motion.positions.z, 5.0);
        let tool = process.active_tool().unwrap();
        assert!(tool.in_use);
        assert_eq!(tool.total_cuts, 1);
        assert!(state.spindle.load >= 0.0 && state.spindle.load <= 100.0);
    }

    #[test]
    fn retract_stops_below_top_of_travel() {
        let (spec, mut state, mut process, mut rng) = setup();
        process.phase = MachiningPhase::Retract;
        state.motion.positions.z = 496.0;
        state.spindle.load = 40.0;
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(state.motion.positions.z, 498.0);
        assert_eq!(process.phase, MachiningPhase::Dwell);
        assert_eq!(state.spindle.load, 30.0);
    }

    #[test]
    fn finish_counts_part_and_returns_to_idle() {
        let (spec, mut state, mut process, mut rng) = setup();
        process.phase = MachiningPhase::Finish;
        process.tools[0].in_use = true;
        state.spindle.load = 10.0;
        state.production.on_hours = 0.5;
        step(&mut state, &mut process, &spec, &mut rng, 1.0);
        assert_eq!(state.production.part_count, 1);
        assert_eq!(state.production.total_cycles, 1);
        assert_eq!(state.production.production_rate, 2);
        assert!((state.spindle.load - 7.0).abs() < 1e-9);
        assert!(!process.tools[0].in_use);
        assert_eq!(process.phase, MachiningPhase::Idle);
        assert_eq!(state.execution, ExecutionMode::Idle);
    }
}
