//! Thermal, electrical and lubrication telemetry derived from the cycle state.

use sf_core::{Axis, ExecutionMode};
use sf_randomness::RandomnessSource;

use crate::state::MachineState;

const AMBIENT_CEILING: f64 = 120.0;
const AMBIENT_FLOOR: f64 = 72.0;
const AMBIENT_GAIN: f64 = 0.3;
const AMBIENT_COOLING: f64 = 0.2;

const SPINDLE_TEMP_CEILING: f64 = 95.0;
const SPINDLE_TEMP_FLOOR: f64 = 25.0;
const SPINDLE_TEMP_GAIN: f64 = 0.15;
const SPINDLE_TEMP_COOLING: f64 = 0.03;

const IDLE_AMPS: f64 = 7.0;
const LOAD_AMPS: f64 = 8.0;
const AMPS_DECAY: f64 = 0.5;

const BATTERY_DRAIN: f64 = 0.0001;
const BATTERY_FLOOR: f64 = 2.8;

const OIL_LEVEL_TRICKLE: f64 = 0.001;
const OIL_LEVEL_FLOOR: f64 = 20.0;

const SERVO_TEMP_CEILING: f64 = 65.0;
const SERVO_TEMP_FLOOR: f64 = 25.0;
const SERVO_HEATING: f64 = 0.1;
const SERVO_COOLING: f64 = 0.05;

pub fn apply(state: &mut MachineState, rng: &mut dyn RandomnessSource, dt: f64) {
    let running = state.execution == ExecutionMode::Running;
    let load_share = state.spindle.load / 100.0;
    let health = &mut state.health;

    if running {
        health.temperature = (health.temperature + AMBIENT_GAIN * load_share * dt).min(AMBIENT_CEILING);
        state.spindle.temperature =
            (state.spindle.temperature + SPINDLE_TEMP_GAIN * load_share * dt).min(SPINDLE_TEMP_CEILING);
        health.current_amps = IDLE_AMPS + LOAD_AMPS * load_share;
    } else {
        health.temperature = (health.temperature - AMBIENT_COOLING * dt).max(AMBIENT_FLOOR);
        state.spindle.temperature =
            (state.spindle.temperature - SPINDLE_TEMP_COOLING * dt).max(SPINDLE_TEMP_FLOOR);
        health.current_amps = (health.current_amps - AMPS_DECAY * dt).max(IDLE_AMPS);
    }

    health.battery_voltage = (health.battery_voltage - BATTERY_DRAIN * dt).max(BATTERY_FLOOR);
    health.oil_pressure = rng.uniform(45.0, 55.0);
    health.oil_level = (health.oil_level - OIL_LEVEL_TRICKLE * dt).max(OIL_LEVEL_FLOOR);

    for axis in Axis::ALL {
        let temp = state.servo.temperature.get_mut(axis);
        *temp = if running {
            (*temp + SERVO_HEATING * dt).min(SERVO_TEMP_CEILING)
        } else {
            (*temp - SERVO_COOLING * dt).max(SERVO_TEMP_FLOOR)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sf_core::spec::{Capabilities, MachineSpec};
    use sf_core::Archetype;
    use sf_randomness::FixedSource;

    fn state() -> MachineState {
        let spec = MachineSpec::new("m", "Mill", "VF-2", Archetype::Milling, Capabilities::default());
        MachineState::new(&spec, &mut FixedSource::constant(0.5), Utc::now())
    }

    #[test]
    fn running_heats_in_proportion_to_load() {
        let mut state = state();
        state.execution = ExecutionMode::Running;
        state.spindle.load = 50.0;
        apply(&mut state, &mut FixedSource::constant(0.5), 1.0);
        assert!((state.health.temperature - 72.15).abs() < 1e-9);
        assert!((state.spindle.temperature - 25.075).abs() < 1e-9);
        assert_eq!(state.health.current_amps, 11.0);
        assert!((state.servo.temperature.x - 25.1).abs() < 1e-9);
        assert_eq!(state.health.oil_pressure, 50.0);
    }

    #[test]
    fn idle_decays_to_floors() {
        let mut state = state();
        state.execution = ExecutionMode::Idle;
        state.health.temperature = 72.1;
        state.health.current_amps = 7.2;
        state.spindle.temperature = 25.01;
        apply(&mut state, &mut FixedSource::constant(0.0), 1.0);
        assert_eq!(state.health.temperature, 72.0);
        assert_eq!(state.health.current_amps, 7.0);
        assert_eq!(state.spindle.temperature, 25.0);
        assert_eq!(state.servo.temperature.z, 25.0);
    }

    #[test]
    fn battery_and_oil_never_cross_floors() {
        let mut state = state();
        state.health.battery_voltage = 2.80001;
        state.health.oil_level = 20.0005;
        apply(&mut state, &mut FixedSource::constant(0.0), 10.0);
        assert_eq!(state.health.battery_voltage, 2.8);
        assert_eq!(state.health.oil_level, 20.0);
    }
}
