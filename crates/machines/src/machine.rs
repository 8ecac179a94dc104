//! A single simulated machine: static spec, mutable state, archetype process and
//! its own randomness source.

use chrono::{DateTime, Duration, Utc};
use sf_core::phase::CyclePhase;
use sf_core::spec::MachineSpec;
use sf_core::telemetry::{
    ArchetypeTelemetry, LaserTelemetry, MachineSnapshot, PressBrakeTelemetry, ToolingTelemetry,
};
use sf_core::tooling::Coolant;
use sf_core::{round_to, AlarmCode, ExecutionMode, MachineId};
use sf_randomness::RandomnessSource;
use tracing::{debug, info, warn};

use crate::alarms::{self, EXPORTED_HISTORY};
use crate::state::{MachineState, Process};
use crate::{cycle, health, warnings, MachineError};

pub struct Machine {
    spec: MachineSpec,
    state: MachineState,
    process: Process,
    rng: Box<dyn RandomnessSource>,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}

impl Machine {
    pub fn new(spec: MachineSpec, mut rng: Box<dyn RandomnessSource>, started_at: DateTime<Utc>) -> Self {
        let state = MachineState::new(&spec, rng.as_mut(), started_at);
        let process = Process::for_spec(&spec, rng.as_mut());
        Self {
            spec,
            state,
            process,
            rng,
        }
    }

    pub fn id(&self) -> &MachineId {
        &self.spec.id
    }

    pub fn spec(&self) -> &MachineSpec {
        &self.spec
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    pub fn phase(&self) -> CyclePhase {
        self.process.phase()
    }

    pub fn execution(&self) -> ExecutionMode {
        self.state.execution
    }

    pub fn is_powered(&self) -> bool {
        self.state.power
    }

    pub fn tool_wear(&self) -> Option<f64> {
        self.process.tooled().map(|p| p.tool_wear)
    }

    /// Advance the simulation by `dt` seconds. Non-finite or negative steps are
    /// treated as zero.
    pub fn advance(&mut self, dt: f64) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.state.clock += Duration::microseconds((dt * 1e6).round() as i64);

        if !self.state.power {
            self.force_stopped();
            return;
        }

        self.state.production.on_hours += dt / 3600.0;

        if self.state.alarms.is_active() {
            cycle::hold(&mut self.state, &mut self.process, dt);
        } else {
            self.state.time_in_phase += dt;
            cycle::step(&mut self.state, &mut self.process, &self.spec, self.rng.as_mut(), dt);
        }

        health::apply(&mut self.state, self.rng.as_mut(), dt);

        if self.state.alarms.is_active() {
            if alarms::try_auto_clear(&mut self.state, self.rng.as_mut()) {
                info!(machine = %self.spec.id, "alarm auto-cleared");
            }
        } else if let Some(kind) = alarms::detect(&self.state, &self.process, &self.spec, self.rng.as_mut()) {
            warn!(
                machine = %self.spec.id,
                code = ?kind.code(),
                phase = ?self.process.phase(),
                "{}",
                kind.message()
            );
            alarms::raise(&mut self.state, &mut self.process, kind.code(), kind.message().to_string());
        }

        self.state.warnings = warnings::evaluate(&self.state, &self.process);
    }

    fn force_stopped(&mut self) {
        self.state.execution = ExecutionMode::Stopped;
        self.state.spindle.speed = 0.0;
        self.state.spindle.load = 0.0;
        self.state.motion.feed_rate = 0.0;
    }

    pub fn set_power(&mut self, on: bool) {
        if self.state.power == on {
            return;
        }
        self.state.power = on;
        if on {
            self.state.execution = if self.state.alarms.is_active() {
                ExecutionMode::Alarm
            } else {
                ExecutionMode::Idle
            };
        } else {
            cycle::abort(&mut self.state, &mut self.process);
            self.force_stopped();
        }
        info!(machine = %self.spec.id, power = on, "power changed");
    }

    /// Clear the latched alarm. Returns false when none was active.
    pub fn clear_alarm(&mut self) -> bool {
        let cleared = alarms::clear(&mut self.state);
        if cleared {
            info!(machine = %self.spec.id, "alarm cleared");
        }
        cleared
    }

    /// Raise an alarm regardless of the current conditions. A latched alarm is
    /// replaced and its history entry marked cleared.
    pub fn inject_alarm(&mut self, code: Option<AlarmCode>, message: impl Into<String>) {
        let message = message.into();
        warn!(machine = %self.spec.id, code = ?code, message = %message, "alarm injected");
        alarms::raise(&mut self.state, &mut self.process, code, message);
    }

    /// Load the tool in magazine `slot` (1-based) into the spindle.
    pub fn change_tool(&mut self, slot: u16) -> Result<(), MachineError> {
        let Process::Tooled(tooled) = &mut self.process else {
            return Err(MachineError::NoToolMagazine(self.spec.id.clone()));
        };
        if slot == 0 || usize::from(slot) > tooled.tools.len() {
            return Err(MachineError::UnknownToolSlot(slot));
        }
        if self.state.execution == ExecutionMode::Running {
            return Err(MachineError::MachineBusy(self.spec.id.clone()));
        }
        if slot != tooled.current_tool {
            tooled.release_tool();
            tooled.current_tool = slot;
            tooled.tool_change_count += 1;
            tooled.tool_wear = 0.0;
            debug!(machine = %self.spec.id, slot, changes = tooled.tool_change_count, "tool changed");
        }
        Ok(())
    }

    /// Wire snapshot of the current state. Pure: does not touch the state or
    /// draw randomness.
    pub fn export(&self) -> MachineSnapshot {
        let state = &self.state;
        let active = state.alarms.active();
        MachineSnapshot {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            model: self.spec.model.clone(),
            archetype: self.spec.archetype,
            specs: self.spec.capabilities.clone(),
            power: state.power,
            execution: state.execution,
            cycle_phase: self.process.phase(),
            alarm: active.map(|a| a.message.clone()),
            alarm_code: active.and_then(|a| a.code),
            alarm_history: state.alarms.recent(EXPORTED_HISTORY),
            warnings: state.warnings.clone(),
            spindle_speed: state.spindle.speed.round() as i64,
            spindle_load: round_to(state.spindle.load, 1),
            spindle_temp: round_to(state.spindle.temperature, 1),
            spindle_hours: round_to(state.spindle.hours, 3),
            spindle_orientation: state.spindle.orientation.round() as i64,
            feed_rate: state.motion.feed_rate.round() as i64,
            rapid_rate: state.motion.rapid_rate.round() as i64,
            axis_positions: state.motion.positions.map(|v| round_to(*v, 2)),
            servo_load: state.servo.load.map(|v| round_to(*v, 1)),
            servo_following_error: state.servo.following_error.map(|v| round_to(*v, 4)),
            servo_temp: state.servo.temperature.map(|v| round_to(*v, 1)),
            part_count: state.production.part_count,
            total_cycles: state.production.total_cycles,
            machine_on_hours: round_to(state.production.on_hours, 3),
            production_rate: state.production.production_rate,
            battery_voltage: round_to(state.health.battery_voltage, 2),
            temperature: state.health.temperature.round() as i64,
            vibration: round_to(state.health.vibration, 2),
            current_amps: round_to(state.health.current_amps, 1),
            oil_pressure: state.health.oil_pressure.round() as i64,
            oil_level: state.health.oil_level.round() as i64,
            timestamp: state.clock,
            program_running: state.program.clone(),
            payload: self.export_payload(),
        }
    }

    fn export_payload(&self) -> ArchetypeTelemetry {
        match &self.process {
            Process::Tooled(p) => ArchetypeTelemetry::Tooled(ToolingTelemetry {
                current_tool: p.current_tool,
                tools: p
                    .tools
                    .iter()
                    .map(|tool| {
                        let mut tool = tool.clone();
                        tool.current_life = round_to(tool.current_life, 2);
                        tool
                    })
                    .collect(),
                tool_change_count: p.tool_change_count,
                tool_wear: round_to(p.tool_wear, 3),
                coolant: Coolant {
                    level: round_to(p.coolant.level, 1),
                    pressure: round_to(p.coolant.pressure, 1),
                    temperature: round_to(p.coolant.temperature, 1),
                    flow: round_to(p.coolant.flow, 2),
                },
            }),
            Process::PressBrake(p) => ArchetypeTelemetry::PressBrake(PressBrakeTelemetry {
                tonnage: p.tonnage.round() as i64,
                max_tonnage: self.spec.capabilities.max_tonnage,
                ram_position: p.ram_position.round() as i64,
                back_gauge: round_to(p.back_gauge, 1),
                bend_angle: p.bend_angle.round() as i64,
            }),
            Process::Laser(p) => ArchetypeTelemetry::Laser(LaserTelemetry {
                laser_power: p.laser_power.round() as i64,
                max_laser_power: self.spec.capabilities.max_laser_power,
                gas_pressure: p.gas_pressure.round() as i64,
                resonator_temp: round_to(p.resonator_temp, 1),
                cut_speed: p.cut_speed.round() as i64,
            }),
        }
    }
}
