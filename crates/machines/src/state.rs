//! Mutable machine state.
//!
//! `MachineState` holds what every archetype shares; `Process` is the
//! archetype-specific payload together with that archetype's own phase enum, so
//! a press brake can never be in a CUTTING phase and a laser never owns tools.

use chrono::{DateTime, Utc};
use sf_core::phase::{CyclePhase, MachiningPhase, StrokePhase};
use sf_core::spec::MachineSpec;
use sf_core::telemetry::Warning;
use sf_core::tooling::{Coating, Coolant, ToolSlot, ToolType, TOOL_MAX_LIFE};
use sf_core::{round_to, Archetype, AxisSet, ExecutionMode};
use sf_randomness::RandomnessSource;

use crate::alarms::AlarmLog;

#[derive(Debug, Clone, PartialEq)]
pub struct SpindleState {
    pub speed: f64,
    pub target_speed: f64,
    /// Percent of rated load, always in `[0, 100]`.
    pub load: f64,
    pub temperature: f64,
    pub hours: f64,
    /// Degrees, `[0, 360)`.
    pub orientation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    pub feed_rate: f64,
    pub target_feed: f64,
    pub rapid_rate: f64,
    pub positions: AxisSet<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServoState {
    pub load: AxisSet<f64>,
    pub following_error: AxisSet<f64>,
    pub temperature: AxisSet<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductionCounters {
    pub part_count: u64,
    pub total_cycles: u64,
    pub on_hours: f64,
    /// Parts per on-hour, recomputed at each part completion.
    pub production_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReadings {
    pub battery_voltage: f64,
    /// Cabinet/ambient temperature, °F.
    pub temperature: f64,
    pub vibration: f64,
    pub current_amps: f64,
    pub oil_pressure: f64,
    pub oil_level: f64,
}

impl Default for HealthReadings {
    fn default() -> Self {
        Self {
            battery_voltage: 3.6,
            temperature: 72.0,
            vibration: 0.0,
            current_amps: 7.0,
            oil_pressure: 50.0,
            oil_level: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    pub power: bool,
    pub execution: ExecutionMode,
    pub time_in_phase: f64,
    pub cycle_time_target: f64,
    pub spindle: SpindleState,
    pub motion: MotionState,
    pub servo: ServoState,
    pub production: ProductionCounters,
    pub health: HealthReadings,
    pub alarms: AlarmLog,
    pub warnings: Vec<Warning>,
    pub program: Option<String>,
    /// Simulated clock: creation time plus every `dt` advanced so far.
    pub clock: DateTime<Utc>,
}

impl MachineState {
    pub fn new(spec: &MachineSpec, rng: &mut dyn RandomnessSource, started_at: DateTime<Utc>) -> Self {
        let limits = spec.axis_limits();
        Self {
            power: true,
            execution: ExecutionMode::Idle,
            time_in_phase: 0.0,
            cycle_time_target: rng.uniform(20.0, 45.0),
            spindle: SpindleState {
                speed: 0.0,
                target_speed: 0.0,
                load: 0.0,
                temperature: 25.0,
                hours: 0.0,
                orientation: 0.0,
            },
            motion: MotionState {
                feed_rate: 0.0,
                target_feed: 0.0,
                rapid_rate: 0.0,
                positions: AxisSet::new(limits.x.midpoint(), limits.y.midpoint(), limits.z.max()),
            },
            servo: ServoState {
                load: AxisSet::splat(0.0),
                following_error: AxisSet::splat(0.0),
                temperature: AxisSet::splat(25.0),
            },
            production: ProductionCounters::default(),
            health: HealthReadings::default(),
            alarms: AlarmLog::default(),
            warnings: Vec::new(),
            program: None,
            clock: started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooledProcess {
    pub phase: MachiningPhase,
    pub tools: Vec<ToolSlot>,
    /// 1-based magazine slot of the spindle tool.
    pub current_tool: u16,
    pub tool_change_count: u64,
    /// Fraction of the current tool's life consumed since it was loaded, `[0, 1]`.
    pub tool_wear: f64,
    pub coolant: Coolant,
}

impl TooledProcess {
    pub fn new(capacity: u16, rng: &mut dyn RandomnessSource) -> Self {
        let tools = (1..=capacity).map(|number| random_tool(number, rng)).collect();
        Self {
            phase: MachiningPhase::Idle,
            tools,
            current_tool: 1,
            tool_change_count: 0,
            tool_wear: 0.0,
            coolant: Coolant::default(),
        }
    }

    pub fn active_tool(&self) -> Option<&ToolSlot> {
        let index = usize::from(self.current_tool).checked_sub(1)?;
        self.tools.get(index)
    }

    pub fn active_tool_mut(&mut self) -> Option<&mut ToolSlot> {
        let index = usize::from(self.current_tool).checked_sub(1)?;
        self.tools.get_mut(index)
    }

    pub fn release_tool(&mut self) {
        if let Some(tool) = self.active_tool_mut() {
            tool.in_use = false;
        }
    }
}

fn random_tool(number: u16, rng: &mut dyn RandomnessSource) -> ToolSlot {
    let tool_type = ToolType::ALL[rng.pick_index(ToolType::ALL.len())];
    let diameter = round_to(rng.uniform(2.0, 22.0), 2);
    let length = round_to(rng.uniform(50.0, 150.0), 2);
    let current_life = TOOL_MAX_LIFE - rng.uniform(0.0, 80.0);
    let flutes = rng.int_inclusive(2, 5) as u8;
    let coating = Coating::ALL[rng.pick_index(Coating::ALL.len())];
    ToolSlot {
        number,
        tool_type,
        diameter,
        length,
        current_life,
        max_life: TOOL_MAX_LIFE,
        flutes,
        coating,
        description: format!("Tool {number}"),
        in_use: false,
        total_cuts: 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PressBrakeProcess {
    pub phase: StrokePhase,
    pub tonnage: f64,
    /// Ram stroke in percent of full travel.
    pub ram_position: f64,
    pub back_gauge: f64,
    pub bend_angle: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaserProcess {
    pub phase: StrokePhase,
    pub laser_power: f64,
    pub gas_pressure: f64,
    pub resonator_temp: f64,
    pub cut_speed: f64,
}

pub const LASER_GAS_IDLE_PRESSURE: f64 = 240.0;
pub const RESONATOR_AMBIENT: f64 = 26.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Process {
    Tooled(TooledProcess),
    PressBrake(PressBrakeProcess),
    Laser(LaserProcess),
}

impl Process {
    pub fn for_spec(spec: &MachineSpec, rng: &mut dyn RandomnessSource) -> Self {
        match spec.archetype {
            Archetype::Milling | Archetype::Turning => {
                Process::Tooled(TooledProcess::new(spec.capabilities.tool_capacity, rng))
            }
            Archetype::PressBrake => Process::PressBrake(PressBrakeProcess {
                phase: StrokePhase::Idle,
                tonnage: 0.0,
                ram_position: 0.0,
                back_gauge: 0.0,
                bend_angle: 0.0,
            }),
            Archetype::Laser => Process::Laser(LaserProcess {
                phase: StrokePhase::Idle,
                laser_power: 0.0,
                gas_pressure: LASER_GAS_IDLE_PRESSURE,
                resonator_temp: RESONATOR_AMBIENT,
                cut_speed: 0.0,
            }),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        match self {
            Process::Tooled(p) => p.phase.into(),
            Process::PressBrake(p) => p.phase.into(),
            Process::Laser(p) => p.phase.into(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == CyclePhase::Idle
    }

    pub fn tooled(&self) -> Option<&TooledProcess> {
        match self {
            Process::Tooled(p) => Some(p),
            _ => None,
        }
    }

    pub fn press_brake(&self) -> Option<&PressBrakeProcess> {
        match self {
            Process::PressBrake(p) => Some(p),
            _ => None,
        }
    }

    pub fn laser(&self) -> Option<&LaserProcess> {
        match self {
            Process::Laser(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::spec::{AxisTravel, Capabilities};
    use sf_randomness::{FixedSource, SeededSource};

    fn mill() -> MachineSpec {
        MachineSpec::new("m1", "Mill", "VF-2", Archetype::Milling, Capabilities::default())
    }

    #[test]
    fn new_state_parks_z_at_safe_height() {
        let spec = mill();
        let mut rng = FixedSource::constant(0.5);
        let state = MachineState::new(&spec, &mut rng, Utc::now());
        assert_eq!(state.motion.positions.z, 508.0);
        assert_eq!(state.motion.positions.x, 381.0);
        assert_eq!(state.execution, ExecutionMode::Idle);
        assert!(state.power);
    }

    #[test]
    fn magazine_matches_capacity_with_randomized_life() {
        let mut rng = SeededSource::from_seed(3);
        let process = TooledProcess::new(24, &mut rng);
        assert_eq!(process.tools.len(), 24);
        for (i, tool) in process.tools.iter().enumerate() {
            assert_eq!(usize::from(tool.number), i + 1);
            assert!(tool.current_life > 20.0 && tool.current_life <= 100.0);
            assert!((2..=5).contains(&tool.flutes));
            assert!(!tool.in_use);
        }
    }

    #[test]
    fn payload_follows_archetype() {
        let mut rng = FixedSource::constant(0.0);
        let mut caps = Capabilities::default();
        caps.axis_limits.y = AxisTravel(0.0, 0.0);
        let press = MachineSpec::new("pb", "Press", "PRESS", Archetype::PressBrake, caps.clone());
        let laser = MachineSpec::new("lz", "Laser", "LASER", Archetype::Laser, caps);
        assert!(Process::for_spec(&press, &mut rng).press_brake().is_some());
        assert!(Process::for_spec(&laser, &mut rng).tooled().is_none());
        assert!(Process::for_spec(&mill(), &mut rng).tooled().is_some());
    }

    #[test]
    fn zero_slot_has_no_active_tool() {
        let mut rng = FixedSource::constant(0.0);
        let mut process = TooledProcess::new(4, &mut rng);
        process.current_tool = 0;
        assert!(process.active_tool().is_none());
        process.release_tool();
    }
}
