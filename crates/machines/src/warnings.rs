//! Advisory warnings, recomputed from scratch every tick. They never latch
//! and never change the execution mode.

use sf_core::telemetry::{Severity, Warning, WarningKind};

use crate::state::{MachineState, Process};

const BATTERY_WARN_VOLTS: f64 = 3.2;
const COOLANT_WARN_LEVEL: f64 = 20.0;
const TOOL_WARN_LIFE: f64 = 15.0;
const SPINDLE_WARN_TEMP: f64 = 75.0;
const LOAD_CAUTION: f64 = 85.0;

/// Advisory conditions for the current tick. The result replaces the previous
/// set wholesale.
pub fn evaluate(state: &MachineState, process: &Process) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if state.health.battery_voltage < BATTERY_WARN_VOLTS {
        warnings.push(warning(WarningKind::BatteryLow, Severity::Warning, "Battery voltage low".into()));
    }

    if let Some(tooled) = process.tooled() {
        if tooled.coolant.level < COOLANT_WARN_LEVEL {
            warnings.push(warning(
                WarningKind::CoolantLow,
                Severity::Warning,
                "Coolant level below 20%".into(),
            ));
        }
        if let Some(tool) = tooled.active_tool() {
            if tool.current_life < TOOL_WARN_LIFE {
                warnings.push(warning(
                    WarningKind::ToolWear,
                    Severity::Warning,
                    format!("Tool {} life below 15%", tool.number),
                ));
            }
        }
    }

    if state.spindle.temperature > SPINDLE_WARN_TEMP {
        warnings.push(warning(
            WarningKind::HighTemp,
            Severity::Warning,
            "Spindle temperature elevated".into(),
        ));
    }

    if state.spindle.load > LOAD_CAUTION {
        warnings.push(warning(WarningKind::HighLoad, Severity::Caution, "Spindle load above 85%".into()));
    }

    warnings
}

fn warning(kind: WarningKind, severity: Severity, message: String) -> Warning {
    Warning { kind, severity, message }
}
