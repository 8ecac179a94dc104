//! Production-cycle phases.
//!
//! Each cycle engine owns its own closed phase enum; `CyclePhase` is the flat
//! label those phases are reported under in snapshots and alarm records.

use serde::{Deserialize, Serialize};

/// Milling and turning cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachiningPhase {
    #[default]
    Idle,
    SpindleRamp,
    Rapid,
    Cutting,
    Retract,
    Dwell,
    Finish,
}

/// Single-stroke cycle used by the press brake and the laser.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrokePhase {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Idle,
    SpindleRamp,
    Rapid,
    Cutting,
    Retract,
    Dwell,
    Finish,
    Running,
}

impl From<MachiningPhase> for CyclePhase {
    fn from(phase: MachiningPhase) -> Self {
        match phase {
            MachiningPhase::Idle => CyclePhase::Idle,
            MachiningPhase::SpindleRamp => CyclePhase::SpindleRamp,
            MachiningPhase::Rapid => CyclePhase::Rapid,
            MachiningPhase::Cutting => CyclePhase::Cutting,
            MachiningPhase::Retract => CyclePhase::Retract,
            MachiningPhase::Dwell => CyclePhase::Dwell,
            MachiningPhase::Finish => CyclePhase::Finish,
        }
    }
}

impl From<StrokePhase> for CyclePhase {
    fn from(phase: StrokePhase) -> Self {
        match phase {
            StrokePhase::Idle => CyclePhase::Idle,
            StrokePhase::Running => CyclePhase::Running,
        }
    }
}
