//! Core types shared by the shop-floor simulation crates.

use serde::{Deserialize, Serialize};

pub type MachineId = String;
pub type AlarmCode = u32;

/// Machine family; selects the cycle engine and the archetype payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Archetype {
    #[serde(rename = "CNC_MILL")]
    Milling,
    #[serde(rename = "LATHE")]
    Turning,
    #[serde(rename = "PRESS_BRAKE")]
    PressBrake,
    #[serde(rename = "LASER")]
    Laser,
}

impl Archetype {
    /// Milling and turning centers carry a tool magazine and a coolant system.
    pub fn is_tooled(self) -> bool {
        matches!(self, Archetype::Milling | Archetype::Turning)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    Idle,
    Running,
    Alarm,
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// One value per linear axis, serialized as `{"X": .., "Y": .., "Z": ..}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AxisSet<T> {
    #[serde(rename = "X")]
    pub x: T,
    #[serde(rename = "Y")]
    pub y: T,
    #[serde(rename = "Z")]
    pub z: T,
}

impl<T> AxisSet<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> AxisSet<U> {
        AxisSet {
            x: f(&self.x),
            y: f(&self.y),
            z: f(&self.z),
        }
    }
}

impl<T: Copy> AxisSet<T> {
    pub fn splat(value: T) -> Self {
        Self::new(value, value, value)
    }
}

/// Round to a fixed number of decimal places for the wire format.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub mod phase;
pub mod spec;
pub mod telemetry;
pub mod tooling;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_uses_legacy_wire_names() {
        assert_eq!(serde_json::to_string(&Archetype::Milling).unwrap(), "\"CNC_MILL\"");
        assert_eq!(serde_json::to_string(&Archetype::PressBrake).unwrap(), "\"PRESS_BRAKE\"");
        assert!(Archetype::Turning.is_tooled());
        assert!(!Archetype::Laser.is_tooled());
    }

    #[test]
    fn axis_set_serializes_upper_case_keys() {
        let set = AxisSet::new(1.0, 2.0, 3.0);
        let value = serde_json::to_value(set).unwrap();
        assert_eq!(value["X"], 1.0);
        assert_eq!(value["Z"], 3.0);
        assert_eq!(*set.get(Axis::Y), 2.0);
    }

    #[test]
    fn round_to_keeps_requested_precision() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(0.0004, 3), 0.0);
        assert_eq!(round_to(99.95, 0), 100.0);
    }
}
