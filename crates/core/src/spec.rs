//! Static machine descriptors. Built once by the factory, never mutated.

use serde::{Deserialize, Serialize};

use crate::{Archetype, AxisSet, MachineId};

/// Travel limits of one axis, serialized as `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AxisTravel(pub f64, pub f64);

impl AxisTravel {
    pub fn min(&self) -> f64 {
        self.0
    }

    pub fn max(&self) -> f64 {
        self.1
    }

    pub fn span(&self) -> f64 {
        self.1 - self.0
    }

    pub fn midpoint(&self) -> f64 {
        (self.0 + self.1) / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.0).min(self.1)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.0 && value <= self.1
    }
}

/// Capability ceilings, exported verbatim as the snapshot's `specs` group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub axis_limits: AxisSet<AxisTravel>,
    /// Spindle power in HP.
    pub spindle_power: f64,
    #[serde(rename = "maxRPM")]
    pub max_rpm: f64,
    /// Rapid traverse in inches per minute.
    pub rapid_traverse: f64,
    pub tool_capacity: u16,
    pub max_tonnage: f64,
    /// Laser source power in watts.
    pub max_laser_power: f64,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            axis_limits: AxisSet::new(
                AxisTravel(0.0, 762.0),
                AxisTravel(0.0, 406.0),
                AxisTravel(0.0, 508.0),
            ),
            spindle_power: 30.0,
            max_rpm: 8100.0,
            rapid_traverse: 1000.0,
            tool_capacity: 24,
            max_tonnage: 200.0,
            max_laser_power: 6000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineSpec {
    pub id: MachineId,
    pub name: String,
    pub model: String,
    pub archetype: Archetype,
    pub capabilities: Capabilities,
}

impl MachineSpec {
    pub fn new(
        id: impl Into<MachineId>,
        name: impl Into<String>,
        model: impl Into<String>,
        archetype: Archetype,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: model.into(),
            archetype,
            capabilities,
        }
    }

    pub fn axis_limits(&self) -> &AxisSet<AxisTravel> {
        &self.capabilities.axis_limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_clamps_into_bounds() {
        let travel = AxisTravel(0.0, 300.0);
        assert_eq!(travel.clamp(-4.0), 0.0);
        assert_eq!(travel.clamp(412.0), 300.0);
        assert_eq!(travel.clamp(12.5), 12.5);
        assert_eq!(travel.midpoint(), 150.0);
    }

    #[test]
    fn degenerate_travel_pins_axis() {
        let travel = AxisTravel(0.0, 0.0);
        assert_eq!(travel.clamp(5.0), 0.0);
        assert!(travel.contains(0.0));
        assert_eq!(travel.span(), 0.0);
    }

    #[test]
    fn capabilities_serialize_with_wire_names() {
        let value = serde_json::to_value(Capabilities::default()).unwrap();
        assert_eq!(value["maxRPM"], 8100.0);
        assert_eq!(value["toolCapacity"], 24);
        assert_eq!(value["axisLimits"]["X"][1], 762.0);
    }
}
