//! The fixed machine catalog and the factory that instantiates it.

use chrono::{DateTime, Utc};
use sf_core::spec::{AxisTravel, Capabilities, MachineSpec};
use sf_core::{Archetype, AxisSet};
use sf_randomness::{RandomnessSource, SeededSource};
use tracing::info;

use crate::fleet::Fleet;
use crate::machine::Machine;

/// Odd 64-bit constant used to spread per-machine seeds apart.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

fn travel(x: f64, y: f64, z: f64) -> AxisSet<AxisTravel> {
    AxisSet::new(AxisTravel(0.0, x), AxisTravel(0.0, y), AxisTravel(0.0, z))
}

/// The six shop-floor machines, in display order.
pub fn default_catalog() -> Vec<MachineSpec> {
    let base = Capabilities::default();
    vec![
        MachineSpec::new("haas_vf2", "Haas VF-2", "VF-2", Archetype::Milling, base.clone()),
        MachineSpec::new(
            "haas_vf4",
            "Haas VF-4",
            "VF-4",
            Archetype::Milling,
            Capabilities {
                axis_limits: travel(1270.0, 508.0, 635.0),
                rapid_traverse: 900.0,
                tool_capacity: 30,
                ..base.clone()
            },
        ),
        MachineSpec::new(
            "toyoda_hmc",
            "Toyoda HMC",
            "HMC",
            Archetype::Milling,
            Capabilities {
                axis_limits: travel(800.0, 800.0, 800.0),
                spindle_power: 40.0,
                max_rpm: 12000.0,
                rapid_traverse: 1200.0,
                tool_capacity: 60,
                ..base.clone()
            },
        ),
        MachineSpec::new(
            "cnc_lathe",
            "CNC Lathe",
            "ST-20",
            Archetype::Turning,
            Capabilities {
                axis_limits: travel(300.0, 0.0, 600.0),
                spindle_power: 20.0,
                max_rpm: 4000.0,
                rapid_traverse: 800.0,
                tool_capacity: 12,
                ..base.clone()
            },
        ),
        MachineSpec::new(
            "press_brake",
            "Press Brake 200T",
            "PRESS",
            Archetype::PressBrake,
            Capabilities {
                axis_limits: travel(3000.0, 0.0, 1000.0),
                tool_capacity: 0,
                max_tonnage: 200.0,
                ..base.clone()
            },
        ),
        MachineSpec::new(
            "laser_cut",
            "Fiber Laser 6kW",
            "LASER",
            Archetype::Laser,
            Capabilities {
                axis_limits: travel(3000.0, 1500.0, 200.0),
                tool_capacity: 0,
                max_laser_power: 6000.0,
                ..base
            },
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct FactoryOptions {
    /// Base seed; `None` seeds every machine from entropy.
    pub seed: Option<u64>,
    pub started_at: DateTime<Utc>,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            seed: None,
            started_at: Utc::now(),
        }
    }
}

impl FactoryOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachineFactory {
    options: FactoryOptions,
}

impl MachineFactory {
    pub fn new(options: FactoryOptions) -> Self {
        Self { options }
    }

    /// Independent source for the machine at catalog position `index`.
    pub fn source_for(&self, index: usize) -> Box<dyn RandomnessSource> {
        match self.options.seed {
            Some(seed) => {
                let offset = (index as u64).wrapping_add(1).wrapping_mul(SEED_STRIDE);
                Box::new(SeededSource::from_seed(seed ^ offset))
            }
            None => Box::new(SeededSource::from_entropy()),
        }
    }

    pub fn build(&self, index: usize, spec: MachineSpec) -> Machine {
        Machine::new(spec, self.source_for(index), self.options.started_at)
    }

    pub fn create_fleet(&self, catalog: Vec<MachineSpec>) -> Fleet {
        let mut fleet = Fleet::default();
        for (index, spec) in catalog.into_iter().enumerate() {
            fleet.insert(self.build(index, spec));
        }
        info!(machines = fleet.len(), seed = ?self.options.seed, "fleet created");
        fleet
    }

    pub fn create_default_fleet(&self) -> Fleet {
        self.create_fleet(default_catalog())
    }
}

/// Default catalog, entropy-seeded, clock starting now.
pub fn create_default_fleet() -> Fleet {
    MachineFactory::default().create_default_fleet()
}
