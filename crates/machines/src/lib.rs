//! Per-machine behavioral simulation: cycle engines, health sensors, alarms and
//! warnings, plus the factory and the fleet context that owns every machine.

pub mod alarms;
pub mod cycle;
pub mod factory;
pub mod fleet;
pub mod health;
pub mod machine;
pub mod state;
pub mod warnings;

pub use alarms::{AlarmKind, AlarmLog};
pub use factory::{create_default_fleet, default_catalog, FactoryOptions, MachineFactory};
pub use fleet::{Fleet, FleetError, FleetSnapshot, TickReport};
pub use machine::Machine;
pub use state::{MachineState, Process};

use sf_core::MachineId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("machine {0} has no tool magazine")]
    NoToolMagazine(MachineId),
    #[error("tool slot {0} does not exist")]
    UnknownToolSlot(u16),
    #[error("machine {0} is running a cycle")]
    MachineBusy(MachineId),
}
