//! Simulation link module.
//!
//! In-memory motion controller emulator for development and testing without
//! physical hardware. Tests keep a [`SimHandle`] to inspect what the core
//! sent and to inject faults.

mod config;
mod controller;
mod link;

pub use config::{SimAxisConfig, SimulationConfig};
pub use controller::{CallCounters, SimAxis, SimController};
pub use link::{SimHandle, SimulatedLink};

use ecam_common::link::config::LinkConfig;
use ecam_common::link::driver::{ControllerLink, LinkError};

/// Factory function to create a simulation link instance.
pub fn create_link(config: &LinkConfig) -> Result<Box<dyn ControllerLink>, LinkError> {
    let sim_config = match config.active_driver_config() {
        Some(section) => SimulationConfig::from_toml(section)?,
        None => SimulationConfig::default(),
    };
    Ok(Box::new(SimulatedLink::new(&sim_config)))
}
