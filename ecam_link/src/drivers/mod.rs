//! Controller link driver implementations.
//!
//! - [`simulation`] - In-memory controller emulator for development and testing
//! - [`tcp`] - ASCII line protocol over TCP
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `ControllerLink` trait from `ecam_common::link::driver`
//! 3. Register its factory in [`register_all_links`]

pub mod simulation;
pub mod tcp;

use crate::registry::LinkRegistry;

/// Register all built-in link drivers.
pub fn register_all_links(registry: &mut LinkRegistry) {
    registry.register("simulation", simulation::create_link);
    registry.register("tcp", tcp::create_link);
}

/// Registry pre-populated with the built-in drivers.
pub fn default_registry() -> LinkRegistry {
    let mut registry = LinkRegistry::new();
    register_all_links(&mut registry);
    registry
}
