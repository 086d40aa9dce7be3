//! Registry of controller link drivers.
//!
//! Provides a `LinkRegistry` struct for registering link factories and
//! opening links by name. Constructor-injected, no global state.

use ecam_common::link::config::LinkConfig;
use ecam_common::link::driver::{ControllerLink, LinkError, LinkFactory};
use std::collections::HashMap;
use tracing::info;

/// Registry of available link drivers.
pub struct LinkRegistry {
    factories: HashMap<&'static str, LinkFactory>,
}

impl LinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a link factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: LinkFactory) {
        if self.factories.contains_key(name) {
            panic!("Link driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a link factory by name.
    pub fn get_factory(&self, name: &str) -> Option<LinkFactory> {
        self.factories.get(name).copied()
    }

    /// Open the link named in `config.driver`.
    ///
    /// # Errors
    /// Returns `LinkError::DriverNotFound` if no driver with that name is
    /// registered, or the factory's own error.
    pub fn create(&self, config: &LinkConfig) -> Result<Box<dyn ControllerLink>, LinkError> {
        let factory = self
            .get_factory(&config.driver)
            .ok_or_else(|| LinkError::DriverNotFound(config.driver.clone()))?;
        let link = factory(config)?;
        info!("Opened '{}' link (timeout {}s)", link.name(), config.timeout);
        Ok(link)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation;

    #[test]
    fn registry_register_and_create() {
        let mut reg = LinkRegistry::new();
        reg.register("sim", simulation::create_link);

        let config = LinkConfig {
            driver: "sim".into(),
            ..Default::default()
        };
        let link = reg.create(&config).expect("should create");
        assert_eq!(link.name(), "simulation");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = LinkRegistry::new();
        let config = LinkConfig {
            driver: "nonexistent".into(),
            ..Default::default()
        };
        assert!(matches!(
            reg.create(&config),
            Err(LinkError::DriverNotFound(_))
        ));
    }

    #[test]
    fn registry_list_drivers() {
        let mut reg = LinkRegistry::new();
        reg.register("alpha", simulation::create_link);
        reg.register("beta", simulation::create_link);

        let mut names = reg.list_drivers();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = LinkRegistry::new();
        reg.register("dup", simulation::create_link);
        reg.register("dup", simulation::create_link);
    }
}
