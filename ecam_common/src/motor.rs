//! Motor directory contract.
//!
//! Maps a logical motor identifier to its controller axis, alias and
//! step-per-unit scale. The synchronization core reads `step_per_unit` once
//! per binding; a directory backed by a live device proxy and a static one
//! built from configuration are interchangeable.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error types for motor directory lookups.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// No motor with this identifier.
    #[error("Unknown motor: {0}")]
    UnknownMotor(u16),
}

/// Motor entry (`[[motors]]` section).
///
/// ```toml
/// [[motors]]
/// axis = 44
/// alias = "dmot44"
/// step_per_unit = 100.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorEntry {
    /// Controller axis number (also the logical motor identifier).
    pub axis: u16,
    /// User-facing alias.
    pub alias: String,
    /// Motor steps per user unit.
    pub step_per_unit: f64,
}

impl MotorEntry {
    /// Validate one entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alias.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "motor {} has an empty alias",
                self.axis
            )));
        }
        if !self.step_per_unit.is_finite() || self.step_per_unit == 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "motor {} step_per_unit must be finite and non-zero (got {})",
                self.axis, self.step_per_unit
            )));
        }
        Ok(())
    }
}

/// Lookup of logical motors.
pub trait MotorDirectory: Send {
    /// Steps per user unit of `motor`.
    fn step_per_unit(&self, motor: u16) -> Result<f64, DirectoryError>;

    /// Alias of `motor`, if it is known.
    fn alias(&self, motor: u16) -> Option<String>;
}

/// Motor directory built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticMotorDirectory {
    motors: HashMap<u16, MotorEntry>,
}

impl StaticMotorDirectory {
    /// Build from configuration entries. Later duplicates replace earlier ones.
    pub fn from_entries(entries: &[MotorEntry]) -> Self {
        Self {
            motors: entries.iter().map(|m| (m.axis, m.clone())).collect(),
        }
    }

    /// Number of known motors.
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// True if no motor is known.
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }
}

impl MotorDirectory for StaticMotorDirectory {
    fn step_per_unit(&self, motor: u16) -> Result<f64, DirectoryError> {
        self.motors
            .get(&motor)
            .map(|m| m.step_per_unit)
            .ok_or(DirectoryError::UnknownMotor(motor))
    }

    fn alias(&self, motor: u16) -> Option<String> {
        self.motors.get(&motor).map(|m| m.alias.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(axis: u16, alias: &str, spu: f64) -> MotorEntry {
        MotorEntry {
            axis,
            alias: alias.to_string(),
            step_per_unit: spu,
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        let dir = StaticMotorDirectory::from_entries(&[entry(1, "m1", 100.0), entry(2, "m2", -5.0)]);
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.step_per_unit(2).unwrap(), -5.0);
        assert_eq!(dir.alias(1).as_deref(), Some("m1"));
        assert!(matches!(dir.step_per_unit(3), Err(DirectoryError::UnknownMotor(3))));
        assert!(dir.alias(3).is_none());
    }

    #[test]
    fn entry_validation() {
        assert!(entry(1, "m1", 100.0).validate().is_ok());
        assert!(entry(1, " ", 100.0).validate().is_err());
        assert!(entry(1, "m1", 0.0).validate().is_err());
        assert!(entry(1, "m1", f64::NAN).validate().is_err());
    }
}
