//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all ecam applications, and the top-level [`ControllerConfig`]
//! describing one trigger/gate controller.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ecam_common::config::{ConfigError, ConfigLoader, ControllerConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ControllerConfig::load(Path::new("trigger.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::DEFAULT_AXIS_INFOS;
use crate::link::config::LinkConfig;
use crate::motor::MotorEntry;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all ecam applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "ecam-trigger-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_axis_infos() -> String {
    DEFAULT_AXIS_INFOS.to_string()
}

/// Per-axis feedback source override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcamSourceEntry {
    /// Controller axis number.
    pub axis: u16,
    /// Source name (`ENCIN`, `ABSENC`, `INPOS`, `AXIS` or `TGTENC`).
    pub source: String,
}

/// Trigger element configuration (`[trigger]` section).
///
/// ```toml
/// [trigger]
/// controller_alias = "ipap01"
/// element = 0
/// axis_infos = "InfoA, InfoB"
/// start_trigger_only = false
///
/// [[trigger.ecam_source]]
/// axis = 44
/// source = "ENCIN"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Alias of the motor controller the trigger motors belong to.
    #[serde(default)]
    pub controller_alias: String,

    /// Trigger element index. Element 0 drives the sync line, any other
    /// element drives the auxiliary outputs listed in `axis_infos`.
    #[serde(default)]
    pub element: u16,

    /// Comma-separated auxiliary output names.
    #[serde(default = "default_axis_infos")]
    pub axis_infos: String,

    /// Initial value of the `StartTriggerOnly` attribute.
    #[serde(default)]
    pub start_trigger_only: bool,

    /// Feedback source overrides. Axes not listed use the raw axis position.
    #[serde(default)]
    pub ecam_source: Vec<EcamSourceEntry>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            controller_alias: String::new(),
            element: 0,
            axis_infos: default_axis_infos(),
            start_trigger_only: false,
            ecam_source: Vec::new(),
        }
    }
}

impl TriggerConfig {
    /// Auxiliary output names, trimmed, empty entries dropped.
    pub fn axis_info_list(&self) -> Vec<String> {
        self.axis_infos
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Feedback source overrides keyed by axis.
    pub fn source_map(&self) -> HashMap<u16, String> {
        self.ecam_source
            .iter()
            .map(|e| (e.axis, e.source.clone()))
            .collect()
    }

    /// Validate the trigger section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.element != 0 && self.axis_info_list().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "trigger element {} needs at least one entry in axis_infos",
                self.element
            )));
        }

        let mut axes = HashSet::new();
        for entry in &self.ecam_source {
            if !axes.insert(entry.axis) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate ecam_source axis: {}",
                    entry.axis
                )));
            }
            if entry.source.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Empty ecam_source for axis {}",
                    entry.axis
                )));
            }
        }
        Ok(())
    }
}

/// Complete configuration of one trigger/gate controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Common fields.
    pub shared: SharedConfig,

    /// Controller link settings.
    #[serde(default)]
    pub link: LinkConfig,

    /// Trigger element settings.
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Motors known to the static motor directory.
    #[serde(default)]
    pub motors: Vec<MotorEntry>,
}

impl ControllerConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::ValidationError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.link.validate()?;
        self.trigger.validate()?;

        let mut axes = HashSet::new();
        let mut aliases = HashSet::new();
        for motor in &self.motors {
            motor.validate()?;
            if !axes.insert(motor.axis) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate motor axis: {}",
                    motor.axis
                )));
            }
            if !aliases.insert(motor.alias.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate motor alias: {}",
                    motor.alias
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
