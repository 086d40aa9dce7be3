//! Simulation link configuration (`[link.driver_config.simulation]`).

use ecam_common::link::driver::LinkError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

/// One simulated axis.
///
/// ```toml
/// [[link.driver_config.simulation.axes]]
/// axis = 44
/// registers = { ANSTEP = "8000", EINNSTEP = "10000", TGTENC = "NONE" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimAxisConfig {
    /// Axis number.
    pub axis: u16,
    /// Configuration registers overriding the defaults.
    #[serde(default)]
    pub registers: HashMap<String, String>,
    /// Initial motor power.
    #[serde(default = "default_true")]
    pub power_on: bool,
}

/// Simulation link settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated axes. Axes 1..=8 with default registers when empty.
    #[serde(default)]
    pub axes: Vec<SimAxisConfig>,
    /// Number of upcoming status reads that time out.
    #[serde(default)]
    pub fail_state_reads: u32,
    /// Number of upcoming table loads that time out.
    #[serde(default)]
    pub fail_table_loads: u32,
}

impl SimulationConfig {
    /// Parse from the driver's TOML section.
    pub fn from_toml(value: &toml::Value) -> Result<Self, LinkError> {
        value
            .clone()
            .try_into()
            .map_err(|e| LinkError::Protocol(format!("invalid simulation config: {e}")))
    }
}
