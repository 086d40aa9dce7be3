//! Controller link configuration (`[link]` section).

use crate::config::ConfigError;
use crate::consts::{DEFAULT_PORT, DEFAULT_TIMEOUT_S};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_S
}

/// Link settings.
///
/// ```toml
/// [link]
/// driver = "tcp"
/// host = "icepap01"
/// port = 5000
/// timeout = 0.5
///
/// [link.driver_config.simulation]
/// fail_state_reads = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Link driver name (`simulation`, `tcp`).
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Controller host name.
    #[serde(default)]
    pub host: String,

    /// Controller TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Per-driver configuration sections.
    /// Key = driver name, Value = driver-specific TOML table.
    #[serde(default)]
    pub driver_config: HashMap<String, toml::Value>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: String::new(),
            port: default_port(),
            timeout: default_timeout(),
            driver_config: HashMap::new(),
        }
    }
}

impl LinkConfig {
    /// Per-call timeout as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Driver-specific section for the active driver, if any.
    pub fn active_driver_config(&self) -> Option<&toml::Value> {
        self.driver_config.get(&self.driver)
    }

    /// Validate the link settings.
    ///
    /// # Validation Rules
    /// 1. `driver` is not empty
    /// 2. `timeout` is finite and > 0
    /// 3. the `tcp` driver has a host
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "link driver cannot be empty".to_string(),
            ));
        }
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "link timeout must be > 0 (got {})",
                self.timeout
            )));
        }
        if self.driver == "tcp" && self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tcp link requires a host".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.driver, "simulation");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.timeout_duration(), Duration::from_millis(500));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_timeout() {
        for timeout in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let cfg = LinkConfig {
                timeout,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "timeout {timeout} accepted");
        }
    }

    #[test]
    fn tcp_requires_host() {
        let cfg = LinkConfig {
            driver: "tcp".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn driver_section_lookup() {
        let cfg: LinkConfig = toml::from_str(
            r#"
driver = "simulation"
[driver_config.simulation]
fail_state_reads = 2
"#,
        )
        .unwrap();
        let section = cfg.active_driver_config().unwrap();
        assert_eq!(section.get("fail_state_reads").and_then(|v| v.as_integer()), Some(2));
    }
}
