//! Controller link trait and error types.
//!
//! This module defines:
//! - `ControllerLink` trait - Operations the synchronization core issues to the controller
//! - `LinkError` enum - Link-level failures (timeouts, protocol rejections, alarms)
//! - `LinkFactory` type alias - Factory function type used by the link registry

use crate::link::config::LinkConfig;
use crate::link::types::{HwState, MuxLink, OutputLevel, OutputPolarity, OutputTarget, SourceKind};
use thiserror::Error;

/// Error types for controller link operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// No answer within the configured timeout.
    #[error("Link timeout: {0}")]
    Timeout(String),

    /// The controller answered but rejected or garbled the request.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The axis reported a power-off or alarm condition.
    #[error("Axis alarm: {0}")]
    Alarm(String),

    /// Socket or transport failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The link was never opened or has been closed.
    #[error("Link not connected")]
    NotConnected,

    /// Link driver not found.
    #[error("Link driver not found: {0}")]
    DriverNotFound(String),
}

impl LinkError {
    /// Whether another attempt may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Protocol(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                Self::Timeout(e.to_string())
            }
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Factory function type for creating link instances.
pub type LinkFactory = fn(&LinkConfig) -> Result<Box<dyn ControllerLink>, LinkError>;

/// Operations the synchronization core needs from a motion controller.
///
/// Every call is synchronous and may block up to the link timeout. Calls are
/// never retried by the link itself; retry policy belongs to the caller.
pub trait ControllerLink: Send {
    /// Returns the link's unique identifier (e.g. "simulation", "tcp").
    fn name(&self) -> &'static str;

    /// List the axes present on the controller.
    fn find_axes(&mut self) -> Result<Vec<u16>, LinkError>;

    /// Read the status word of `axis`.
    fn read_state(&mut self, axis: u16) -> Result<HwState, LinkError>;

    /// Read configuration register `key` of `axis`.
    fn read_config(&mut self, axis: u16, key: &str) -> Result<String, LinkError>;

    /// Write `level` to an output of `axis`.
    fn write_output(
        &mut self,
        axis: u16,
        target: &OutputTarget,
        level: OutputLevel,
        polarity: OutputPolarity,
    ) -> Result<(), LinkError>;

    /// Load an ecam table compared against `source`.
    ///
    /// The controller rejects tables that are not strictly increasing with
    /// `LinkError::Protocol`. Repeated values are NOT detected by every
    /// controller firmware; callers must not send them.
    fn load_table(&mut self, axis: u16, values: &[f64], source: SourceKind)
    -> Result<(), LinkError>;

    /// Route `axis` to output `line` through the position multiplexer.
    fn add_link(
        &mut self,
        axis: u16,
        line: &str,
        pos: bool,
        aux: bool,
        hard: bool,
    ) -> Result<(), LinkError>;

    /// Remove every multiplexer route to `line`.
    fn clear_link(&mut self, line: &str) -> Result<(), LinkError>;

    /// Current multiplexer routes.
    fn list_links(&mut self) -> Result<Vec<MuxLink>, LinkError>;

    /// Emit one synchronization pulse from the current target-encoder state.
    fn sync_now(&mut self, axis: u16) -> Result<(), LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::Timeout("44:?STATUS".to_string());
        assert!(err.to_string().contains("44:?STATUS"));

        let err = LinkError::DriverNotFound("canbus".to_string());
        assert!(err.to_string().contains("canbus"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LinkError::Timeout(String::new()).is_transient());
        assert!(LinkError::Protocol(String::new()).is_transient());
        assert!(LinkError::Io(String::new()).is_transient());
        assert!(!LinkError::Alarm(String::new()).is_transient());
        assert!(!LinkError::NotConnected.is_transient());
    }

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let err: LinkError = std::io::Error::new(std::io::ErrorKind::TimedOut, "late").into();
        assert!(matches!(err, LinkError::Timeout(_)));

        let err: LinkError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, LinkError::Io(_)));
    }
}
