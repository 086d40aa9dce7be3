//! Synchronization error types.
//!
//! Request validation errors are detected before any hardware I/O and are never
//! retried. Link errors are retried by [`crate::retry::RetryPolicy`] and
//! escalate to [`SyncError::TableLoadFailed`] once the budget is spent.

use ecam_common::link::driver::LinkError;
use ecam_common::motor::DirectoryError;
use thiserror::Error;

/// Errors surfaced by the synchronization core.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A configuration register could not be read or is invalid.
    #[error("Configuration register {key} unavailable on axis {axis}: {reason}")]
    ConfigUnavailable {
        /// Axis queried.
        axis: u16,
        /// Register name.
        key: String,
        /// Link error or parse failure.
        reason: String,
    },

    /// Time-driven synchronization asked for more than one pulse.
    #[error("Multiple triggers synchronized by time are not supported (repeats: {0})")]
    UnsupportedMultiplePulses(u32),

    /// The synchronization request itself is invalid.
    #[error("Invalid synchronization: {0}")]
    InvalidSpec(String),

    /// More positions than the controller accepts.
    #[error("Trigger by position accepts at most {max} points (requested {points})")]
    TableTooLarge {
        /// Requested points.
        points: u32,
        /// Hardware maximum.
        max: usize,
    },

    /// Zero step with more than one point.
    #[error("Degenerate trigger table: {points} points at the same position")]
    DegenerateTable {
        /// Requested points.
        points: u32,
    },

    /// Table not strictly monotonic after unit conversion.
    #[error("Trigger table not strictly monotonic at index {index}")]
    NonMonotonicTable {
        /// First offending index.
        index: usize,
    },

    /// Every load attempt failed.
    #[error("Can not send trigger table after {attempts} attempts: {last}")]
    TableLoadFailed {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last: LinkError,
    },

    /// Position-driven operation without a bound motor.
    #[error("No motor bound to the trigger element")]
    NoMotorBound,

    /// Operation not allowed in the current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),

    /// Unknown axis parameter.
    #[error("Unsupported axis parameter {name} for element {element}")]
    UnsupportedParameter {
        /// Parameter name.
        name: String,
        /// Trigger element.
        element: u16,
    },

    /// Axis parameter value that cannot be used.
    #[error("Invalid value {value:?} for axis parameter {name}")]
    InvalidParameterValue {
        /// Parameter name.
        name: String,
        /// Rejected value.
        value: String,
    },

    /// Link failure outside the retried paths.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Motor directory failure.
    #[error(transparent)]
    Motor(#[from] DirectoryError),
}

impl SyncError {
    /// True for errors raised by request validation, before any I/O.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMultiplePulses(_)
                | Self::InvalidSpec(_)
                | Self::TableTooLarge { .. }
                | Self::DegenerateTable { .. }
                | Self::NonMonotonicTable { .. }
        )
    }
}
