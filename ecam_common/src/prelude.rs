//! Prelude module for common re-exports.
//!
//! ```rust
//! use ecam_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControllerConfig, EcamSourceEntry, SharedConfig, TriggerConfig,
};
pub use crate::link::config::LinkConfig;

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{MAX_TABLE_SIZE, PULSE_DWELL, SYNC_LINE};

// ─── Controller Link ────────────────────────────────────────────────
pub use crate::link::driver::{ControllerLink, LinkError, LinkFactory};
pub use crate::link::types::{
    HwState, MuxLink, OutputLevel, OutputPolarity, OutputTarget, SourceKind,
};

// ─── Motors ─────────────────────────────────────────────────────────
pub use crate::motor::{DirectoryError, MotorDirectory, MotorEntry, StaticMotorDirectory};
