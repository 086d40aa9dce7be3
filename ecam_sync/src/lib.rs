//! # ECAM Synchronization Library
//!
//! Drives one motion-controller axis to emit trigger/gate pulses, either by
//! direct output toggling (time-driven) or from a position table loaded into
//! the controller's ecam comparator (position-driven).
//!
//! ## Pipeline
//!
//! ```text
//! SynchronizationSpec ──► SourceSelector ──► UnitConverter ──► table::build ──► load
//!                          (which encoder)    (native units)    (ecam table)    (retried)
//! ```
//!
//! [`controller::TriggerController`] owns the pipeline and the
//! [`state::machine::SyncStateMachine`]; every call is synchronous and runs
//! on the caller's thread.

pub mod controller;
pub mod convert;
pub mod error;
pub mod retry;
pub mod source;
pub mod state;
pub mod table;

pub use crate::controller::TriggerController;
pub use crate::error::SyncError;
pub use crate::table::{SyncMode, SynchronizationSpec, TriggerTable};
