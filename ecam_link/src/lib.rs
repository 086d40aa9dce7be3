//! # ECAM Link Library
//!
//! Controller link drivers with a pluggable registry.
//!
//! Drivers implement the `ControllerLink` trait defined in
//! `ecam_common::link::driver`.
//!
//! # Module Structure
//!
//! - [`registry`] - Link factory registration
//! - [`drivers`] - Link driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ecam_link                             │
//! │  ┌──────────────┐   create()   ┌──────────────────────────┐  │
//! │  │ LinkRegistry │─────────────►│ Box<dyn ControllerLink>  │  │
//! │  └──────┬───────┘              └──────────────────────────┘  │
//! │         │ register()                                         │
//! │   ┌─────┴──────┬─────────────┐                               │
//! │   │ simulation │     tcp     │                               │
//! │   └────────────┴─────────────┘                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod drivers;
pub mod registry;

pub use crate::drivers::{default_registry, register_all_links};
pub use crate::registry::LinkRegistry;
