//! Controller link contract and hardware types.
//!
//! This module contains the interface the synchronization core needs from
//! the motion controller, and the configuration of the link itself.

pub mod config;
pub mod driver;
pub mod types;
