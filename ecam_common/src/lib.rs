//! ECAM Common Library
//!
//! This crate provides shared constants, configuration loading utilities
//! and the controller contracts used by all ecam workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Hardware limits and protocol defaults
//! - [`config`] - Configuration loading traits and types
//! - [`link`] - Controller link contract, hardware types and link configuration
//! - [`motor`] - Motor directory contract (logical motor → step-per-unit)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ecam_common::prelude::*;
//!
//! assert_eq!(MAX_TABLE_SIZE, 20477);
//! ```

pub mod config;
pub mod consts;
pub mod link;
pub mod motor;
pub mod prelude;
