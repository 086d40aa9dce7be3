//! Synchronization state machine and status classification.

pub mod machine;
pub mod status;
