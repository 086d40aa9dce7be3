//! System-wide constants for the ecam workspace.
//!
//! Single source of truth for hardware limits, protocol mnemonics and
//! default values. Imported by all crates.

use std::time::Duration;

/// Maximum number of positions the controller accepts in one ecam table.
pub const MAX_TABLE_SIZE: usize = 20477;

/// Default TCP port of the motion controller.
pub const DEFAULT_PORT: u16 = 5000;

/// Default per-call link timeout in seconds.
pub const DEFAULT_TIMEOUT_S: f64 = 0.5;

/// External deadline the retry budget is sized against, in seconds.
pub const RETRY_DEADLINE_S: f64 = 3.0;

/// Per-attempt overhead added to the link timeout when sizing the retry budget.
pub const RETRY_OVERHEAD_S: f64 = 0.1;

/// Hold time of a time-driven trigger pulse.
pub const PULSE_DWELL: Duration = Duration::from_millis(10);

/// Controller output line owned by trigger element 0.
pub const SYNC_LINE: &str = "E0";

/// Default auxiliary outputs used when the trigger element is not line 0.
pub const DEFAULT_AXIS_INFOS: &str = "InfoA";

/// Configuration register holding the target-encoder selection.
pub const TGTENC_KEY: &str = "TGTENC";

/// Value of [`TGTENC_KEY`] meaning "no target encoder, use esync".
pub const TGTENC_NONE: &str = "NONE";

/// Configured source name that defers the choice to [`TGTENC_KEY`].
pub const TGTENC_ALIAS: &str = "TGTENC";

/// Canonical service name (used for logging).
pub const SERVICE_NAME: &str = "ecam_trigger";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ecam/trigger.toml";

static_assertions::const_assert!(MAX_TABLE_SIZE > 1);
static_assertions::const_assert!(MAX_TABLE_SIZE <= u32::MAX as usize);
