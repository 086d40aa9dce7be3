//! Hardware types exchanged over the controller link.
//!
//! - `SourceKind` - Position feedback channel used by the ecam comparator
//! - `OutputLevel` / `OutputPolarity` / `OutputTarget` - Output line writes
//! - `HwState` - Axis status word flags
//! - `MuxLink` - One entry of the position multiplexer routing table

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical position-sensing channel compared against the ecam table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Raw axis (motor step) counts.
    Axis,
    /// External encoder input.
    ExternalEncoder,
    /// Absolute encoder.
    AbsoluteEncoder,
    /// In-position sensor.
    InPositionSensor,
}

impl SourceKind {
    /// All sources, axis first.
    pub const ALL: [SourceKind; 4] = [
        Self::Axis,
        Self::ExternalEncoder,
        Self::AbsoluteEncoder,
        Self::InPositionSensor,
    ];

    /// Controller mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Axis => "AXIS",
            Self::ExternalEncoder => "ENCIN",
            Self::AbsoluteEncoder => "ABSENC",
            Self::InPositionSensor => "INPOS",
        }
    }

    /// Configuration registers holding `(steps_per_turn, turns)` for this source.
    pub const fn resolution_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Axis => ("ANSTEP", "ANTURN"),
            Self::ExternalEncoder => ("EINNSTEP", "EINNTURN"),
            Self::AbsoluteEncoder => ("ABSNSTEP", "ABSNTURN"),
            Self::InPositionSensor => ("INPNSTEP", "INPNTURN"),
        }
    }

    /// Parse a mnemonic or a source name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|kind| {
            name.eq_ignore_ascii_case(kind.mnemonic())
                || name.eq_ignore_ascii_case(&format!("{kind:?}"))
        })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Level written to a trigger output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    /// Inactive.
    Low,
    /// Active.
    High,
    /// Driven by the ecam position comparator.
    Ecam,
}

impl OutputLevel {
    /// Controller mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Ecam => "ECAM",
        }
    }
}

/// Output polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolarity {
    /// Level as written.
    #[default]
    Normal,
    /// Level inverted by the controller.
    Inverted,
}

impl OutputPolarity {
    /// Controller mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Inverted => "INVERTED",
        }
    }
}

/// Output written by a trigger element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Dedicated synchronization output (routed to `E0` by the multiplexer).
    SyncAux,
    /// Named auxiliary output of the axis (`InfoA`, `InfoB`, ...).
    Info(String),
}

impl OutputTarget {
    /// Controller command name for this output.
    pub fn command(&self) -> String {
        match self {
            Self::SyncAux => "SYNCAUX".to_string(),
            Self::Info(name) => name.to_ascii_uppercase(),
        }
    }
}

bitflags! {
    /// Axis status word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HwState: u32 {
        /// Axis board present.
        const PRESENT       = 1 << 0;
        /// Axis board answering.
        const ALIVE         = 1 << 1;
        /// Ready to move.
        const READY         = 1 << 9;
        /// Motion in progress.
        const MOVING        = 1 << 10;
        /// Settling after motion.
        const SETTLING      = 1 << 11;
        /// Position out of closed-loop window.
        const OUT_OF_WINDOW = 1 << 12;
        /// Warning condition.
        const WARNING       = 1 << 13;
        /// Positive limit switch active.
        const LIMIT_POS     = 1 << 18;
        /// Negative limit switch active.
        const LIMIT_NEG     = 1 << 19;
        /// Home switch active.
        const HOME          = 1 << 20;
        /// Motor power on.
        const POWER_ON      = 1 << 23;
    }
}

impl HwState {
    /// Decode a raw status word, ignoring unknown bits.
    pub const fn from_status_word(word: u32) -> Self {
        Self::from_bits_truncate(word)
    }

    /// Motor power is on.
    #[inline]
    pub const fn is_poweron(&self) -> bool {
        self.contains(Self::POWER_ON)
    }

    /// Motion in progress.
    #[inline]
    pub const fn is_moving(&self) -> bool {
        self.contains(Self::MOVING)
    }

    /// Settling after motion.
    #[inline]
    pub const fn is_settling(&self) -> bool {
        self.contains(Self::SETTLING)
    }
}

impl Default for HwState {
    fn default() -> Self {
        Self::PRESENT | Self::ALIVE | Self::READY | Self::POWER_ON
    }
}

/// One position-multiplexer route: `source` axis → `dest` output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxLink {
    /// Source axis.
    pub source: u16,
    /// Destination line (e.g. `E0`).
    pub dest: String,
    /// Position signal routed.
    pub pos: bool,
    /// Auxiliary (sync) signal routed.
    pub aux: bool,
    /// Hard (non-overridable) link.
    pub hard: bool,
}

impl MuxLink {
    /// True if this link drives `line` (case-insensitive).
    pub fn drives(&self, line: &str) -> bool {
        self.dest.eq_ignore_ascii_case(line)
    }
}

impl fmt::Display for MuxLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.dest)?;
        if self.pos {
            f.write_str(" POS")?;
        }
        if self.aux {
            f.write_str(" AUX")?;
        }
        if self.hard {
            f.write_str(" HARD")?;
        }
        Ok(())
    }
}
