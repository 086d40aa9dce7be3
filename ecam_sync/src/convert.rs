//! Unit converter.
//!
//! Positions in motor steps are rescaled into the units of the feedback
//! source compared by the ecam hardware. Resolutions come from per-source
//! configuration registers (`steps_per_turn`, `turns`); the ratio and the
//! result are floating point and no rounding is done here.

use crate::error::SyncError;
use ecam_common::link::driver::ControllerLink;
use ecam_common::link::types::SourceKind;

/// Resolution pair of one feedback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Encoder steps per turn.
    pub steps_per_turn: i64,
    /// Turns.
    pub turns: i64,
}

impl Resolution {
    /// Create a resolution pair.
    pub const fn new(steps_per_turn: i64, turns: i64) -> Self {
        Self {
            steps_per_turn,
            turns,
        }
    }

    /// Steps per turn divided by turns.
    pub fn per_turn(&self) -> f64 {
        self.steps_per_turn as f64 / self.turns as f64
    }
}

/// A feedback source together with its resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackSource {
    /// Which channel.
    pub kind: SourceKind,
    /// Its resolution.
    pub resolution: Resolution,
}

/// Converts motor-step positions into a target feedback source's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    axis: Resolution,
    target: FeedbackSource,
}

impl UnitConverter {
    /// Converter from raw axis counts with resolution `axis` into `target`.
    pub const fn new(axis: Resolution, target: FeedbackSource) -> Self {
        Self { axis, target }
    }

    /// Converter whose target is the axis itself.
    pub const fn identity(axis: Resolution) -> Self {
        Self {
            axis,
            target: FeedbackSource {
                kind: SourceKind::Axis,
                resolution: axis,
            },
        }
    }

    /// Target source.
    pub const fn target(&self) -> FeedbackSource {
        self.target
    }

    /// Scale factor applied by [`convert`](Self::convert).
    pub fn ratio(&self) -> f64 {
        match self.target.kind {
            SourceKind::Axis => 1.0,
            _ => self.target.resolution.per_turn() / self.axis.per_turn(),
        }
    }

    /// Convert a position (or a difference of positions).
    pub fn convert(&self, value: f64) -> f64 {
        match self.target.kind {
            SourceKind::Axis => value,
            _ => value * self.ratio(),
        }
    }
}

fn read_register(
    link: &mut dyn ControllerLink,
    axis: u16,
    key: &str,
) -> Result<i64, SyncError> {
    let raw = link
        .read_config(axis, key)
        .map_err(|e| SyncError::ConfigUnavailable {
            axis,
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::ConfigUnavailable {
            axis,
            key: key.to_string(),
            reason: format!("not an integer: {raw:?}"),
        })?;
    if value == 0 {
        return Err(SyncError::ConfigUnavailable {
            axis,
            key: key.to_string(),
            reason: "register is zero".to_string(),
        });
    }
    Ok(value)
}

/// Read the resolution registers of `kind` on `axis`.
///
/// Registers are read once, without retry; any failure is
/// [`SyncError::ConfigUnavailable`].
pub fn read_resolution(
    link: &mut dyn ControllerLink,
    axis: u16,
    kind: SourceKind,
) -> Result<Resolution, SyncError> {
    let (steps_key, turns_key) = kind.resolution_keys();
    let steps_per_turn = read_register(link, axis, steps_key)?;
    let turns = read_register(link, axis, turns_key)?;
    Ok(Resolution::new(steps_per_turn, turns))
}

/// Build the converter for `kind` on `axis`, reading only the registers
/// needed: none when `kind` is the axis itself.
pub fn converter_for(
    link: &mut dyn ControllerLink,
    axis: u16,
    kind: SourceKind,
) -> Result<UnitConverter, SyncError> {
    if kind == SourceKind::Axis {
        return Ok(UnitConverter::identity(Resolution::new(1, 1)));
    }
    let target = read_resolution(link, axis, kind)?;
    let native = read_resolution(link, axis, SourceKind::Axis)?;
    Ok(UnitConverter::new(
        native,
        FeedbackSource {
            kind,
            resolution: target,
        },
    ))
}
