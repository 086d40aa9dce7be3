//! Trigger table builder.
//!
//! Turns a [`SynchronizationSpec`] into the table the controller compares
//! against. Time-driven specs produce a [`TriggerTable::Pulse`] marker;
//! position-driven specs produce `repeat_count` evenly spaced positions in
//! the resolved feedback source's units.

use crate::convert::UnitConverter;
use crate::error::SyncError;
use ecam_common::consts::MAX_TABLE_SIZE;
use ecam_common::link::types::SourceKind;
use tracing::debug;

/// What the trigger is synchronized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// One pulse emitted by direct output toggling at start.
    Time,
    /// Pulses emitted by the position comparator.
    Position,
}

/// One synchronization request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynchronizationSpec {
    /// Synchronization domain.
    pub mode: SyncMode,
    /// First trigger position (user units). Ignored in time mode.
    pub start_position: f64,
    /// Signed distance between triggers (user units). Ignored in time mode.
    pub step_position: f64,
    /// Number of triggers.
    pub repeat_count: u32,
}

impl SynchronizationSpec {
    /// Single time-driven pulse.
    pub const fn time() -> Self {
        Self {
            mode: SyncMode::Time,
            start_position: 0.0,
            step_position: 0.0,
            repeat_count: 1,
        }
    }

    /// Position-driven triggers.
    pub const fn position(start_position: f64, step_position: f64, repeat_count: u32) -> Self {
        Self {
            mode: SyncMode::Position,
            start_position,
            step_position,
            repeat_count,
        }
    }

    /// Check the request without touching hardware.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.repeat_count == 0 {
            return Err(SyncError::InvalidSpec(
                "repeat count must be at least 1".to_string(),
            ));
        }
        match self.mode {
            SyncMode::Time if self.repeat_count > 1 => {
                Err(SyncError::UnsupportedMultiplePulses(self.repeat_count))
            }
            SyncMode::Time => Ok(()),
            SyncMode::Position => {
                if !self.start_position.is_finite() || !self.step_position.is_finite() {
                    return Err(SyncError::InvalidSpec(format!(
                        "positions must be finite (start {}, step {})",
                        self.start_position, self.step_position
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Per-axis data the builder needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisContext {
    /// Controller axis.
    pub axis: u16,
    /// Motor steps per user unit, cached at bind time.
    pub step_per_unit: f64,
    /// Converter into the resolved feedback source.
    pub converter: UnitConverter,
    /// Pulses come from esync rather than the table.
    pub is_target_encoder: bool,
}

impl AxisContext {
    /// Source the table is expressed in.
    pub const fn source(&self) -> SourceKind {
        self.converter.target().kind
    }
}

/// Built table.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerTable {
    /// Time-driven: one pulse by output toggling, no positions.
    Pulse,
    /// Position-driven: positions in feedback-source units, monotonic.
    Positions(Vec<f64>),
}

impl TriggerTable {
    /// Positions, empty for a pulse.
    pub fn positions(&self) -> &[f64] {
        match self {
            Self::Pulse => &[],
            Self::Positions(values) => values,
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions().len()
    }

    /// True for a pulse table.
    pub fn is_empty(&self) -> bool {
        self.positions().is_empty()
    }

    /// Positions in increasing order, as the controller requires them.
    pub fn ascending(&self) -> Vec<f64> {
        let mut values = self.positions().to_vec();
        if values.first() > values.last() {
            values.reverse();
        }
        values
    }
}

/// `points` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let div = (points - 1) as f64;
            let step = (stop - start) / div;
            let mut values: Vec<f64> = (0..points).map(|i| start + i as f64 * step).collect();
            values[points - 1] = stop;
            values
        }
    }
}

/// Check that `values` is strictly monotonic in the direction of `sign`.
///
/// Returns the first index that breaks the order.
pub fn check_monotonic(values: &[f64], sign: f64) -> Result<(), SyncError> {
    let increasing = sign >= 0.0;
    match values.windows(2).position(|w| {
        if increasing {
            w[1] <= w[0]
        } else {
            w[1] >= w[0]
        }
    }) {
        Some(i) => Err(SyncError::NonMonotonicTable { index: i + 1 }),
        None => Ok(()),
    }
}

/// Build the trigger table for `spec` on `axis`.
pub fn build(
    spec: &SynchronizationSpec,
    axis: &AxisContext,
    start_trigger_only: bool,
) -> Result<TriggerTable, SyncError> {
    spec.validate()?;
    if spec.mode == SyncMode::Time {
        return Ok(TriggerTable::Pulse);
    }

    let repeats = spec.repeat_count;
    let start_steps = spec.start_position * axis.step_per_unit;
    let delta_steps = spec.step_position * axis.step_per_unit;
    let end_steps = start_steps + delta_steps * f64::from(repeats);

    let start = axis.converter.convert(start_steps);
    let delta = axis.converter.convert(delta_steps);
    let end = axis.converter.convert(end_steps);
    if !start.is_finite() || !delta.is_finite() || !end.is_finite() {
        return Err(SyncError::InvalidSpec(format!(
            "positions overflow after conversion (start {start}, delta {delta})"
        )));
    }

    debug!(
        "Trigger table on axis {}: start {} end {} points {} delta {} ({})",
        axis.axis,
        start,
        end,
        repeats,
        delta,
        axis.source()
    );

    if start_trigger_only {
        debug!("Start trigger only flag is active");
        return Ok(TriggerTable::Positions(vec![start]));
    }
    if repeats as usize > MAX_TABLE_SIZE {
        return Err(SyncError::TableTooLarge {
            points: repeats,
            max: MAX_TABLE_SIZE,
        });
    }
    if repeats == 1 {
        return Ok(TriggerTable::Positions(vec![start]));
    }
    if delta == 0.0 {
        return Err(SyncError::DegenerateTable { points: repeats });
    }

    let values = linspace(start, end - delta, repeats as usize);
    check_monotonic(&values, delta)?;
    Ok(TriggerTable::Positions(values))
}
