//! Feedback source selection.
//!
//! Each axis may have a configured source name. `TGTENC` defers the choice
//! to the controller's own target-encoder register, read once per binding.
//! A register value of `NONE` means pulses come from esync at start time and
//! the table (if any) is expressed in axis counts.

use crate::error::SyncError;
use ecam_common::consts::{TGTENC_ALIAS, TGTENC_KEY, TGTENC_NONE};
use ecam_common::link::driver::ControllerLink;
use ecam_common::link::types::SourceKind;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-axis selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSelection {
    /// Not resolved since the last binding.
    #[default]
    Unresolved,
    /// Resolved source.
    Resolved {
        /// Source compared by the ecam hardware.
        kind: SourceKind,
        /// Pulses are emitted by esync at start.
        target_encoder: bool,
    },
}

/// Resolves and caches the feedback source of each axis.
#[derive(Debug, Clone, Default)]
pub struct SourceSelector {
    configured: HashMap<u16, String>,
    cache: HashMap<u16, SourceSelection>,
}

impl SourceSelector {
    /// Selector over a configured `axis -> source name` map.
    pub fn new(configured: HashMap<u16, String>) -> Self {
        Self {
            configured,
            cache: HashMap::new(),
        }
    }

    /// Configured source name for `axis`, if any.
    pub fn configured(&self, axis: u16) -> Option<&str> {
        self.configured.get(&axis).map(String::as_str)
    }

    /// Current selection state of `axis`.
    pub fn selection(&self, axis: u16) -> SourceSelection {
        self.cache.get(&axis).copied().unwrap_or_default()
    }

    /// Forget the cached result for `axis`.
    pub fn invalidate(&mut self, axis: u16) {
        self.cache.remove(&axis);
    }

    /// Resolve the source of `axis`, reading the controller only on the
    /// first call after a binding. Returns `(kind, target_encoder)`.
    pub fn resolve(
        &mut self,
        link: &mut dyn ControllerLink,
        axis: u16,
    ) -> Result<(SourceKind, bool), SyncError> {
        if let SourceSelection::Resolved {
            kind,
            target_encoder,
        } = self.selection(axis)
        {
            return Ok((kind, target_encoder));
        }

        let (kind, target_encoder) = match self.configured(axis) {
            None => (SourceKind::Axis, false),
            Some(name) if name.trim().eq_ignore_ascii_case(TGTENC_ALIAS) => {
                let value = link.read_config(axis, TGTENC_KEY).map_err(|e| {
                    SyncError::ConfigUnavailable {
                        axis,
                        key: TGTENC_KEY.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if value.trim().eq_ignore_ascii_case(TGTENC_NONE) {
                    (SourceKind::Axis, true)
                } else {
                    (named_or_axis(axis, &value), false)
                }
            }
            Some(name) => (named_or_axis(axis, name), false),
        };

        debug!(
            "Axis {} feedback source {} (target encoder: {})",
            axis, kind, target_encoder
        );
        self.cache.insert(
            axis,
            SourceSelection::Resolved {
                kind,
                target_encoder,
            },
        );
        Ok((kind, target_encoder))
    }
}

fn named_or_axis(axis: u16, name: &str) -> SourceKind {
    SourceKind::from_name(name).unwrap_or_else(|| {
        warn!(
            "Ecam source {} not supported on axis {}, AXIS will be used",
            name, axis
        );
        SourceKind::Axis
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecam_link::drivers::simulation::SimulatedLink;

    fn selector(entries: &[(u16, &str)]) -> SourceSelector {
        SourceSelector::new(entries.iter().map(|(a, s)| (*a, s.to_string())).collect())
    }

    #[test]
    fn unconfigured_axis_uses_axis_counts() {
        let mut link = SimulatedLink::default();
        let handle = link.handle();
        let mut sel = selector(&[]);
        assert_eq!(sel.selection(1), SourceSelection::Unresolved);
        assert_eq!(sel.resolve(&mut link, 1).unwrap(), (SourceKind::Axis, false));
        assert_eq!(handle.calls().total(), 0);
    }

    #[test]
    fn named_sources_and_fallback() {
        let mut link = SimulatedLink::default();
        let mut sel = selector(&[(1, "encin"), (2, "AbsoluteEncoder"), (3, "bogus")]);
        assert_eq!(
            sel.resolve(&mut link, 1).unwrap(),
            (SourceKind::ExternalEncoder, false)
        );
        assert_eq!(
            sel.resolve(&mut link, 2).unwrap(),
            (SourceKind::AbsoluteEncoder, false)
        );
        assert_eq!(sel.resolve(&mut link, 3).unwrap(), (SourceKind::Axis, false));
    }

    #[test]
    fn tgtenc_none_selects_esync_and_is_cached() {
        let mut link = SimulatedLink::default();
        let handle = link.handle();
        handle.set_register(4, "TGTENC", "NONE");
        let mut sel = selector(&[(4, "TGTENC")]);

        assert_eq!(sel.resolve(&mut link, 4).unwrap(), (SourceKind::Axis, true));
        assert_eq!(sel.resolve(&mut link, 4).unwrap(), (SourceKind::Axis, true));
        assert_eq!(handle.calls().read_config, 1);

        handle.set_register(4, "TGTENC", "ENCIN");
        sel.invalidate(4);
        assert_eq!(
            sel.resolve(&mut link, 4).unwrap(),
            (SourceKind::ExternalEncoder, false)
        );
        assert_eq!(handle.calls().read_config, 2);
    }

    #[test]
    fn unreadable_tgtenc_is_config_unavailable() {
        let mut link = SimulatedLink::default();
        let handle = link.handle();
        handle.fail_config_reads(1);
        let mut sel = selector(&[(1, "TGTENC")]);
        assert!(matches!(
            sel.resolve(&mut link, 1),
            Err(SyncError::ConfigUnavailable { .. })
        ));
        assert_eq!(sel.selection(1), SourceSelection::Unresolved);
    }
}
