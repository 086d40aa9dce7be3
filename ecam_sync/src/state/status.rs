//! Status classification of the trigger element.

use ecam_common::link::types::HwState;
use std::fmt;

/// Reported state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStatus {
    /// Idle, no fault.
    On,
    /// Axis moving or settling.
    Moving,
    /// Power off, unreadable state, or failed configuration.
    Alarm,
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "On",
            Self::Moving => "Moving",
            Self::Alarm => "Alarm",
        })
    }
}

/// State plus a human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Classified state.
    pub state: TriggerStatus,
    /// Status message.
    pub message: String,
}

impl StatusReport {
    fn new(state: TriggerStatus, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    /// No motor bound.
    pub fn unbound() -> Self {
        Self::new(TriggerStatus::On, "No synchronization in progress")
    }

    /// Last configuration failed.
    pub fn fault(reason: &str) -> Self {
        Self::new(TriggerStatus::Alarm, format!("Synchronization failed: {reason}"))
    }

    /// Classify a status read; `None` means every attempt failed.
    pub fn from_hw(hw: Option<HwState>) -> Self {
        match hw {
            Some(hw) if hw.is_poweron() => {
                if hw.is_moving() || hw.is_settling() {
                    Self::new(TriggerStatus::Moving, "Moving")
                } else {
                    Self::new(TriggerStatus::On, "Motor is not generating triggers.")
                }
            }
            _ => Self::new(
                TriggerStatus::Alarm,
                "The motor is power off or not possible to read State",
            ),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.state, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(StatusReport::from_hw(None).state, TriggerStatus::Alarm);
        assert_eq!(
            StatusReport::from_hw(Some(HwState::PRESENT)).state,
            TriggerStatus::Alarm
        );
        assert_eq!(
            StatusReport::from_hw(Some(HwState::default())).state,
            TriggerStatus::On
        );
        assert_eq!(
            StatusReport::from_hw(Some(HwState::default() | HwState::MOVING)).state,
            TriggerStatus::Moving
        );
        assert_eq!(
            StatusReport::from_hw(Some(HwState::POWER_ON | HwState::SETTLING)).state,
            TriggerStatus::Moving
        );
    }

    #[test]
    fn fault_carries_reason() {
        let report = StatusReport::fault("table load");
        assert_eq!(report.state, TriggerStatus::Alarm);
        assert!(report.to_string().contains("table load"));
    }
}
