//! Synchronization lifecycle.
//!
//! Idle → Configuring → Armed → Triggering → Idle, with Fault reachable from
//! any state. Abort always lands in Idle.

/// Lifecycle state of one trigger element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing configured, or the last cycle completed.
    #[default]
    Idle,
    /// Building and loading a table.
    Configuring,
    /// Table loaded (or time mode recorded); waiting for start.
    Armed,
    /// Start issued; pulses in progress.
    Triggering,
    /// A configure call failed; reconfigure or abort to leave.
    Fault,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(SyncState),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

/// Event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A synchronization spec was received.
    Configure,
    /// Table loaded or time mode recorded.
    ConfigureDone,
    /// Configuration failed (validation, register read or table load).
    ConfigureFailed,
    /// Start requested.
    Start,
    /// Pulse emitted or the axis stopped after triggering.
    TriggerComplete,
    /// Abort requested.
    Abort,
}

/// Lifecycle holder.
#[derive(Debug, Clone, Default)]
pub struct SyncStateMachine {
    state: SyncState,
}

impl SyncStateMachine {
    /// New machine in Idle.
    pub const fn new() -> Self {
        Self {
            state: SyncState::Idle,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: SyncEvent) -> TransitionResult {
        use SyncEvent::*;
        use SyncState::*;

        let next = match (self.state, event) {
            (Idle | Armed | Fault, Configure) => Configuring,
            (Configuring, ConfigureDone) => Armed,
            (Configuring, ConfigureFailed) => Fault,
            (Armed, Start) => Triggering,
            (Triggering, TriggerComplete) => Idle,
            (_, Abort) => Idle,
            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.state, event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// True if start may be issued.
    #[inline]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, SyncState::Armed)
    }
}

fn invalid_transition_reason(state: SyncState, event: SyncEvent) -> &'static str {
    use SyncEvent::*;
    use SyncState::*;
    match (state, event) {
        (Triggering, Configure) => "Triggering: abort or wait for completion before configuring",
        (Configuring, _) => "Configuring: only ConfigureDone, ConfigureFailed or Abort allowed",
        (_, Start) => "Start requires a configured (Armed) trigger",
        (_, ConfigureDone | ConfigureFailed) => "No configuration in progress",
        (_, TriggerComplete) => "No trigger cycle in progress",
        _ => "Invalid event for current state",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
