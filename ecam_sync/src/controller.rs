//! Trigger/gate controller.
//!
//! `TriggerController` owns one trigger element: the link to the motion
//! controller, the motor directory, the bound motor and the lifecycle
//! state machine. Every operation is synchronous and takes `&mut self`;
//! a multi-threaded host wraps the controller in a `Mutex`.
//!
//! ## Output routing
//!
//! Element 0 drives the dedicated sync output (`SYNCAUX`) and owns the
//! multiplexer link from the bound axis to line `E0`. Any other element
//! drives every configured auxiliary output and never touches the
//! multiplexer.

use crate::convert;
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::source::SourceSelector;
use crate::state::machine::{SyncEvent, SyncState, SyncStateMachine, TransitionResult};
use crate::state::status::{StatusReport, TriggerStatus};
use crate::table::{self, AxisContext, SyncMode, SynchronizationSpec, TriggerTable};
use ecam_common::config::{ControllerConfig, TriggerConfig};
use ecam_common::consts::{PULSE_DWELL, SYNC_LINE};
use ecam_common::link::driver::{ControllerLink, LinkError};
use ecam_common::link::types::{OutputLevel, OutputPolarity, OutputTarget, SourceKind};
use ecam_common::motor::{MotorDirectory, StaticMotorDirectory};
use ecam_link::LinkRegistry;
use std::thread;
use tracing::{debug, error, info, warn};

/// Axis parameter publishing the `{alias: axis}` map.
pub const PARAM_MOVEABLE_ON_INPUT: &str = "MoveableOnInput";

/// Axis parameter binding a motor.
pub const PARAM_ACTIVE_INPUT: &str = "active_input";

/// Motor currently bound to the trigger element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundMotor {
    /// Controller axis (also the logical motor id).
    pub axis: u16,
    /// Motor steps per user unit, read once at bind time.
    pub step_per_unit: f64,
}

/// One trigger element.
pub struct TriggerController {
    link: Box<dyn ControllerLink>,
    motors: Box<dyn MotorDirectory>,
    controller_alias: String,
    element: u16,
    axis_infos: Vec<String>,
    selector: SourceSelector,
    retry: RetryPolicy,
    machine: SyncStateMachine,
    start_trigger_only: bool,
    bound: Option<BoundMotor>,
    mode: Option<SyncMode>,
    target_encoder: bool,
    table: Option<TriggerTable>,
    last_error: Option<String>,
    motion_seen: bool,
    moveable_on_input: Option<String>,
}

impl TriggerController {
    /// Create a controller over an open link.
    pub fn new(
        link: Box<dyn ControllerLink>,
        motors: Box<dyn MotorDirectory>,
        trigger: &TriggerConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            link,
            motors,
            controller_alias: trigger.controller_alias.clone(),
            element: trigger.element,
            axis_infos: trigger.axis_info_list(),
            selector: SourceSelector::new(trigger.source_map()),
            retry,
            machine: SyncStateMachine::new(),
            start_trigger_only: trigger.start_trigger_only,
            bound: None,
            mode: None,
            target_encoder: false,
            table: None,
            last_error: None,
            motion_seen: false,
            moveable_on_input: None,
        }
    }

    /// Open the configured link and build a controller with a static motor
    /// directory from `[[motors]]`.
    pub fn from_config(
        config: &ControllerConfig,
        registry: &LinkRegistry,
    ) -> Result<Self, SyncError> {
        let link = registry.create(&config.link)?;
        let motors = StaticMotorDirectory::from_entries(&config.motors);
        info!(
            "Trigger element {} of controller '{}' on {} ({} motors, {} retries)",
            config.trigger.element,
            config.trigger.controller_alias,
            link.name(),
            motors.len(),
            RetryPolicy::from_timeout(config.link.timeout).attempts()
        );
        Ok(Self::new(
            link,
            Box::new(motors),
            &config.trigger,
            RetryPolicy::from_timeout(config.link.timeout),
        ))
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Lifecycle state.
    pub const fn state(&self) -> SyncState {
        self.machine.state()
    }

    /// Alias of the motion controller owning the trigger motors.
    pub fn controller_alias(&self) -> &str {
        &self.controller_alias
    }

    /// Trigger element index.
    pub const fn element(&self) -> u16 {
        self.element
    }

    /// Bound motor, if any.
    pub const fn bound_motor(&self) -> Option<BoundMotor> {
        self.bound
    }

    /// Last configured table.
    pub fn table(&self) -> Option<&TriggerTable> {
        self.table.as_ref()
    }

    /// Pulses of the current configuration come from esync.
    pub const fn is_target_encoder(&self) -> bool {
        self.target_encoder
    }

    /// Retry budget for table loads and status reads.
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// `StartTriggerOnly` attribute.
    pub const fn start_trigger_only(&self) -> bool {
        self.start_trigger_only
    }

    /// Set the `StartTriggerOnly` attribute. Applies to the next configure.
    pub fn set_start_trigger_only(&mut self, value: bool) {
        debug!("StartTriggerOnly <- {}", value);
        self.start_trigger_only = value;
    }

    // ─── Binding ────────────────────────────────────────────────────

    /// Bind the logical motor `motor`.
    ///
    /// Rebinding the motor already bound is a no-op: neither
    /// `step_per_unit` nor the multiplexer is touched. Binding another motor
    /// drops the current configuration and returns the element to `Idle`.
    /// If the sync line was already unrouted when the new route fails, the
    /// element is left unbound.
    pub fn bind_motor(&mut self, motor: u16) -> Result<(), SyncError> {
        if self.bound.is_some_and(|b| b.axis == motor) {
            debug!("Motor {} already bound", motor);
            return Ok(());
        }

        // Cached for the lifetime of the binding.
        let step_per_unit = self.motors.step_per_unit(motor)?;
        if self.element == 0 {
            self.relink(motor)?;
        }

        self.unbind();
        self.selector.invalidate(motor);
        self.bound = Some(BoundMotor {
            axis: motor,
            step_per_unit,
        });
        info!(
            "Bound motor {} (step_per_unit {}) to trigger element {}",
            motor, step_per_unit, self.element
        );
        Ok(())
    }

    /// Release the bound motor and forget its configuration.
    fn unbind(&mut self) {
        let Some(previous) = self.bound else {
            return;
        };
        if self.state() != SyncState::Idle {
            self.abort();
        }
        self.selector.invalidate(previous.axis);
        self.bound = None;
        self.mode = None;
        self.table = None;
        self.target_encoder = false;
        debug!("Motor {} unbound from trigger element {}", previous.axis, self.element);
    }

    /// Route `axis` to the sync line, replacing any existing route.
    fn relink(&mut self, axis: u16) -> Result<(), SyncError> {
        let links = self.link.list_links()?;
        if links.iter().any(|l| l.drives(SYNC_LINE)) {
            self.link.clear_link(SYNC_LINE)?;
            // The previous motor no longer drives the sync line.
            self.unbind();
        }
        self.link.add_link(axis, SYNC_LINE, false, true, true)?;

        let links = self.link.list_links()?;
        debug!(
            "PMUX = [{}]",
            links
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        );
        Ok(())
    }

    // ─── Synchronization ────────────────────────────────────────────

    /// Configure one synchronization.
    ///
    /// Request validation errors are returned before any hardware I/O and leave
    /// the state unchanged. Any later failure moves the element to `Fault`.
    pub fn configure(&mut self, spec: &SynchronizationSpec) -> Result<TriggerTable, SyncError> {
        spec.validate()?;
        self.transition(SyncEvent::Configure)?;

        match self.configure_inner(spec) {
            Ok(table) => {
                self.mode = Some(spec.mode);
                self.table = Some(table.clone());
                self.last_error = None;
                self.transition(SyncEvent::ConfigureDone)?;
                info!(
                    "Trigger element {} armed: {:?} mode, {} positions",
                    self.element,
                    spec.mode,
                    table.len()
                );
                Ok(table)
            }
            Err(e) => {
                if e.is_validation() {
                    warn!("Rejected table for trigger element {}: {}", self.element, e);
                } else {
                    error!("Configuration of trigger element {} failed: {}", self.element, e);
                }
                self.mode = None;
                self.table = None;
                self.last_error = Some(e.to_string());
                self.transition(SyncEvent::ConfigureFailed)?;
                Err(e)
            }
        }
    }

    fn configure_inner(&mut self, spec: &SynchronizationSpec) -> Result<TriggerTable, SyncError> {
        let motor = self.bound.ok_or(SyncError::NoMotorBound)?;
        if spec.mode == SyncMode::Time {
            self.target_encoder = false;
            return Ok(TriggerTable::Pulse);
        }

        let (kind, target_encoder) = self.selector.resolve(self.link.as_mut(), motor.axis)?;
        let converter = convert::converter_for(self.link.as_mut(), motor.axis, kind)?;
        let ctx = AxisContext {
            axis: motor.axis,
            step_per_unit: motor.step_per_unit,
            converter,
            is_target_encoder: target_encoder,
        };
        let table = table::build(spec, &ctx, self.start_trigger_only)?;
        self.load(motor.axis, &table, kind)?;
        self.target_encoder = target_encoder;
        Ok(table)
    }

    fn load(&mut self, axis: u16, table: &TriggerTable, source: SourceKind) -> Result<(), SyncError> {
        let values = table.ascending();
        let retry = self.retry;
        let link = &mut self.link;
        retry
            .run("Send trigger table", |_| link.load_table(axis, &values, source))
            .map_err(|e| SyncError::TableLoadFailed {
                attempts: e.attempts,
                last: e.last,
            })?;
        debug!("Loaded {} positions on axis {} ({})", values.len(), axis, source);
        Ok(())
    }

    /// Put the output in its waiting level: LOW for time mode, the ecam
    /// marker for position mode.
    pub fn pre_arm(&mut self) -> Result<(), SyncError> {
        if !self.machine.is_armed() {
            return Err(SyncError::InvalidTransition(
                "Pre-arm requires a configured (Armed) trigger",
            ));
        }
        let motor = self.bound.ok_or(SyncError::NoMotorBound)?;
        let level = match self.mode {
            Some(SyncMode::Time) | None => OutputLevel::Low,
            Some(SyncMode::Position) => OutputLevel::Ecam,
        };
        self.set_output(motor.axis, level)?;
        Ok(())
    }

    /// Start triggering.
    ///
    /// Time mode emits one pulse and blocks for [`PULSE_DWELL`]. Position
    /// mode sends esync when the target encoder drives the pulses; the
    /// loaded table does the rest.
    pub fn start(&mut self) -> Result<(), SyncError> {
        let motor = self.bound.ok_or(SyncError::NoMotorBound)?;
        self.transition(SyncEvent::Start)?;
        self.motion_seen = false;

        let result = match self.mode {
            Some(SyncMode::Position) => {
                if self.target_encoder {
                    info!("Send ESYNC to axis {}", motor.axis);
                    self.link.sync_now(motor.axis).map_err(SyncError::from)
                } else {
                    Ok(())
                }
            }
            Some(SyncMode::Time) | None => self.pulse(motor.axis),
        };

        match result {
            Ok(()) => {
                if self.mode != Some(SyncMode::Position) {
                    self.transition(SyncEvent::TriggerComplete)?;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Start of trigger element {} failed: {}", self.element, e);
                self.abort();
                Err(e)
            }
        }
    }

    fn pulse(&mut self, axis: u16) -> Result<(), SyncError> {
        self.set_output(axis, OutputLevel::High)?;
        thread::sleep(PULSE_DWELL);
        self.set_output(axis, OutputLevel::Low)?;
        Ok(())
    }

    /// Force the output inactive and return to `Idle`. Never fails.
    pub fn abort(&mut self) {
        debug!("Abort trigger element {}", self.element);
        if let Some(motor) = self.bound {
            if let Err(e) = self.set_output(motor.axis, OutputLevel::Low) {
                warn!("Abort output write failed on axis {}: {}", motor.axis, e);
            }
        }
        self.motion_seen = false;
        // Abort is accepted from every state.
        let _ = self.machine.handle_event(SyncEvent::Abort);
    }

    /// Poll the hardware and classify.
    ///
    /// An unreadable state after the whole retry budget is `Alarm`. While
    /// triggering, the first idle poll after motion completes the cycle.
    pub fn status(&mut self) -> StatusReport {
        if self.state() == SyncState::Fault {
            return StatusReport::fault(self.last_error.as_deref().unwrap_or("unknown error"));
        }
        let Some(motor) = self.bound else {
            return StatusReport::unbound();
        };

        let retry = self.retry;
        let link = &mut self.link;
        let hw = match retry.run("State reading", |_| link.read_state(motor.axis)) {
            Ok(hw) => Some(hw),
            Err(e) => {
                error!(
                    "State of axis {} unreadable after {} attempts: {}",
                    motor.axis, e.attempts, e.last
                );
                None
            }
        };
        let report = StatusReport::from_hw(hw);

        if self.state() == SyncState::Triggering {
            match report.state {
                TriggerStatus::Moving => self.motion_seen = true,
                TriggerStatus::On if self.motion_seen => {
                    debug!("Axis {} stopped, trigger cycle complete", motor.axis);
                    self.motion_seen = false;
                    let _ = self.machine.handle_event(SyncEvent::TriggerComplete);
                }
                _ => {}
            }
        }
        report
    }

    // ─── Axis parameters ────────────────────────────────────────────

    /// Build the `{alias: axis}` JSON of every controller axis known to the
    /// motor directory.
    pub fn refresh_moveable_on_input(&mut self) -> Result<String, SyncError> {
        let mut map = serde_json::Map::new();
        for axis in self.link.find_axes()? {
            match self.motors.alias(axis) {
                Some(alias) => {
                    map.insert(alias, serde_json::Value::from(axis));
                }
                None => debug!("Axis {} has no motor alias, skipped", axis),
            }
        }
        let json = serde_json::Value::Object(map).to_string();
        self.moveable_on_input = Some(json.clone());
        Ok(json)
    }

    /// Read an axis parameter.
    pub fn axis_parameter(&mut self, name: &str) -> Result<String, SyncError> {
        if self.element == 0 && name.eq_ignore_ascii_case(PARAM_MOVEABLE_ON_INPUT) {
            return match &self.moveable_on_input {
                Some(json) => Ok(json.clone()),
                None => self.refresh_moveable_on_input(),
            };
        }
        Err(SyncError::UnsupportedParameter {
            name: name.to_string(),
            element: self.element,
        })
    }

    /// Write an axis parameter. `active_input` binds a motor.
    pub fn set_axis_parameter(&mut self, name: &str, value: &str) -> Result<(), SyncError> {
        if !name.eq_ignore_ascii_case(PARAM_ACTIVE_INPUT) {
            return Err(SyncError::UnsupportedParameter {
                name: name.to_string(),
                element: self.element,
            });
        }
        let motor = value
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidParameterValue {
                name: name.to_string(),
                value: value.to_string(),
            })?;
        self.bind_motor(motor)
    }

    // ─── Helpers ────────────────────────────────────────────────────

    fn transition(&mut self, event: SyncEvent) -> Result<SyncState, SyncError> {
        match self.machine.handle_event(event) {
            TransitionResult::Ok(state) => Ok(state),
            TransitionResult::Rejected(reason) => Err(SyncError::InvalidTransition(reason)),
        }
    }

    /// Write `level` to every output of this element. All outputs are
    /// attempted; the first failure is returned.
    fn set_output(&mut self, axis: u16, level: OutputLevel) -> Result<(), LinkError> {
        if self.element == 0 {
            return self.link.write_output(
                axis,
                &OutputTarget::SyncAux,
                level,
                OutputPolarity::Normal,
            );
        }

        let mut first_error = None;
        for name in &self.axis_infos {
            let target = OutputTarget::Info(name.clone());
            if let Err(e) = self
                .link
                .write_output(axis, &target, level, OutputPolarity::Normal)
            {
                warn!("Write {} on axis {} failed: {}", target.command(), axis, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecam_common::motor::MotorEntry;
    use ecam_link::drivers::simulation::{SimHandle, SimulatedLink};
    use std::time::Instant;

    fn controller(element: u16) -> (TriggerController, SimHandle) {
        let link = SimulatedLink::default();
        let handle = link.handle();
        let motors = StaticMotorDirectory::from_entries(&[
            MotorEntry {
                axis: 1,
                alias: "m1".into(),
                step_per_unit: 100.0,
            },
            MotorEntry {
                axis: 2,
                alias: "m2".into(),
                step_per_unit: 50.0,
            },
        ]);
        let trigger = TriggerConfig {
            element,
            axis_infos: "InfoA, InfoB".into(),
            ..TriggerConfig::default()
        };
        let ctrl = TriggerController::new(
            Box::new(link),
            Box::new(motors),
            &trigger,
            RetryPolicy::with_attempts(3),
        );
        (ctrl, handle)
    }

    #[test]
    fn unbound_status_is_on() {
        let (mut ctrl, handle) = controller(0);
        let report = ctrl.status();
        assert_eq!(report.state, TriggerStatus::On);
        assert_eq!(report.message, "No synchronization in progress");
        assert_eq!(handle.calls().total(), 0);
    }

    #[test]
    fn configure_requires_motor() {
        let (mut ctrl, _) = controller(0);
        assert!(matches!(
            ctrl.configure(&SynchronizationSpec::time()),
            Err(SyncError::NoMotorBound)
        ));
        assert_eq!(ctrl.state(), SyncState::Fault);
        assert_eq!(ctrl.status().state, TriggerStatus::Alarm);
    }

    #[test]
    fn element_zero_relinks_multiplexer() {
        let (mut ctrl, handle) = controller(0);
        ctrl.bind_motor(1).unwrap();
        ctrl.bind_motor(2).unwrap();
        let links = handle.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, 2);
        assert!(links[0].aux && links[0].hard && !links[0].pos);
        assert_eq!(handle.calls().clear_link, 1);
    }

    #[test]
    fn other_elements_use_info_outputs() {
        let (mut ctrl, handle) = controller(1);
        ctrl.bind_motor(1).unwrap();
        assert!(handle.links().is_empty());

        ctrl.configure(&SynchronizationSpec::position(0.0, 1.0, 4)).unwrap();
        ctrl.pre_arm().unwrap();
        let axis = handle.axis(1).unwrap();
        assert_eq!(axis.infos["INFOA"], OutputLevel::Ecam);
        assert_eq!(axis.infos["INFOB"], OutputLevel::Ecam);
        assert_eq!(axis.sync_aux, OutputLevel::Low);
    }

    #[test]
    fn unknown_motor_is_reported() {
        let (mut ctrl, handle) = controller(0);
        assert!(matches!(ctrl.bind_motor(9), Err(SyncError::Motor(_))));
        assert!(ctrl.bound_motor().is_none());
        assert_eq!(handle.calls().total(), 0);
    }

    #[test]
    fn time_pulse_toggles_output() {
        let (mut ctrl, handle) = controller(0);
        ctrl.bind_motor(1).unwrap();
        assert_eq!(ctrl.configure(&SynchronizationSpec::time()).unwrap(), TriggerTable::Pulse);
        ctrl.pre_arm().unwrap();
        ctrl.start().unwrap();
        assert_eq!(ctrl.state(), SyncState::Idle);

        let levels: Vec<OutputLevel> = handle
            .axis(1)
            .unwrap()
            .output_history
            .into_iter()
            .map(|(_, level)| level)
            .collect();
        assert_eq!(levels, vec![OutputLevel::Low, OutputLevel::High, OutputLevel::Low]);
        assert_eq!(handle.calls().load_table, 0);
    }

    #[test]
    fn time_pulse_holds_high_for_dwell() {
        let (mut ctrl, _) = controller(0);
        ctrl.bind_motor(1).unwrap();
        ctrl.configure(&SynchronizationSpec::time()).unwrap();
        ctrl.pre_arm().unwrap();

        let started = Instant::now();
        ctrl.start().unwrap();
        assert!(started.elapsed() >= PULSE_DWELL);
    }

    #[test]
    fn abort_survives_write_failure() {
        let (mut ctrl, handle) = controller(0);
        ctrl.bind_motor(1).unwrap();
        ctrl.configure(&SynchronizationSpec::position(0.0, 1.0, 2)).unwrap();
        handle.fail_output_writes(1);
        ctrl.abort();
        assert_eq!(ctrl.state(), SyncState::Idle);
    }

    #[test]
    fn axis_parameters() {
        let (mut ctrl, _) = controller(0);
        let json = ctrl.axis_parameter("MoveableOnInput").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["m1"], 1);
        assert_eq!(parsed["m2"], 2);
        assert_eq!(parsed.as_object().unwrap().len(), 2);

        ctrl.set_axis_parameter("active_input", "2").unwrap();
        assert_eq!(ctrl.bound_motor().unwrap().axis, 2);
        assert!(matches!(
            ctrl.set_axis_parameter("active_input", "motor"),
            Err(SyncError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            ctrl.set_axis_parameter("velocity", "1"),
            Err(SyncError::UnsupportedParameter { .. })
        ));
        assert!(matches!(
            ctrl.axis_parameter("velocity"),
            Err(SyncError::UnsupportedParameter { .. })
        ));
    }
}
