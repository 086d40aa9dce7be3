//! `ControllerLink` implementation over the simulated controller.

use super::config::SimulationConfig;
use super::controller::{CallCounters, SimAxis, SimController};
use ecam_common::link::driver::{ControllerLink, LinkError};
use ecam_common::link::types::{
    HwState, MuxLink, OutputLevel, OutputPolarity, OutputTarget, SourceKind,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock(inner: &Mutex<SimController>) -> MutexGuard<'_, SimController> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulation link. Cheap to clone handles share the same controller.
pub struct SimulatedLink {
    inner: Arc<Mutex<SimController>>,
}

impl SimulatedLink {
    /// Create a simulated controller from configuration.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimController::new(config))),
        }
    }

    /// Handle for inspecting and steering the simulated controller after
    /// the link has been boxed.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl ControllerLink for SimulatedLink {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn find_axes(&mut self) -> Result<Vec<u16>, LinkError> {
        Ok(lock(&self.inner).find_axes())
    }

    fn read_state(&mut self, axis: u16) -> Result<HwState, LinkError> {
        lock(&self.inner).read_state(axis)
    }

    fn read_config(&mut self, axis: u16, key: &str) -> Result<String, LinkError> {
        lock(&self.inner).read_config(axis, key)
    }

    fn write_output(
        &mut self,
        axis: u16,
        target: &OutputTarget,
        level: OutputLevel,
        polarity: OutputPolarity,
    ) -> Result<(), LinkError> {
        lock(&self.inner).write_output(axis, target, level, polarity)
    }

    fn load_table(
        &mut self,
        axis: u16,
        values: &[f64],
        source: SourceKind,
    ) -> Result<(), LinkError> {
        lock(&self.inner).load_table(axis, values, source)
    }

    fn add_link(
        &mut self,
        axis: u16,
        line: &str,
        pos: bool,
        aux: bool,
        hard: bool,
    ) -> Result<(), LinkError> {
        lock(&self.inner).add_link(axis, line, pos, aux, hard)
    }

    fn clear_link(&mut self, line: &str) -> Result<(), LinkError> {
        lock(&self.inner).clear_link(line);
        Ok(())
    }

    fn list_links(&mut self) -> Result<Vec<MuxLink>, LinkError> {
        Ok(lock(&self.inner).list_links())
    }

    fn sync_now(&mut self, axis: u16) -> Result<(), LinkError> {
        lock(&self.inner).sync_now(axis)
    }
}

/// Shared handle on a simulated controller.
#[derive(Clone)]
pub struct SimHandle {
    inner: Arc<Mutex<SimController>>,
}

impl SimHandle {
    /// Run `f` with exclusive access to the controller.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimController) -> R) -> R {
        f(&mut lock(&self.inner))
    }

    /// Calls received so far.
    pub fn calls(&self) -> CallCounters {
        self.with(|c| c.calls)
    }

    /// Snapshot of one axis.
    pub fn axis(&self, axis: u16) -> Option<SimAxis> {
        self.with(|c| c.axis(axis).cloned())
    }

    /// Current multiplexer routes.
    pub fn links(&self) -> Vec<MuxLink> {
        self.with(|c| c.links().to_vec())
    }

    /// Set a configuration register.
    pub fn set_register(&self, axis: u16, key: &str, value: &str) {
        self.with(|c| {
            if let Some(sim) = c.axis_mut(axis) {
                sim.registers.insert(key.to_ascii_uppercase(), value.to_string());
            }
        });
    }

    /// Replace the status word of an axis.
    pub fn set_state(&self, axis: u16, state: HwState) {
        self.with(|c| {
            if let Some(sim) = c.axis_mut(axis) {
                sim.state = state;
            }
        });
    }

    /// Make the next `n` status reads time out.
    pub fn fail_state_reads(&self, n: u32) {
        self.with(|c| c.fail_state_reads = n);
    }

    /// Make the next `n` table loads time out.
    pub fn fail_table_loads(&self, n: u32) {
        self.with(|c| c.fail_table_loads = n);
    }

    /// Make the next `n` configuration reads time out.
    pub fn fail_config_reads(&self, n: u32) {
        self.with(|c| c.fail_config_reads = n);
    }

    /// Make the next `n` output writes time out.
    pub fn fail_output_writes(&self, n: u32) {
        self.with(|c| c.fail_output_writes = n);
    }
}
