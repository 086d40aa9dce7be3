//! Simulated controller state.
//!
//! `SimController` holds everything a real controller would: per-axis
//! configuration registers, status words, output levels, the loaded ecam
//! table, and the position multiplexer routes. Fault injection counters make
//! upcoming calls time out.

use super::config::{SimAxisConfig, SimulationConfig};
use ecam_common::consts::{MAX_TABLE_SIZE, TGTENC_KEY};
use ecam_common::link::driver::LinkError;
use ecam_common::link::types::{
    HwState, MuxLink, OutputLevel, OutputPolarity, OutputTarget, SourceKind,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Number of calls received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    /// `find_axes`
    pub find_axes: u32,
    /// `read_state`
    pub read_state: u32,
    /// `read_config`
    pub read_config: u32,
    /// `write_output`
    pub write_output: u32,
    /// `load_table`
    pub load_table: u32,
    /// `add_link`
    pub add_link: u32,
    /// `clear_link`
    pub clear_link: u32,
    /// `list_links`
    pub list_links: u32,
    /// `sync_now`
    pub sync_now: u32,
}

impl CallCounters {
    /// Total number of calls that reached the controller.
    pub const fn total(&self) -> u32 {
        self.find_axes
            + self.read_state
            + self.read_config
            + self.write_output
            + self.load_table
            + self.add_link
            + self.clear_link
            + self.list_links
            + self.sync_now
    }
}

/// One simulated axis.
#[derive(Debug, Clone)]
pub struct SimAxis {
    /// Configuration registers.
    pub registers: HashMap<String, String>,
    /// Status word.
    pub state: HwState,
    /// Current level of the sync output.
    pub sync_aux: OutputLevel,
    /// Current level of each auxiliary output, keyed by upper-case name.
    pub infos: HashMap<String, OutputLevel>,
    /// Every output write, in order.
    pub output_history: Vec<(OutputTarget, OutputLevel)>,
    /// Loaded ecam table.
    pub ecam_table: Vec<f64>,
    /// Source of the loaded ecam table.
    pub ecam_source: Option<SourceKind>,
    /// Number of esync pulses emitted.
    pub esync_count: u32,
}

impl SimAxis {
    /// Axis with default registers: 1000 steps per turn on every source,
    /// one turn, no target encoder.
    pub fn new() -> Self {
        let mut registers = HashMap::new();
        for kind in SourceKind::ALL {
            let (steps, turns) = kind.resolution_keys();
            registers.insert(steps.to_string(), "1000".to_string());
            registers.insert(turns.to_string(), "1".to_string());
        }
        registers.insert(TGTENC_KEY.to_string(), "AXIS".to_string());

        Self {
            registers,
            state: HwState::default(),
            sync_aux: OutputLevel::Low,
            infos: HashMap::new(),
            output_history: Vec::new(),
            ecam_table: Vec::new(),
            ecam_source: None,
            esync_count: 0,
        }
    }

    fn from_config(config: &SimAxisConfig) -> Self {
        let mut axis = Self::new();
        for (key, value) in &config.registers {
            axis.registers.insert(key.to_ascii_uppercase(), value.clone());
        }
        axis.state.set(HwState::POWER_ON, config.power_on);
        axis
    }
}

impl Default for SimAxis {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated controller.
#[derive(Debug, Clone)]
pub struct SimController {
    axes: BTreeMap<u16, SimAxis>,
    links: Vec<MuxLink>,
    /// Upcoming status reads that time out.
    pub fail_state_reads: u32,
    /// Upcoming table loads that time out.
    pub fail_table_loads: u32,
    /// Upcoming configuration reads that time out.
    pub fail_config_reads: u32,
    /// Upcoming output writes that time out.
    pub fail_output_writes: u32,
    /// Calls received so far.
    pub calls: CallCounters,
}

impl SimController {
    /// Build from configuration.
    pub fn new(config: &SimulationConfig) -> Self {
        let axes = if config.axes.is_empty() {
            (1..=8).map(|id| (id, SimAxis::new())).collect()
        } else {
            config
                .axes
                .iter()
                .map(|a| (a.axis, SimAxis::from_config(a)))
                .collect()
        };

        Self {
            axes,
            links: Vec::new(),
            fail_state_reads: config.fail_state_reads,
            fail_table_loads: config.fail_table_loads,
            fail_config_reads: 0,
            fail_output_writes: 0,
            calls: CallCounters::default(),
        }
    }

    /// Axis by number.
    pub fn axis(&self, axis: u16) -> Option<&SimAxis> {
        self.axes.get(&axis)
    }

    /// Mutable axis by number.
    pub fn axis_mut(&mut self, axis: u16) -> Option<&mut SimAxis> {
        self.axes.get_mut(&axis)
    }

    /// Current multiplexer routes.
    pub fn links(&self) -> &[MuxLink] {
        &self.links
    }

    fn present(&mut self, axis: u16) -> Result<&mut SimAxis, LinkError> {
        self.axes
            .get_mut(&axis)
            .ok_or_else(|| LinkError::Protocol(format!("axis {axis} not present")))
    }

    fn take_fault(counter: &mut u32, what: &str) -> Result<(), LinkError> {
        if *counter > 0 {
            *counter -= 1;
            debug!("Injected timeout on {}", what);
            return Err(LinkError::Timeout(format!("simulated timeout on {what}")));
        }
        Ok(())
    }

    pub(super) fn find_axes(&mut self) -> Vec<u16> {
        self.calls.find_axes += 1;
        self.axes.keys().copied().collect()
    }

    pub(super) fn read_state(&mut self, axis: u16) -> Result<HwState, LinkError> {
        self.calls.read_state += 1;
        Self::take_fault(&mut self.fail_state_reads, "status read")?;
        Ok(self.present(axis)?.state)
    }

    pub(super) fn read_config(&mut self, axis: u16, key: &str) -> Result<String, LinkError> {
        self.calls.read_config += 1;
        Self::take_fault(&mut self.fail_config_reads, "config read")?;
        let key = key.to_ascii_uppercase();
        self.present(axis)?
            .registers
            .get(&key)
            .cloned()
            .ok_or_else(|| LinkError::Protocol(format!("unknown config key {key}")))
    }

    pub(super) fn write_output(
        &mut self,
        axis: u16,
        target: &OutputTarget,
        level: OutputLevel,
        _polarity: OutputPolarity,
    ) -> Result<(), LinkError> {
        self.calls.write_output += 1;
        Self::take_fault(&mut self.fail_output_writes, "output write")?;
        let sim = self.present(axis)?;
        match target {
            OutputTarget::SyncAux => sim.sync_aux = level,
            OutputTarget::Info(name) => {
                sim.infos.insert(name.to_ascii_uppercase(), level);
            }
        }
        sim.output_history.push((target.clone(), level));
        trace!("axis {} {} <- {}", axis, target.command(), level.mnemonic());
        Ok(())
    }

    pub(super) fn load_table(
        &mut self,
        axis: u16,
        values: &[f64],
        source: SourceKind,
    ) -> Result<(), LinkError> {
        self.calls.load_table += 1;
        Self::take_fault(&mut self.fail_table_loads, "table load")?;
        if values.is_empty() || values.len() > MAX_TABLE_SIZE {
            return Err(LinkError::Protocol(format!(
                "ecam table size {} out of range 1..={}",
                values.len(),
                MAX_TABLE_SIZE
            )));
        }
        if values.windows(2).any(|w| w[1] < w[0]) {
            return Err(LinkError::Protocol(
                "ecam table must be increasing".to_string(),
            ));
        }
        let sim = self.present(axis)?;
        sim.ecam_table = values.to_vec();
        sim.ecam_source = Some(source);
        debug!("axis {} loaded {} ecam points on {}", axis, values.len(), source);
        Ok(())
    }

    pub(super) fn add_link(
        &mut self,
        axis: u16,
        line: &str,
        pos: bool,
        aux: bool,
        hard: bool,
    ) -> Result<(), LinkError> {
        self.calls.add_link += 1;
        self.present(axis)?;
        if hard && self.links.iter().any(|l| l.hard && l.drives(line)) {
            return Err(LinkError::Protocol(format!(
                "line {line} already has a hard link"
            )));
        }
        self.links.push(MuxLink {
            source: axis,
            dest: line.to_ascii_uppercase(),
            pos,
            aux,
            hard,
        });
        Ok(())
    }

    pub(super) fn clear_link(&mut self, line: &str) {
        self.calls.clear_link += 1;
        self.links.retain(|l| !l.drives(line));
    }

    pub(super) fn list_links(&mut self) -> Vec<MuxLink> {
        self.calls.list_links += 1;
        self.links.clone()
    }

    pub(super) fn sync_now(&mut self, axis: u16) -> Result<(), LinkError> {
        self.calls.sync_now += 1;
        self.present(axis)?.esync_count += 1;
        Ok(())
    }
}
