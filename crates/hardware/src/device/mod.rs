//! The HBM3-PIM device model.
//!
//! This module implements the timing/state model of the device:
//! 1. **Hierarchy:** channel → pseudo-channel → rank → bank-group → bank
//!    nodes, each holding per-command future-ready times and (at bank level)
//!    the row-buffer state.
//! 2. **Commands:** the DRAM + PIM alphabet with per-command metadata.
//! 3. **Timing graph:** JEDEC-derived constraint edges grouped by
//!    `(level, preceding)`, including the sliding four-activation window.
//! 4. **Oracles:** `check_ready`, `check_rowbuffer_hit`, and
//!    `get_preq_command`, which the controller consults every cycle.
//!
//! `issue_command` performs a single root-to-bank traversal; broadcast
//! commands (same-bank, per-bank, all-bank) fan the traversal out at their
//! broadcast level so every affected node is updated exactly once.

/// The command alphabet and per-command metadata.
pub mod command;
/// Hierarchy levels and hierarchy addresses.
pub mod level;
/// Tree nodes: future-ready tables, windowed history, bank state.
pub mod node;
/// Organization presets and validation.
pub mod organization;
/// Timing presets, resolution, and the constraint graph.
pub mod timing;

pub use command::{Command, CommandKind, CommandMeta, NUM_COMMANDS, opposite_kinds};
pub use level::{AddrVec, Level, NUM_LEVELS, ROW_LEVEL, bank_prefix};
pub use node::{BankState, Node};
pub use organization::Organization;
pub use timing::{TimingCons, TimingVals};

use crate::common::ConfigError;
use crate::config::DeviceConfig;

/// One issued command, as recorded by the command log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssueRecord {
    /// Device cycle at which the command issued.
    pub cycle: u64,
    /// The command.
    pub command: Command,
    /// Full hierarchy address of the triggering request.
    pub addr_vec: AddrVec,
}

/// The HBM3-PIM device: organization, timing graph, and the node tree.
///
/// The device never checks readiness on issue (beyond a debug assertion);
/// the controller is responsible for consulting [`Device::check_ready`]
/// first. Issuing a command only ever *raises* future-ready times.
#[derive(Debug)]
pub struct Device {
    clk: u64,
    org: Organization,
    timing: TimingVals,
    cons: TimingCons,
    read_latency: u64,
    channels: Vec<Node>,
    log: Option<Vec<IssueRecord>>,
}

/// Child selection while walking the tree for one issued command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fanout {
    /// Descend into the addressed child only.
    Addressed,
    /// Descend into every child (broadcast).
    All,
}

/// Which children a command visits below a node of `level`.
///
/// Same-bank commands broadcast across the bank groups of the addressed
/// rank; per-bank commands broadcast across pseudo-channels; all-bank
/// commands and channel-wide precharge/refresh broadcast below their
/// anchor level.
const fn fan_select(cmd: Command, level: Level) -> Fanout {
    match cmd {
        Command::Prea | Command::Refab => Fanout::All,
        Command::Actab | Command::Macab => match level {
            Level::Channel => Fanout::Addressed,
            _ => Fanout::All,
        },
        Command::Actsb | Command::Macsb | Command::Presb => match level {
            Level::Rank => Fanout::All,
            _ => Fanout::Addressed,
        },
        Command::Actpb | Command::Macpb | Command::Prepb => match level {
            Level::Channel => Fanout::All,
            _ => Fanout::Addressed,
        },
        _ => Fanout::Addressed,
    }
}

/// Applies one issue to the subtree under `node`: timing edges at every
/// visited node, and the opening/closing state flip at visited banks.
fn apply_issue(
    node: &mut Node,
    level: Level,
    cmd: Command,
    addr_vec: &AddrVec,
    clk: u64,
    cons: &TimingCons,
) {
    node.apply_timing(cons, level, cmd, clk);

    if level == Level::Bank {
        let meta = cmd.meta();
        if meta.is_opening {
            node.state = BankState::Opened(addr_vec[ROW_LEVEL]);
        } else if meta.is_closing {
            node.state = BankState::Closed;
        }
        return;
    }

    let Some(child_level) = level.child() else {
        return;
    };
    match fan_select(cmd, level) {
        Fanout::Addressed => {
            let child = &mut node.children[addr_vec[child_level as usize]];
            apply_issue(child, child_level, cmd, addr_vec, clk, cons);
        }
        Fanout::All => {
            for child in &mut node.children {
                apply_issue(child, child_level, cmd, addr_vec, clk, cons);
            }
        }
    }
}

impl Device {
    /// Builds the device from configuration: organization resolution, timing
    /// resolution, constraint-graph construction, and node-tree creation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the organization or timing
    /// configuration is inconsistent (see [`Organization::resolve`] and
    /// [`TimingVals::resolve`]).
    pub fn new(cfg: &DeviceConfig) -> Result<Self, ConfigError> {
        let org = Organization::resolve(&cfg.org)?;
        let timing = TimingVals::resolve(&cfg.timing, &org)?;
        let cons = TimingCons::new(&timing);
        let channels = (0..org.count(Level::Channel))
            .map(|i| Node::new(&org, Level::Channel, i))
            .collect();
        Ok(Self {
            clk: 0,
            org,
            timing,
            cons,
            read_latency: timing.read_latency(),
            channels,
            log: None,
        })
    }

    /// Advances the device clock by one cycle.
    #[inline]
    pub fn tick(&mut self) {
        self.clk += 1;
    }

    /// Current device cycle.
    #[inline]
    pub const fn clk(&self) -> u64 {
        self.clk
    }

    /// Resolved organization.
    pub const fn organization(&self) -> &Organization {
        &self.org
    }

    /// Resolved timing values.
    pub const fn timing(&self) -> &TimingVals {
        &self.timing
    }

    /// Cycles from a read's column command to its data (`nCL + nBL`).
    #[inline]
    pub const fn read_latency(&self) -> u64 {
        self.read_latency
    }

    /// Issues `cmd` for the addressed request, updating future-ready times
    /// at every affected node and flipping bank states per the command meta.
    ///
    /// Readiness is the caller's obligation; in debug builds an unready
    /// issue is an invariant violation.
    pub fn issue_command(&mut self, cmd: Command, addr_vec: &AddrVec) {
        debug_assert!(
            self.check_ready(cmd, addr_vec),
            "command {cmd} issued at cycle {} before it was ready",
            self.clk
        );
        if let Some(log) = self.log.as_mut() {
            log.push(IssueRecord {
                cycle: self.clk,
                command: cmd,
                addr_vec: *addr_vec,
            });
        }
        let clk = self.clk;
        let cons = &self.cons;
        apply_issue(
            &mut self.channels[addr_vec[Level::Channel as usize]],
            Level::Channel,
            cmd,
            addr_vec,
            clk,
            cons,
        );
    }

    /// True when `cmd` is issuable now: the future-ready time at every node
    /// on the addressed root-to-bank path has passed, and the bank-state
    /// prerequisite holds (no earlier command is still required).
    pub fn check_ready(&self, cmd: Command, addr_vec: &AddrVec) -> bool {
        let mut node = &self.channels[addr_vec[Level::Channel as usize]];
        let mut level = Level::Channel;
        loop {
            if !node.timing_ready(cmd, self.clk) {
                return false;
            }
            if level == Level::Bank {
                break;
            }
            let Some(child_level) = level.child() else {
                break;
            };
            node = &node.children[addr_vec[child_level as usize]];
            level = child_level;
        }
        self.get_preq_command(cmd, addr_vec) == cmd
    }

    /// The command that must issue next to make progress toward `final_cmd`:
    /// the final command itself once its bank-state prerequisite holds,
    /// otherwise the matching activate (closed banks) or precharge
    /// (wrong-row banks) variant.
    pub fn get_preq_command(&self, final_cmd: Command, addr_vec: &AddrVec) -> Command {
        let row = addr_vec[ROW_LEVEL];
        match final_cmd {
            Command::Rd | Command::Wr => match self.bank(addr_vec).state {
                BankState::Opened(r) if r == row => final_cmd,
                BankState::Opened(_) => Command::Pre,
                BankState::Closed => Command::Act,
            },
            Command::Macab => Self::group_preq(
                self.pseudo_channel_banks(addr_vec),
                row,
                final_cmd,
                Command::Actab,
                Command::Prea,
            ),
            Command::Macsb => Self::group_preq(
                self.same_bank_set(addr_vec),
                row,
                final_cmd,
                Command::Actsb,
                Command::Presb,
            ),
            Command::Macpb => Self::group_preq(
                self.per_bank_set(addr_vec),
                row,
                final_cmd,
                Command::Actpb,
                Command::Prepb,
            ),
            Command::Refab => {
                let all_closed = self
                    .pseudo_channel_banks(addr_vec)
                    .all(|b| b.state == BankState::Closed);
                if all_closed {
                    final_cmd
                } else {
                    Command::Prea
                }
            }
            Command::Refsb => {
                if self.bank(addr_vec).state == BankState::Closed {
                    final_cmd
                } else {
                    Command::Pre
                }
            }
            other => other,
        }
    }

    /// True for an access command whose addressed bank already holds the
    /// requested row in its row buffer.
    pub fn check_rowbuffer_hit(&self, cmd: Command, addr_vec: &AddrVec) -> bool {
        matches!(
            cmd,
            Command::Rd | Command::Wr | Command::Macab | Command::Macsb | Command::Macpb
        ) && self.bank(addr_vec).state == BankState::Opened(addr_vec[ROW_LEVEL])
    }

    /// Enables recording of every issued command (the cycle timeline).
    pub fn enable_command_log(&mut self) {
        if self.log.is_none() {
            self.log = Some(Vec::new());
        }
    }

    /// The commands issued so far, if logging is enabled.
    pub fn command_log(&self) -> Option<&[IssueRecord]> {
        self.log.as_deref()
    }

    /// Drains the command log, leaving logging enabled.
    pub fn take_command_log(&mut self) -> Vec<IssueRecord> {
        self.log.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Bank state of the addressed bank (observability for tests/tools).
    pub fn bank_state(&self, addr_vec: &AddrVec) -> BankState {
        self.bank(addr_vec).state
    }

    fn bank(&self, addr_vec: &AddrVec) -> &Node {
        &self.pseudo_channel(addr_vec).children[addr_vec[Level::Rank as usize]].children
            [addr_vec[Level::BankGroup as usize]]
            .children[addr_vec[Level::Bank as usize]]
    }

    fn pseudo_channel(&self, addr_vec: &AddrVec) -> &Node {
        &self.channels[addr_vec[Level::Channel as usize]].children
            [addr_vec[Level::PseudoChannel as usize]]
    }

    /// Every bank under the addressed pseudo-channel.
    fn pseudo_channel_banks(&self, addr_vec: &AddrVec) -> impl Iterator<Item = &Node> {
        self.pseudo_channel(addr_vec)
            .children
            .iter()
            .flat_map(|rank| rank.children.iter())
            .flat_map(|bg| bg.children.iter())
    }

    /// The addressed bank index across every bank group of the addressed rank.
    fn same_bank_set(&self, addr_vec: &AddrVec) -> impl Iterator<Item = &Node> {
        let bank = addr_vec[Level::Bank as usize];
        self.pseudo_channel(addr_vec).children[addr_vec[Level::Rank as usize]]
            .children
            .iter()
            .map(move |bg| &bg.children[bank])
    }

    /// The addressed bank across every pseudo-channel of the channel.
    fn per_bank_set(&self, addr_vec: &AddrVec) -> impl Iterator<Item = &Node> {
        self.channels[addr_vec[Level::Channel as usize]]
            .children
            .iter()
            .map(move |pch| {
                &pch.children[addr_vec[Level::Rank as usize]].children
                    [addr_vec[Level::BankGroup as usize]]
                    .children[addr_vec[Level::Bank as usize]]
            })
    }

    /// Shared group-prerequisite rule for the broadcast MAC variants: the
    /// access once every bank in the set holds the row, the precharge
    /// variant while any bank holds a different row, the activate variant
    /// otherwise.
    fn group_preq<'a>(
        banks: impl Iterator<Item = &'a Node>,
        row: usize,
        access: Command,
        act: Command,
        pre: Command,
    ) -> Command {
        let mut all_open = true;
        let mut any_conflict = false;
        for bank in banks {
            match bank.state {
                BankState::Opened(r) if r == row => {}
                BankState::Opened(_) => {
                    any_conflict = true;
                    all_open = false;
                }
                BankState::Closed => all_open = false,
            }
        }
        if all_open {
            access
        } else if any_conflict {
            pre
        } else {
            act
        }
    }
}
