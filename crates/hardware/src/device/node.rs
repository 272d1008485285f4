//! Hierarchy nodes: per-node timing state and bank row-buffer state.
//!
//! Children are uniquely owned by their parents; every update starts at the
//! channel root with a full hierarchy address, so no back-references exist.

use std::collections::VecDeque;

use super::command::{Command, NUM_COMMANDS};
use super::level::Level;
use super::organization::Organization;
use super::timing::TimingCons;

/// Row-buffer state of a bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BankState {
    /// No row is open.
    #[default]
    Closed,
    /// The given row occupies the row buffer.
    Opened(usize),
}

/// One node of the device tree (channel, pseudo-channel, rank, bank group,
/// or bank). Rows and columns are coordinates, not nodes.
#[derive(Debug)]
pub struct Node {
    /// Index of this node among its siblings.
    pub id: usize,
    /// Earliest cycle at which each command becomes legal at this node.
    /// Monotone non-decreasing: issues only ever raise these.
    pub future_ready: [u64; NUM_COMMANDS],
    /// Issue-cycle history per command, kept only as wide as the widest
    /// sliding-window constraint anchored at this node (e.g. the
    /// four-activation window at rank level).
    pub history: Vec<VecDeque<u64>>,
    /// Row-buffer state; meaningful at bank level only.
    pub state: BankState,
    /// Child nodes; empty at bank level.
    pub children: Vec<Node>,
}

impl Node {
    /// Builds the subtree rooted at a node of `level` with sibling index `id`.
    pub fn new(org: &Organization, level: Level, id: usize) -> Self {
        let children = match level.child() {
            Some(child_level) if child_level < Level::Row => (0..org.count(child_level))
                .map(|i| Self::new(org, child_level, i))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            id,
            future_ready: [0; NUM_COMMANDS],
            history: vec![VecDeque::new(); NUM_COMMANDS],
            state: BankState::Closed,
            children,
        }
    }

    /// Applies every timing edge anchored at `(level, cmd)` to this node for
    /// an issue at cycle `clk`. Windowed history is recorded exactly once per
    /// issue, before the edges are evaluated.
    pub fn apply_timing(&mut self, cons: &TimingCons, level: Level, cmd: Command, clk: u64) {
        let edges = cons.edges(level, cmd);
        if edges.is_empty() {
            return;
        }

        let max_window = cons.max_window(level, cmd);
        if max_window > 0 {
            let history = &mut self.history[cmd.index()];
            history.push_back(clk);
            while history.len() > max_window {
                let _ = history.pop_front();
            }
        }

        for edge in edges {
            let slot = &mut self.future_ready[edge.following.index()];
            if edge.window == 0 {
                *slot = (*slot).max(clk + edge.latency);
            } else {
                // Sliding window: the floor is the window-th most recent
                // issue plus the latency, once the window has filled.
                let history = &self.history[cmd.index()];
                if history.len() >= edge.window {
                    let pivot = history[history.len() - edge.window];
                    *slot = (*slot).max(pivot + edge.latency);
                }
            }
        }
    }

    /// True when `cmd` is legal at this node at cycle `clk`.
    #[inline]
    pub fn timing_ready(&self, cmd: Command, clk: u64) -> bool {
        self.future_ready[cmd.index()] <= clk
    }
}
