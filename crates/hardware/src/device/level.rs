//! Hierarchy levels and hierarchy addresses.
//!
//! The device is a fixed-depth tree: channel → pseudo-channel → rank →
//! bank-group → bank, with row and column as coordinates into the bank
//! (rows and columns are not materialized as nodes). A hierarchy address
//! carries one index per level.

use std::fmt;

/// One level of the device hierarchy, ordered root to leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Independent command/data domain; controllers are per-channel.
    Channel = 0,
    /// Half-channel sharing the command bus with an independent data bus.
    PseudoChannel = 1,
    /// Stack rank (one per 4-Hi of stack height).
    Rank = 2,
    /// Bank group; banks within share `nCCDL`/`nRRDL` constraints.
    BankGroup = 3,
    /// Bank; owns the row buffer state.
    Bank = 4,
    /// Open-row coordinate (not a node).
    Row = 5,
    /// Column coordinate into the row buffer (not a node).
    Column = 6,
}

/// Number of hierarchy levels.
pub const NUM_LEVELS: usize = 7;

/// Index of the row coordinate; a hierarchy address truncated to this length
/// identifies a bank (the "bank prefix").
pub const ROW_LEVEL: usize = Level::Row as usize;

/// All levels, root to leaf.
pub const LEVELS: [Level; NUM_LEVELS] = [
    Level::Channel,
    Level::PseudoChannel,
    Level::Rank,
    Level::BankGroup,
    Level::Bank,
    Level::Row,
    Level::Column,
];

/// A hierarchy address: one index per level, channel first.
pub type AddrVec = [usize; NUM_LEVELS];

/// Returns the bank prefix of a hierarchy address (all coordinates above the
/// row level). Two requests with equal bank prefixes target the same bank.
#[inline]
pub fn bank_prefix(addr_vec: &AddrVec) -> &[usize] {
    &addr_vec[..ROW_LEVEL]
}

impl Level {
    /// Short lowercase name, matching the configuration keys.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::PseudoChannel => "pseudochannel",
            Self::Rank => "rank",
            Self::BankGroup => "bankgroup",
            Self::Bank => "bank",
            Self::Row => "row",
            Self::Column => "column",
        }
    }

    /// The next level towards the leaves, if any.
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Channel => Some(Self::PseudoChannel),
            Self::PseudoChannel => Some(Self::Rank),
            Self::Rank => Some(Self::BankGroup),
            Self::BankGroup => Some(Self::Bank),
            Self::Bank => Some(Self::Row),
            Self::Row => Some(Self::Column),
            Self::Column => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
