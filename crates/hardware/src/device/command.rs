//! The HBM3-PIM command alphabet and per-command metadata.
//!
//! Each command carries:
//! 1. **Meta:** whether it opens or closes a row, accesses data, or refreshes.
//! 2. **Scope:** the hierarchy level at which its effect is evaluated.
//! 3. **Resource kind:** row-bus or column-bus, for dual-issue disjointness.

use std::fmt;

use super::level::Level;

/// A device command: the ordinary DRAM set plus the PIM extensions.
///
/// `Barrier` is a scheduler ordering token carried by barrier requests; it is
/// never issued to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Activate (open) a row in one bank.
    Act,
    /// Precharge (close) one bank.
    Pre,
    /// Precharge every bank of the channel (both pseudo-channels).
    Prea,
    /// Precharge the same bank index across every bank group of a rank.
    Presb,
    /// Precharge the addressed bank across every pseudo-channel.
    Prepb,
    /// Column read.
    Rd,
    /// Column write.
    Wr,
    /// All-bank refresh.
    Refab,
    /// Same-bank (per-bank) refresh.
    Refsb,
    /// Activate every bank of the pseudo-channel (all-bank MAC precursor).
    Actab,
    /// Activate the same bank index across every bank group of a rank.
    Actsb,
    /// Activate the addressed bank across every pseudo-channel.
    Actpb,
    /// Multiply-accumulate across all banks of the pseudo-channel.
    Macab,
    /// Multiply-accumulate across the same bank index of every bank group.
    Macsb,
    /// Multiply-accumulate on one bank, broadcast to every pseudo-channel.
    Macpb,
    /// Write into the GEMV input buffer.
    Wrgb,
    /// Move data into the softmax buffer.
    Mvsb,
    /// Move data into the GEMV buffer.
    Mvgb,
    /// Softmax over the softmax buffer.
    Sfm,
    /// Set the PIM model register.
    Setm,
    /// Set the PIM head register.
    Seth,
    /// PIM ordering fence (scheduler token, never issued).
    Barrier,
}

/// Number of distinct commands.
pub const NUM_COMMANDS: usize = 22;

/// All commands, in declaration order.
pub const COMMANDS: [Command; NUM_COMMANDS] = [
    Command::Act,
    Command::Pre,
    Command::Prea,
    Command::Presb,
    Command::Prepb,
    Command::Rd,
    Command::Wr,
    Command::Refab,
    Command::Refsb,
    Command::Actab,
    Command::Actsb,
    Command::Actpb,
    Command::Macab,
    Command::Macsb,
    Command::Macpb,
    Command::Wrgb,
    Command::Mvsb,
    Command::Mvgb,
    Command::Sfm,
    Command::Setm,
    Command::Seth,
    Command::Barrier,
];

/// State-transition metadata for one command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandMeta {
    /// Transitions the affected bank(s) to `Opened`.
    pub is_opening: bool,
    /// Transitions the affected bank(s) to `Closed`.
    pub is_closing: bool,
    /// Transfers data through a row buffer (RD/WR/MAC family).
    pub is_accessing: bool,
    /// Performs a refresh.
    pub is_refreshing: bool,
}

/// Resource domain of a command, for dual-issue disjointness: a row command
/// and a column command may issue in the same cycle; two of a kind may not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Uses the row-address path (activates, precharges, refreshes).
    Row,
    /// Uses the column/data path (reads, writes, MACs, buffer moves).
    Column,
}

impl Command {
    /// Dense index of this command, for table lookups.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// State-transition metadata.
    pub const fn meta(self) -> CommandMeta {
        let (is_opening, is_closing, is_accessing, is_refreshing) = match self {
            Self::Act | Self::Actab | Self::Actsb | Self::Actpb => (true, false, false, false),
            Self::Pre | Self::Prea | Self::Presb | Self::Prepb => (false, true, false, false),
            Self::Rd | Self::Wr | Self::Macab | Self::Macsb | Self::Macpb => {
                (false, false, true, false)
            }
            Self::Refab | Self::Refsb => (false, false, false, true),
            Self::Wrgb
            | Self::Mvsb
            | Self::Mvgb
            | Self::Sfm
            | Self::Setm
            | Self::Seth
            | Self::Barrier => (false, false, false, false),
        };
        CommandMeta {
            is_opening,
            is_closing,
            is_accessing,
            is_refreshing,
        }
    }

    /// The hierarchy level at which this command's effect is evaluated.
    pub const fn scope(self) -> Level {
        match self {
            Self::Act | Self::Actab | Self::Actsb | Self::Actpb => Level::Row,
            Self::Pre
            | Self::Presb
            | Self::Prepb
            | Self::Refsb
            | Self::Wrgb
            | Self::Mvsb
            | Self::Mvgb
            | Self::Setm => Level::Bank,
            Self::Prea | Self::Refab | Self::Sfm | Self::Seth | Self::Barrier => Level::Channel,
            Self::Rd | Self::Wr | Self::Macab | Self::Macsb | Self::Macpb => Level::Column,
        }
    }

    /// Row/column resource classification; `None` for the barrier token.
    pub const fn kind(self) -> Option<CommandKind> {
        match self {
            Self::Act
            | Self::Pre
            | Self::Prea
            | Self::Presb
            | Self::Prepb
            | Self::Refab
            | Self::Refsb
            | Self::Actab
            | Self::Actsb
            | Self::Actpb => Some(CommandKind::Row),
            Self::Rd
            | Self::Wr
            | Self::Macab
            | Self::Macsb
            | Self::Macpb
            | Self::Wrgb
            | Self::Mvsb
            | Self::Mvgb
            | Self::Sfm
            | Self::Setm
            | Self::Seth => Some(CommandKind::Column),
            Self::Barrier => None,
        }
    }

    /// Canonical mnemonic, as it appears in JEDEC-style timing tables.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Pre => "PRE",
            Self::Prea => "PREA",
            Self::Presb => "PRESB",
            Self::Prepb => "PREPB",
            Self::Rd => "RD",
            Self::Wr => "WR",
            Self::Refab => "REFab",
            Self::Refsb => "REFsb",
            Self::Actab => "ACTAB",
            Self::Actsb => "ACTSB",
            Self::Actpb => "ACTPB",
            Self::Macab => "MACAB",
            Self::Macsb => "MACSB",
            Self::Macpb => "MACPB",
            Self::Wrgb => "WRGB",
            Self::Mvsb => "MVSB",
            Self::Mvgb => "MVGB",
            Self::Sfm => "SFM",
            Self::Setm => "SETM",
            Self::Seth => "SETH",
            Self::Barrier => "BARRIER",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns true when the two commands occupy opposite resource domains
/// (one row, one column) and may therefore issue in the same cycle.
pub fn opposite_kinds(first: Command, second: Command) -> bool {
    match (first.kind(), second.kind()) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}
