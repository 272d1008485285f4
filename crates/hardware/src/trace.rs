//! Load/store/PIM trace parsing and replay.
//!
//! Trace files are line-oriented UTF-8, one `<OP> <addr>` pair per line.
//! Addresses are decimal or `0x`/`0X` hexadecimal. Malformed lines are
//! configuration errors reported with their line number.
//!
//! On each tick the frontend admits trace entries in order until the memory
//! system refuses one (buffer full), then retries from the same entry next
//! tick. The trace index is cyclic modulo the trace length; the run is
//! finished once every line has been admitted exactly once.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::common::ConfigError;
use crate::memory::MemorySystem;
use crate::request::{Request, RequestKind};

/// One parsed trace line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TraceEntry {
    kind: RequestKind,
    addr: u64,
}

/// Parses and replays a memory trace against a memory system.
#[derive(Debug)]
pub struct TraceFrontend {
    entries: Vec<TraceEntry>,
    cursor: usize,
    sent: usize,
}

impl TraceFrontend {
    /// Loads a trace file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or any line is
    /// malformed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        info!(trace = %path_str, "loading trace file");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::TraceIo {
            path: path_str.clone(),
            source,
        })?;
        let frontend = Self::from_lines(&contents, &path_str)?;
        info!(lines = frontend.len(), "loaded trace");
        Ok(frontend)
    }

    /// Parses trace text; `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedTrace`] for the first bad line.
    pub fn from_lines(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            entries.push(parse_line(line, origin, idx + 1)?);
        }
        Ok(Self {
            entries,
            cursor: 0,
            sent: 0,
        })
    }

    /// Number of trace lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for a trace with no lines.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once every line has been admitted.
    pub fn is_finished(&self) -> bool {
        self.sent >= self.entries.len()
    }

    /// Lines admitted so far.
    pub const fn requests_sent(&self) -> usize {
        self.sent
    }

    /// Admits entries in order until the memory system refuses one or the
    /// trace is exhausted.
    pub fn tick(&mut self, memory: &mut MemorySystem) {
        while !self.is_finished() {
            let entry = self.entries[self.cursor];
            match memory.send(Request::new(entry.addr, entry.kind)) {
                Ok(()) => {
                    self.cursor = (self.cursor + 1) % self.entries.len();
                    self.sent += 1;
                }
                Err(_) => break,
            }
        }
    }
}

/// Parses one `<OP> <addr>` line.
fn parse_line(line: &str, origin: &str, lineno: usize) -> Result<TraceEntry, ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedTrace {
        path: origin.to_owned(),
        line: lineno,
        reason,
    };

    let mut tokens = line.split_whitespace();
    let (Some(op), Some(addr), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed("expected exactly `<OP> <addr>`".to_owned()));
    };

    let kind = match op {
        "LD" => RequestKind::Read,
        "ST" => RequestKind::Write,
        "PIM_MAC_AB" => RequestKind::PimMacAllBank,
        "PIM_MAC_SB" => RequestKind::PimMacSameBank,
        "PIM_MAC_PB" => RequestKind::PimMacPerBank,
        "PIM_WR_GB" => RequestKind::PimWriteGemvBuffer,
        "PIM_MV_SB" => RequestKind::PimMoveSoftmaxBuffer,
        "PIM_MV_GB" => RequestKind::PimMoveGemvBuffer,
        "PIM_SFM" => RequestKind::PimSoftmax,
        "PIM_SET_MODEL" => RequestKind::PimSetModel,
        "PIM_SET_HEAD" => RequestKind::PimSetHead,
        "PIM_BARRIER" => RequestKind::PimBarrier,
        other => return Err(malformed(format!("unknown opcode \"{other}\""))),
    };

    let addr = if let Some(hex) = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        addr.parse()
    }
    .map_err(|_| malformed(format!("invalid address \"{addr}\"")))?;

    Ok(TraceEntry { kind, addr })
}
