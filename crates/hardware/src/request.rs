//! Memory requests and request kinds.
//!
//! A request is created by the frontend, mapped to hierarchy coordinates by
//! the memory system, and then lives in exactly one controller buffer until
//! its final command issues. `command` is the next prerequisite the
//! scheduler recomputes each cycle; `final_command` is the terminal device
//! command that satisfies the request.

use std::fmt;

use crate::device::{AddrVec, Command, NUM_LEVELS};

/// Request kinds: ordinary DRAM traffic, refresh maintenance, and the PIM
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Ordinary read (`LD`).
    Read,
    /// Ordinary write (`ST`).
    Write,
    /// All-bank refresh (maintenance; priority path only).
    AllBankRefresh,
    /// Per-bank refresh (maintenance; priority path only).
    PerBankRefresh,
    /// MAC over every bank of the pseudo-channel (`PIM_MAC_AB`).
    PimMacAllBank,
    /// MAC over the same bank index of every bank group (`PIM_MAC_SB`).
    PimMacSameBank,
    /// MAC on one bank, broadcast across pseudo-channels (`PIM_MAC_PB`).
    PimMacPerBank,
    /// Write into the GEMV input buffer (`PIM_WR_GB`).
    PimWriteGemvBuffer,
    /// Move data into the softmax buffer (`PIM_MV_SB`).
    PimMoveSoftmaxBuffer,
    /// Move data into the GEMV buffer (`PIM_MV_GB`).
    PimMoveGemvBuffer,
    /// Softmax over the softmax buffer (`PIM_SFM`).
    PimSoftmax,
    /// Set the PIM model register (`PIM_SET_MODEL`).
    PimSetModel,
    /// Set the PIM head register (`PIM_SET_HEAD`).
    PimSetHead,
    /// Ordering fence between PIM kernels (`PIM_BARRIER`).
    PimBarrier,
}

impl RequestKind {
    /// The terminal device command that satisfies a request of this kind.
    pub const fn final_command(self) -> Command {
        match self {
            Self::Read => Command::Rd,
            Self::Write => Command::Wr,
            Self::AllBankRefresh => Command::Refab,
            Self::PerBankRefresh => Command::Refsb,
            Self::PimMacAllBank => Command::Macab,
            Self::PimMacSameBank => Command::Macsb,
            Self::PimMacPerBank => Command::Macpb,
            Self::PimWriteGemvBuffer => Command::Wrgb,
            Self::PimMoveSoftmaxBuffer => Command::Mvsb,
            Self::PimMoveGemvBuffer => Command::Mvgb,
            Self::PimSoftmax => Command::Sfm,
            Self::PimSetModel => Command::Setm,
            Self::PimSetHead => Command::Seth,
            Self::PimBarrier => Command::Barrier,
        }
    }

    /// True for the PIM request family (routed to the PIM buffer).
    pub const fn is_pim(self) -> bool {
        matches!(
            self,
            Self::PimMacAllBank
                | Self::PimMacSameBank
                | Self::PimMacPerBank
                | Self::PimWriteGemvBuffer
                | Self::PimMoveSoftmaxBuffer
                | Self::PimMoveGemvBuffer
                | Self::PimSoftmax
                | Self::PimSetModel
                | Self::PimSetHead
                | Self::PimBarrier
        )
    }

    /// True for refresh maintenance requests (priority path).
    pub const fn is_refresh(self) -> bool {
        matches!(self, Self::AllBankRefresh | Self::PerBankRefresh)
    }
}

/// Callback fired when a read's data departs the device.
pub type ReadCallback = Box<dyn FnMut(&Request)>;

/// One in-flight memory request.
pub struct Request {
    /// Flat byte address.
    pub addr: u64,
    /// Request kind.
    pub kind: RequestKind,
    /// Cycle the request entered its controller buffer.
    pub arrive: u64,
    /// Cycle the read data leaves the device (reads only; set at issue).
    pub depart: u64,
    /// Next prerequisite command; recomputed by the scheduler every cycle.
    pub command: Command,
    /// Terminal command that satisfies this request.
    pub final_command: Command,
    /// Hierarchy coordinates, populated by the address mapper.
    pub addr_vec: AddrVec,
    /// Completion callback (reads only).
    pub callback: Option<ReadCallback>,
}

impl Request {
    /// Creates a request for the given address and kind.
    pub fn new(addr: u64, kind: RequestKind) -> Self {
        let final_command = kind.final_command();
        Self {
            addr,
            kind,
            arrive: 0,
            depart: 0,
            command: final_command,
            final_command,
            addr_vec: [0; NUM_LEVELS],
            callback: None,
        }
    }

    /// Attaches a completion callback (fired when a read departs).
    #[must_use]
    pub fn with_callback(mut self, callback: ReadCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("kind", &self.kind)
            .field("arrive", &self.arrive)
            .field("depart", &self.depart)
            .field("command", &self.command)
            .field("final_command", &self.final_command)
            .field("addr_vec", &self.addr_vec)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
