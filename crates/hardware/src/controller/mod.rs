//! Per-channel memory controller.
//!
//! Each channel owns five bounded request buffers and a pending deque:
//! 1. **active** — requests whose opening command has issued; highest claim,
//!    so an in-flight activation is never wasted.
//! 2. **priority** — maintenance (refresh-class) requests.
//! 3. **pim** — in-order PIM work, above ordinary reads/writes.
//! 4. **read** / **write** — ordinary traffic, selected by write-mode
//!    watermarking.
//!
//! Every tick the controller serves departed reads, ticks the refresh seam,
//! then schedules up to two commands: a primary, and a secondary whose
//! resource kind (row vs. column) must oppose the primary's — the dual-issue
//! model of the separate row/column command buses.

/// Bounded FIFO request buffers.
pub mod buffer;
/// Refresh management seam (no-refresh baseline).
pub mod refresh;
/// PIM-aware scheduling within one buffer.
pub mod scheduler;

pub use buffer::ReqBuffer;
pub use refresh::{NoRefresh, RefreshManager};
pub use scheduler::PimScheduler;

use std::collections::VecDeque;

use crate::config::ControllerConfig;
use crate::device::{Command, Device, bank_prefix, opposite_kinds};
use crate::request::{Request, RequestKind};

/// Which buffer a scheduled request came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SourceBuffer {
    Active,
    Priority,
    Read,
    Write,
    Pim,
}

/// One channel's controller.
#[derive(Debug)]
pub struct ChannelController {
    clk: u64,
    channel_id: usize,

    wr_low_watermark: f32,
    wr_high_watermark: f32,
    is_write_mode: bool,

    /// Reads in flight between their RD issue and data departure.
    pending: VecDeque<Request>,

    active: ReqBuffer,
    priority: ReqBuffer,
    read: ReqBuffer,
    write: ReqBuffer,
    pim: ReqBuffer,

    scheduler: PimScheduler,
    refresh: Box<dyn RefreshManager>,
}

impl ChannelController {
    /// Creates the controller for `channel_id` with the configured buffer
    /// capacities and write-mode watermarks.
    pub fn new(channel_id: usize, cfg: &ControllerConfig) -> Self {
        Self {
            clk: 0,
            channel_id,
            wr_low_watermark: cfg.wr_low_watermark,
            wr_high_watermark: cfg.wr_high_watermark,
            is_write_mode: false,
            pending: VecDeque::new(),
            active: ReqBuffer::new(cfg.queue_capacity),
            priority: ReqBuffer::new(cfg.priority_capacity),
            read: ReqBuffer::new(cfg.queue_capacity),
            write: ReqBuffer::new(cfg.queue_capacity),
            pim: ReqBuffer::new(cfg.queue_capacity),
            scheduler: PimScheduler::new(),
            refresh: Box::new(NoRefresh::new()),
        }
    }

    /// The channel this controller drives.
    pub const fn channel_id(&self) -> usize {
        self.channel_id
    }

    /// Admits a request into the buffer matching its kind; hands the request
    /// back when that buffer is full (the frontend retries next tick).
    ///
    /// A read matching a buffered write is forwarded: it departs next cycle
    /// without touching the device.
    pub fn send(&mut self, mut req: Request) -> Result<(), Request> {
        req.final_command = req.kind.final_command();

        if req.kind == RequestKind::Read && self.write.iter().any(|w| w.addr == req.addr) {
            req.arrive = self.clk;
            req.depart = self.clk + 1;
            self.pending.push_back(req);
            return Ok(());
        }

        req.arrive = self.clk;
        match req.kind {
            RequestKind::Read => self.read.enqueue(req),
            RequestKind::Write => self.write.enqueue(req),
            kind if kind.is_pim() => self.pim.enqueue(req),
            // Refresh maintenance joins the priority path.
            _ => self.priority_send(req),
        }
    }

    /// Admits a maintenance request into the priority buffer.
    pub fn priority_send(&mut self, mut req: Request) -> Result<(), Request> {
        req.final_command = req.kind.final_command();
        req.arrive = self.clk;
        self.priority.enqueue(req)
    }

    /// Advances one cycle: serve departed reads, tick refresh, then issue up
    /// to two commands (primary + resource-disjoint secondary).
    pub fn tick(&mut self, dram: &mut Device) {
        self.clk += 1;

        self.serve_completed_reads();
        self.refresh.tick();

        let Some(selection) = self.schedule_request(dram, None) else {
            return;
        };
        let first_cmd = self.issue(dram, selection);

        // Dual issue: overlap a row command with a column command on the
        // other command bus.
        if let Some(selection) = self.schedule_request(dram, Some(first_cmd)) {
            let _ = self.issue(dram, selection);
        }
    }

    /// True while any buffer or the pending deque still holds a request.
    pub fn is_pending(&self) -> bool {
        !self.active.is_empty()
            || !self.priority.is_empty()
            || !self.read.is_empty()
            || !self.write.is_empty()
            || !self.pim.is_empty()
            || !self.pending.is_empty()
    }

    /// Current write-mode flag (observability).
    pub const fn is_write_mode(&self) -> bool {
        self.is_write_mode
    }

    /// Number of reads awaiting departure (observability).
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Occupancy of the read buffer (observability).
    pub fn read_len(&self) -> usize {
        self.read.len()
    }

    /// Occupancy of the write buffer (observability).
    pub fn write_len(&self) -> usize {
        self.write.len()
    }

    /// Fires callbacks for reads whose data has departed.
    fn serve_completed_reads(&mut self) {
        while self.pending.front().is_some_and(|r| r.depart <= self.clk) {
            if let Some(mut req) = self.pending.pop_front() {
                if let Some(mut callback) = req.callback.take() {
                    callback(&req);
                }
            }
        }
    }

    /// Write-mode watermarking: enter write mode when the write buffer is
    /// nearly full (or reads dried up); leave once it drains and reads wait.
    fn set_write_mode(&mut self) {
        let occupancy = self.write.len() as f32;
        let capacity = self.write.max_size() as f32;
        if self.is_write_mode {
            if occupancy < self.wr_low_watermark * capacity && !self.read.is_empty() {
                self.is_write_mode = false;
            }
        } else if occupancy > self.wr_high_watermark * capacity || self.read.is_empty() {
            self.is_write_mode = true;
        }
    }

    /// Finds a request to serve. With `opposite_of` set (the secondary pass)
    /// only commands in the opposite resource domain qualify.
    fn schedule_request(
        &mut self,
        dram: &Device,
        opposite_of: Option<Command>,
    ) -> Option<(SourceBuffer, usize)> {
        let filter_ok =
            |cmd: Command| opposite_of.is_none_or(|first| opposite_kinds(first, cmd));

        let mut found: Option<(SourceBuffer, usize)> = None;

        // Requests already activating come first (never waste an ACT).
        if let Some(idx) = self.scheduler.get_best_request(dram, &mut self.active) {
            let req = self.active.get(idx);
            if filter_ok(req.command) && dram.check_ready(req.command, &req.addr_vec) {
                found = Some((SourceBuffer::Active, idx));
            }
        }

        if found.is_none() && !self.priority.is_empty() {
            // The maintenance head's command is volatile: recomputed here
            // every tick against current bank state.
            let (cmd, addr_vec) = {
                let head = self.priority.get_mut(0);
                head.command = dram.get_preq_command(head.final_command, &head.addr_vec);
                (head.command, head.addr_vec)
            };
            if filter_ok(cmd) {
                if dram.check_ready(cmd, &addr_vec) {
                    found = Some((SourceBuffer::Priority, 0));
                } else {
                    // A stalled maintenance request gates the lower buffers.
                    return None;
                }
            }
        }

        if found.is_none() {
            if let Some(idx) = self.scheduler.get_best_request(dram, &mut self.pim) {
                let req = self.pim.get(idx);
                if filter_ok(req.command) && dram.check_ready(req.command, &req.addr_vec) {
                    found = Some((SourceBuffer::Pim, idx));
                }
            }
        }

        if found.is_none() {
            self.set_write_mode();
            let (source, buffer) = if self.is_write_mode {
                (SourceBuffer::Write, &mut self.write)
            } else {
                (SourceBuffer::Read, &mut self.read)
            };
            if let Some(idx) = self.scheduler.get_best_request(dram, buffer) {
                let req = buffer.get(idx);
                if filter_ok(req.command) && dram.check_ready(req.command, &req.addr_vec) {
                    found = Some((source, idx));
                }
            }
        }

        // Never interrupt an in-flight activation: a closing command that
        // shares a bank prefix with any active request is invalidated.
        if let Some((source, idx)) = found {
            let req = self.buffer(source).get(idx);
            if req.command.meta().is_closing {
                let prefix = bank_prefix(&req.addr_vec);
                if self
                    .active
                    .iter()
                    .any(|active| bank_prefix(&active.addr_vec) == prefix)
                {
                    return None;
                }
            }
        }

        found
    }

    /// Issues the selected request's command and applies the finalize /
    /// migrate rules. Returns the issued command.
    fn issue(&mut self, dram: &mut Device, (source, idx): (SourceBuffer, usize)) -> Command {
        let (cmd, final_cmd) = {
            let req = self.buffer(source).get(idx);
            (req.command, req.final_command)
        };
        let addr_vec = self.buffer(source).get(idx).addr_vec;

        dram.issue_command(cmd, &addr_vec);

        if cmd == final_cmd {
            let mut req = self.buffer_mut(source).remove(idx);
            if req.kind == RequestKind::Read {
                req.depart = self.clk + dram.read_latency();
                self.pending.push_back(req);
            }
            // Writes, PIM operations, and maintenance complete at issue.
        } else if cmd.meta().is_opening
            && source != SourceBuffer::Pim
            && self.active.has_space()
        {
            // PIM flows rely on broadcast activates and never migrate; their
            // requests stay in order in the PIM buffer.
            let req = self.buffer_mut(source).remove(idx);
            let _ = self.active.enqueue(req);
        }

        cmd
    }

    fn buffer(&self, source: SourceBuffer) -> &ReqBuffer {
        match source {
            SourceBuffer::Active => &self.active,
            SourceBuffer::Priority => &self.priority,
            SourceBuffer::Read => &self.read,
            SourceBuffer::Write => &self.write,
            SourceBuffer::Pim => &self.pim,
        }
    }

    fn buffer_mut(&mut self, source: SourceBuffer) -> &mut ReqBuffer {
        match source {
            SourceBuffer::Active => &mut self.active,
            SourceBuffer::Priority => &mut self.priority,
            SourceBuffer::Read => &mut self.read,
            SourceBuffer::Write => &mut self.write,
            SourceBuffer::Pim => &mut self.pim,
        }
    }
}
