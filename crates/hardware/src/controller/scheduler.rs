//! PIM-aware request scheduling within one buffer.
//!
//! `get_best_request` picks at most one request per invocation:
//! 1. Every request's prerequisite command is recomputed against the current
//!    device state.
//! 2. Row-hit banks are collected so a later-arriving hit is not starved by
//!    an earlier ready miss to the same bank.
//! 3. A barrier at the head is consumed; behind a barrier only row work
//!    (opening/closing commands) may be compared — accesses stay fenced.
//! 4. Ties fall back to FCFS on arrival cycle, which bounds starvation.

use crate::device::{Device, ROW_LEVEL};
use crate::request::{Request, RequestKind};

use super::buffer::ReqBuffer;

/// Bank prefix of a request (coordinates above the row level).
fn bank_addr(req: &Request) -> [usize; ROW_LEVEL] {
    let mut out = [0; ROW_LEVEL];
    out.copy_from_slice(&req.addr_vec[..ROW_LEVEL]);
    out
}

/// Row-buffer-aware, barrier-honoring FCFS scheduler.
#[derive(Debug, Default)]
pub struct PimScheduler {
    /// Banks for which some queued request currently row-hits; rebuilt each
    /// invocation.
    rowhit_list: Vec<[usize; ROW_LEVEL]>,
}

impl PimScheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the best request in `buffer`, returning its index.
    ///
    /// May consume one barrier from the buffer head. Returns `None` when the
    /// buffer is (or becomes) empty. The chosen request's `command` is the
    /// up-to-date prerequisite; readiness is the caller's check.
    pub fn get_best_request(&mut self, dram: &Device, buffer: &mut ReqBuffer) -> Option<usize> {
        if buffer.is_empty() {
            return None;
        }

        for req in buffer.iter_mut() {
            req.command = dram.get_preq_command(req.final_command, &req.addr_vec);
        }

        self.rowhit_list.clear();
        for req in buffer.iter() {
            if dram.check_rowbuffer_hit(req.command, &req.addr_vec) {
                self.rowhit_list.push(bank_addr(req));
            }
        }

        // A barrier at the head has fenced everything it needed to; consume it.
        if buffer.get(0).kind == RequestKind::PimBarrier {
            let _ = buffer.remove(0);
            if buffer.is_empty() {
                return None;
            }
        }

        let mut candidate = 0;
        let mut barrier_seen = false;
        for next in 1..buffer.len() {
            if buffer.get(next).kind == RequestKind::PimBarrier {
                barrier_seen = true;
            }
            // Row-level work may advance across a barrier; accesses may not.
            let meta = buffer.get(next).command.meta();
            if !barrier_seen || meta.is_opening || meta.is_closing {
                candidate = self.compare(dram, buffer, candidate, next);
            }
        }
        Some(candidate)
    }

    /// Picks between an earlier candidate `a` and a later challenger `b`.
    ///
    /// A ready request beats an unready one, except that a ready challenger
    /// is held back when it is not itself a row hit but some queued request
    /// row-hits its bank (issuing it would demote that hit). Otherwise FCFS.
    fn compare(&self, dram: &Device, buffer: &ReqBuffer, a: usize, b: usize) -> usize {
        let req_a = buffer.get(a);
        let req_b = buffer.get(b);
        let ready_a = dram.check_ready(req_a.command, &req_a.addr_vec);
        let ready_b = dram.check_ready(req_b.command, &req_b.addr_vec);

        if ready_a != ready_b {
            if ready_a {
                return a;
            }
            if !dram.check_rowbuffer_hit(req_b.command, &req_b.addr_vec)
                && self.rowhit_list.contains(&bank_addr(req_b))
            {
                return a;
            }
            return b;
        }

        if req_a.arrive <= req_b.arrive { a } else { b }
    }
}
