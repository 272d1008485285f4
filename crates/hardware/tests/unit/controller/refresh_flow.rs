//! Refresh Maintenance Flow Tests.
//!
//! Refresh-class requests travel the priority path: an all-bank refresh
//! first precharges the channel (PREA precursor), then issues REFab, and
//! subsequent activates pay nRFC.

use hbmsim_core::device::Command;
use hbmsim_core::request::RequestKind;

use crate::common::harness::{TestContext, linear_addr};

#[test]
fn all_bank_refresh_precharges_then_refreshes() {
    let mut ctx = TestContext::new();
    // Leave a row open via an ordinary read.
    assert!(ctx.send(RequestKind::Read, linear_addr(0, 0, 0, 0, 0)));
    let _ = ctx.run_to_idle(10_000);

    assert!(ctx.send(RequestKind::AllBankRefresh, 0));
    let _ = ctx.run_to_idle(10_000);

    let prea = ctx.only_issue(Command::Prea);
    let refab = ctx.only_issue(Command::Refab);
    let n_rp = ctx.memory.device().timing().n_rp;
    assert_eq!(refab.cycle, prea.cycle + n_rp);
    assert_eq!(ctx.memory.stats().num_other_requests, 1);
}

#[test]
fn refresh_blocks_activates_for_nrfc() {
    let mut ctx = TestContext::new();
    assert!(ctx.send(RequestKind::Read, linear_addr(0, 0, 0, 0, 0)));
    let _ = ctx.run_to_idle(10_000);
    assert!(ctx.send(RequestKind::AllBankRefresh, 0));
    let _ = ctx.run_to_idle(10_000);

    // A fresh read's ACT waits out the refresh cycle time.
    assert!(ctx.send(RequestKind::Read, linear_addr(0, 0, 0, 1, 0)));
    let _ = ctx.run_to_idle(10_000);

    let refab = ctx.only_issue(Command::Refab);
    let acts = ctx.issues(Command::Act);
    assert_eq!(acts.len(), 2);
    let n_rfc = ctx.memory.device().timing().n_rfc;
    assert_eq!(acts[1].cycle, refab.cycle + n_rfc);
}

#[test]
fn refresh_on_closed_banks_needs_no_precursor() {
    let mut ctx = TestContext::new();
    assert!(ctx.send(RequestKind::AllBankRefresh, 0));
    let _ = ctx.run_to_idle(10_000);

    assert!(ctx.issues(Command::Prea).is_empty());
    assert_eq!(ctx.issues(Command::Refab).len(), 1);
}

#[test]
fn stalled_maintenance_gates_lower_buffers() {
    let mut ctx = TestContext::new();
    // Open a row, then queue a refresh (needs PREA, gated by nRAS) together
    // with a row-hit read that would otherwise issue immediately.
    assert!(ctx.send(RequestKind::Read, linear_addr(0, 0, 0, 0, 0)));
    ctx.run(25); // ACT at 1, RD at 24; bank stays open
    assert!(ctx.send(RequestKind::AllBankRefresh, 0));
    assert!(ctx.send(RequestKind::Read, linear_addr(0, 1, 0, 0, 0)));
    let _ = ctx.run_to_idle(10_000);

    // The second read's ACT must not issue before the refresh resolves its
    // PREA precursor (nRAS after the first ACT).
    let acts = ctx.issues(Command::Act);
    let prea = ctx.only_issue(Command::Prea);
    assert_eq!(acts.len(), 2);
    assert!(
        acts[1].cycle > prea.cycle,
        "read ACT at {} jumped the stalled refresh (PREA at {})",
        acts[1].cycle,
        prea.cycle
    );
}
