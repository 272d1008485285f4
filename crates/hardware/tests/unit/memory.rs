//! Memory System Tests.
//!
//! Verifies channel routing, per-kind counters (and their sum against
//! successful admissions), back-pressure, and `is_pending`.

use hbmsim_core::config::Config;
use hbmsim_core::mapper::MapperKind;
use hbmsim_core::request::RequestKind;

use crate::common::harness::{TestContext, base_config, linear_addr};

fn two_channel_config() -> Config {
    let mut config = base_config();
    config.device.org.channel = Some(2);
    // Custom interleaving puts the channel in the lowest post-offset bit.
    config.general.mapper = MapperKind::Custom;
    config
}

// ══════════════════════════════════════════════════════════
// 1. Routing
// ══════════════════════════════════════════════════════════

#[test]
fn requests_route_by_channel_coordinate() {
    let mut ctx = TestContext::with_config(two_channel_config());
    assert!(ctx.send(RequestKind::Read, 0x00)); // channel 0
    assert!(ctx.send(RequestKind::Read, 0x20)); // channel 1

    let controllers = ctx.memory.controllers();
    assert!(controllers[0].is_pending());
    assert!(controllers[1].is_pending());
}

#[test]
fn channels_drain_independently() {
    let mut ctx = TestContext::with_config(two_channel_config());
    assert!(ctx.send(RequestKind::Read, 0x20));
    let _ = ctx.run_to_idle(10_000);
    assert!(!ctx.memory.is_pending());
}

// ══════════════════════════════════════════════════════════
// 2. Counters (no double-count)
// ══════════════════════════════════════════════════════════

#[test]
fn counters_match_successful_sends() {
    let mut ctx = TestContext::new();
    let mut admitted = 0u64;
    let sends = [
        (RequestKind::Read, linear_addr(0, 0, 0, 0, 0)),
        (RequestKind::Write, linear_addr(0, 1, 0, 0, 0)),
        (RequestKind::PimMacAllBank, 0),
        (RequestKind::PimMacSameBank, 0),
        (RequestKind::PimMacPerBank, 0),
        (RequestKind::PimWriteGemvBuffer, 0),
        (RequestKind::PimMoveSoftmaxBuffer, 0),
        (RequestKind::PimMoveGemvBuffer, 0),
        (RequestKind::PimSoftmax, 0),
        (RequestKind::PimSetModel, 0),
        (RequestKind::PimSetHead, 0),
        (RequestKind::AllBankRefresh, 0),
    ];
    for (kind, addr) in sends {
        if ctx.send(kind, addr) && kind != RequestKind::PimBarrier {
            admitted += 1;
        }
    }
    // The barrier is admitted but never counted.
    assert!(ctx.send(RequestKind::PimBarrier, 0));

    let stats = ctx.memory.stats();
    assert_eq!(stats.total_requests(), admitted);
    assert_eq!(stats.num_read_requests, 1);
    assert_eq!(stats.num_write_requests, 1);
    assert_eq!(stats.num_pim_mac_all_bank_requests, 1);
    assert_eq!(stats.num_pim_softmax_requests, 1);
    assert_eq!(stats.num_other_requests, 1);
}

#[test]
fn refused_sends_are_not_counted() {
    let mut config = base_config();
    config.controller.queue_capacity = 2;
    let mut ctx = TestContext::with_config(config);

    let mut admitted = 0;
    for row in 0..5u64 {
        if ctx.send(RequestKind::Write, linear_addr(0, 0, 0, row, 0)) {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 2);
    assert_eq!(ctx.memory.stats().num_write_requests, 2);
    assert_eq!(ctx.memory.stats().total_requests(), 2);
}

// ══════════════════════════════════════════════════════════
// 3. Clock and pendency
// ══════════════════════════════════════════════════════════

#[test]
fn cycles_advance_with_ticks() {
    let mut ctx = TestContext::new();
    ctx.run(17);
    assert_eq!(ctx.memory.clk(), 17);
    assert_eq!(ctx.memory.stats().memory_system_cycles, 17);
}

#[test]
fn is_pending_reflects_outstanding_work() {
    let mut ctx = TestContext::new();
    assert!(!ctx.memory.is_pending());
    assert!(ctx.send(RequestKind::PimSetHead, 0));
    assert!(ctx.memory.is_pending());
    let _ = ctx.run_to_idle(1_000);
    assert!(!ctx.memory.is_pending());
}

#[test]
fn tck_follows_the_qdr_rate() {
    let ctx = TestContext::new();
    assert!((ctx.memory.tck_ns() - 0.625).abs() < 1e-9);
}
