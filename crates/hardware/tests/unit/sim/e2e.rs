//! End-to-End Trace Scenarios.
//!
//! Full simulator runs (trace frontend + memory system) against the
//! HBM3_2Gb_1R organization at 6.4 Gbps. Assertions are on cycle *deltas*
//! between logged command issues, so they track the preset timing values.

use pretty_assertions::assert_eq;

use hbmsim_core::Simulator;
use hbmsim_core::device::{BankState, Command, IssueRecord, Level};

use crate::common::harness::{assert_dual_issue_disjoint, run_trace};

fn log(sim: &Simulator) -> Vec<IssueRecord> {
    sim.memory.device().command_log().unwrap().to_vec()
}

fn issues(sim: &Simulator, cmd: Command) -> Vec<IssueRecord> {
    log(sim).into_iter().filter(|r| r.command == cmd).collect()
}

// ══════════════════════════════════════════════════════════
// 1. Single read, cold bank
// ══════════════════════════════════════════════════════════

#[test]
fn cold_read_activates_then_reads() {
    let sim = run_trace("LD 0x0\n");
    let t = *sim.memory.device().timing();

    let entries = log(&sim);
    assert_eq!(entries.len(), 2);
    let (act, rd) = (entries[0], entries[1]);
    assert_eq!(act.command, Command::Act);
    assert_eq!(rd.command, Command::Rd);
    assert_eq!(rd.cycle, act.cycle + t.n_rcdrd);

    // The run ends exactly when the read's data departs.
    assert_eq!(sim.memory.clk(), rd.cycle + t.read_latency());
    assert_eq!(sim.memory.stats().num_read_requests, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Read row hit
// ══════════════════════════════════════════════════════════

#[test]
fn second_read_hits_the_open_row() {
    // 0x40 is the next column of the same row.
    let sim = run_trace("LD 0x0\nLD 0x40\n");
    let t = *sim.memory.device().timing();

    let acts = issues(&sim, Command::Act);
    let rds = issues(&sim, Command::Rd);
    assert_eq!(acts.len(), 1, "a row hit needs no second ACT");
    assert_eq!(rds.len(), 2);
    // Same bank group: back-to-back reads pace at nCCDL.
    assert_eq!(rds[1].cycle, rds[0].cycle + t.n_ccdl);
}

// ══════════════════════════════════════════════════════════
// 3. Write after read, same bank, different row
// ══════════════════════════════════════════════════════════

#[test]
fn row_conflict_write_precharges_and_reactivates() {
    // 0x40000 maps to row 256 of the same bank as 0x0.
    let sim = run_trace("LD 0x0\nST 0x40000\n");
    let t = *sim.memory.device().timing();

    let entries = log(&sim);
    let cmds: Vec<Command> = entries.iter().map(|r| r.command).collect();
    assert_eq!(
        cmds,
        [
            Command::Act,
            Command::Rd,
            Command::Pre,
            Command::Act,
            Command::Wr
        ]
    );

    let (act1, rd, pre, act2, wr) = (
        entries[0], entries[1], entries[2], entries[3], entries[4],
    );
    assert_eq!(rd.cycle, act1.cycle + t.n_rcdrd);
    // The precharge waits out nRAS (which dominates RD + nRTPL here).
    assert_eq!(pre.cycle, act1.cycle + t.n_ras);
    assert_eq!(act2.cycle, pre.cycle + t.n_rp);
    assert_eq!(wr.cycle, act2.cycle + t.n_rcdwr);
}

// ══════════════════════════════════════════════════════════
// 4. All-bank PIM MAC
// ══════════════════════════════════════════════════════════

#[test]
fn all_bank_mac_opens_every_bank_then_macs() {
    let sim = run_trace("PIM_MAC_AB 0x0\n");
    let t = *sim.memory.device().timing();

    let entries = log(&sim);
    assert_eq!(entries.len(), 2);
    let (actab, macab) = (entries[0], entries[1]);
    assert_eq!(actab.command, Command::Actab);
    assert_eq!(macab.command, Command::Macab);
    assert_eq!(macab.cycle, actab.cycle + t.n_rcdrd);

    // Every bank of pseudo-channel 0 was opened by the broadcast.
    let dev = sim.memory.device();
    for bg in 0..4 {
        for bank in 0..4 {
            let mut addr_vec = [0; 7];
            addr_vec[Level::BankGroup as usize] = bg;
            addr_vec[Level::Bank as usize] = bank;
            assert_eq!(dev.bank_state(&addr_vec), BankState::Opened(0));
        }
    }
    assert_eq!(sim.memory.stats().num_pim_mac_all_bank_requests, 1);
}

#[test]
fn back_to_back_all_bank_macs_pace_at_ccdab() {
    let sim = run_trace("PIM_MAC_AB 0x0\nPIM_MAC_AB 0x0\n");
    let t = *sim.memory.device().timing();

    let macs = issues(&sim, Command::Macab);
    assert_eq!(macs.len(), 2);
    assert_eq!(issues(&sim, Command::Actab).len(), 1, "banks stay open");
    assert_eq!(macs[1].cycle, macs[0].cycle + t.n_ccdab);
}

// ══════════════════════════════════════════════════════════
// 5. Barrier ordering between PIM kernels
// ══════════════════════════════════════════════════════════

#[test]
fn barrier_fences_the_next_pim_kernel() {
    let sim = run_trace("PIM_MAC_SB 0x0\nPIM_BARRIER 0\nPIM_MAC_AB 0x0\n");
    let t = *sim.memory.device().timing();

    let entries = log(&sim);
    let cmds: Vec<Command> = entries.iter().map(|r| r.command).collect();
    assert_eq!(
        cmds,
        [
            Command::Actsb,
            Command::Macsb,
            Command::Actab,
            Command::Macab
        ]
    );

    // The all-bank MAC (an access) never issues before the same-bank MAC
    // ahead of the barrier, even though its activate was ready far earlier.
    let macsb = entries[1];
    let macab = entries[3];
    assert!(macab.cycle > macsb.cycle);
    assert_eq!(entries[1].cycle, entries[0].cycle + t.n_rcdrd);
    assert_eq!(entries[3].cycle, entries[2].cycle + t.n_rcdrd);
}

#[test]
fn ordinary_reads_are_not_fenced_by_pim_barriers() {
    // Barriers order work within the PIM buffer only: the LD lands in the
    // read buffer and proceeds regardless of the fence ahead of it in the
    // trace.
    let sim = run_trace("PIM_MAC_SB 0x0\nPIM_BARRIER 0\nLD 0x0\n");
    let t = *sim.memory.device().timing();

    let actsbs = issues(&sim, Command::Actsb);
    let rds = issues(&sim, Command::Rd);
    let macsbs = issues(&sim, Command::Macsb);
    assert_eq!(actsbs.len(), 1);
    assert_eq!(rds.len(), 1);
    assert_eq!(macsbs.len(), 1);

    // The broadcast activate opened the read's row, so the read needs no
    // ACT of its own and dual-issues alongside the ACTSB — well before the
    // fenced MAC completes.
    assert!(issues(&sim, Command::Act).is_empty());
    assert_eq!(rds[0].cycle, actsbs[0].cycle);
    assert!(rds[0].cycle < macsbs[0].cycle);
    assert_eq!(macsbs[0].cycle, actsbs[0].cycle + t.n_rcdrd);
}

#[test]
fn trailing_barrier_drains_cleanly() {
    let sim = run_trace("PIM_SET_MODEL 0x0\nPIM_BARRIER 0\n");
    assert!(sim.finished());
    assert_eq!(issues(&sim, Command::Setm).len(), 1);
    // Barriers are never issued to the device and never counted.
    assert_eq!(sim.memory.stats().total_requests(), 1);
}

// ══════════════════════════════════════════════════════════
// 6. Mixed stress: invariants hold end to end
// ══════════════════════════════════════════════════════════

#[test]
fn mixed_trace_drains_with_disjoint_dual_issue() {
    let text = "\
LD 0x0
ST 0x2000040
PIM_WR_GB 0x4000000
PIM_MAC_SB 0x0
PIM_BARRIER 0
PIM_MV_SB 0x4000000
PIM_SFM 0x4000000
LD 0x2000000
PIM_SET_MODEL 0x0
PIM_SET_HEAD 0x0
ST 0x6000040
LD 0x40
";
    let sim = run_trace(text);
    assert!(sim.finished());
    assert_dual_issue_disjoint(&log(&sim));

    let stats = sim.memory.stats();
    assert_eq!(stats.num_read_requests, 3);
    assert_eq!(stats.num_write_requests, 2);
    assert_eq!(stats.num_pim_mac_same_bank_requests, 1);
    assert_eq!(stats.num_pim_write_to_gemv_buffer_requests, 1);
    assert_eq!(stats.num_pim_move_to_softmax_buffer_requests, 1);
    assert_eq!(stats.num_pim_softmax_requests, 1);
    assert_eq!(stats.num_pim_set_model_requests, 1);
    assert_eq!(stats.num_pim_set_head_requests, 1);
    // 12 lines, one barrier: 11 counted requests.
    assert_eq!(stats.total_requests(), 11);
}
