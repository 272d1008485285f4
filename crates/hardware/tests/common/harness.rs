use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use hbmsim_core::config::Config;
use hbmsim_core::device::{AddrVec, Command, CommandKind, Device, IssueRecord, Level, NUM_LEVELS};
use hbmsim_core::request::{Request, RequestKind};
use hbmsim_core::{MemorySystem, Simulator, TraceFrontend};

/// Default test configuration: HBM3_2Gb_1R at 6.4 Gbps with the command log
/// enabled. One channel, two pseudo-channels, 4 bank groups x 4 banks.
pub fn base_config() -> Config {
    let mut config = Config::default();
    config.general.log_commands = true;
    config
}

/// Builds a bare device from the default test configuration.
pub fn device() -> Device {
    let mut dev = Device::new(&base_config().device).unwrap();
    dev.enable_command_log();
    dev
}

/// Ticks a device up to (and including) the given cycle.
pub fn tick_to(dev: &mut Device, cycle: u64) {
    while dev.clk() < cycle {
        dev.tick();
    }
}

/// Hierarchy address on channel 0 with column 0.
pub fn av(pch: usize, bg: usize, bank: usize, row: usize) -> AddrVec {
    let mut vec = [0; NUM_LEVELS];
    vec[Level::PseudoChannel as usize] = pch;
    vec[Level::BankGroup as usize] = bg;
    vec[Level::Bank as usize] = bank;
    vec[Level::Row as usize] = row;
    vec
}

/// Composes a flat address for the linear mapper under the default
/// organization (bits, low to high: col 5, row 13, bank 2, bg 2, pch 1;
/// 5 transaction-offset bits below).
pub fn linear_addr(pch: u64, bg: u64, bank: u64, row: u64, col: u64) -> u64 {
    ((((pch << 2 | bg) << 2 | bank) << 13 | row) << 5 | col) << 5
}

/// A memory system under test, with convenience accessors over the command
/// log.
pub struct TestContext {
    pub memory: MemorySystem,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(base_config())
    }

    pub fn with_config(config: Config) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Self {
            memory: MemorySystem::new(&config).unwrap(),
        }
    }

    /// Sends one request; true on admission.
    pub fn send(&mut self, kind: RequestKind, addr: u64) -> bool {
        self.memory.send(Request::new(addr, kind)).is_ok()
    }

    /// Sends a read whose departure cycle is pushed into the shared vec.
    pub fn send_read_with_departs(&mut self, addr: u64, departs: &Rc<RefCell<Vec<u64>>>) -> bool {
        let sink = Rc::clone(departs);
        let req = Request::new(addr, RequestKind::Read)
            .with_callback(Box::new(move |r| sink.borrow_mut().push(r.depart)));
        self.memory.send(req).is_ok()
    }

    /// Advances the memory system by `cycles`.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.memory.tick();
        }
    }

    /// Runs until no controller holds work; panics after `cap` cycles.
    pub fn run_to_idle(&mut self, cap: u64) -> u64 {
        let start = self.memory.clk();
        while self.memory.is_pending() {
            assert!(
                self.memory.clk() - start < cap,
                "memory system still pending after {cap} cycles"
            );
            self.memory.tick();
        }
        self.memory.clk()
    }

    /// Snapshot of the command log.
    pub fn log(&self) -> Vec<IssueRecord> {
        self.memory.device().command_log().unwrap().to_vec()
    }

    /// All issues of one command, in order.
    pub fn issues(&self, cmd: Command) -> Vec<IssueRecord> {
        self.log()
            .into_iter()
            .filter(|r| r.command == cmd)
            .collect()
    }

    /// The sole issue of one command; panics when absent or repeated.
    pub fn only_issue(&self, cmd: Command) -> IssueRecord {
        let found = self.issues(cmd);
        assert_eq!(found.len(), 1, "expected exactly one {cmd}, got {found:?}");
        found[0]
    }
}

/// Runs a trace to completion against the default configuration and returns
/// the finished simulator.
pub fn run_trace(lines: &str) -> Simulator {
    run_trace_with(lines, base_config())
}

/// Runs a trace to completion against the given configuration.
pub fn run_trace_with(lines: &str, config: Config) -> Simulator {
    let memory = MemorySystem::new(&config).unwrap();
    let frontend = TraceFrontend::from_lines(lines, "test-trace").unwrap();
    let mut sim = Simulator::new(frontend, memory);
    for _ in 0..1_000_000u64 {
        if sim.finished() {
            break;
        }
        sim.tick();
    }
    assert!(sim.finished(), "trace did not drain within 1M cycles");
    sim
}

/// Asserts the dual-issue invariant over a command log: per channel and
/// cycle at most two commands, and a pair is always one row-type plus one
/// column-type.
pub fn assert_dual_issue_disjoint(log: &[IssueRecord]) {
    let mut per_cycle: HashMap<(u64, usize), Vec<Command>> = HashMap::new();
    for record in log {
        per_cycle
            .entry((record.cycle, record.addr_vec[Level::Channel as usize]))
            .or_default()
            .push(record.command);
    }
    for ((cycle, channel), cmds) in per_cycle {
        assert!(
            cmds.len() <= 2,
            "channel {channel} issued {cmds:?} in cycle {cycle}"
        );
        if let [first, second] = cmds[..] {
            let kinds = (first.kind(), second.kind());
            assert!(
                matches!(
                    kinds,
                    (Some(CommandKind::Row), Some(CommandKind::Column))
                        | (Some(CommandKind::Column), Some(CommandKind::Row))
                ),
                "channel {channel} issued two same-kind commands {first} and {second} in cycle {cycle}"
            );
        }
    }
}
