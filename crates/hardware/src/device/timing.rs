//! Timing parameters and the timing-constraint graph.
//!
//! This module provides:
//! 1. **Presets:** rate-indexed HBM3 timing tables (QDR DQ: `tCK` is derived
//!    from a quarter of the transfer rate). `_NPC` variants relax the
//!    power-constrained MAC-to-MAC spacings (`nCCDAB`/`nCCDSB`).
//! 2. **Resolution:** preset + rate selection, refresh derivation from the
//!    density tables, and per-timing overrides in cycles (`nXXX`) or
//!    nanoseconds (`tXXX`, JEDEC-rounded).
//! 3. **Constraint graph:** edges `(level, preceding) → (following, latency,
//!    window)` grouped so an issue touches finitely many future-ready cells.
//!
//! Timing sources: JESD238A structure with absolute values carried over from
//! published HBM2 parameters where HBM3 figures are not public.

use crate::common::ConfigError;
use crate::config::TimingConfig;

use super::command::{Command, NUM_COMMANDS};
use super::level::Level;
use super::organization::Organization;

/// Number of named timing parameters.
pub const NUM_TIMINGS: usize = 28;

/// Timing parameter names, in table order. `rate` and `tCK_ps` are not
/// overridable; everything else accepts `nXXX` (cycles) or `tXXX` (ns).
pub const TIMING_NAMES: [&str; NUM_TIMINGS] = [
    "rate", "nBL", "nCL", "nRCDRD", "nRCDWR", "nRP", "nRAS", "nRC", "nWR", "nRTPS", "nRTPL",
    "nCWL", "nCCDS", "nCCDL", "nCCDAB", "nCCDSB", "nRRDS", "nRRDL", "nWTRS", "nWTRL", "nRTW",
    "nFAW", "nRFC", "nRFCSB", "nREFI", "nREFISB", "nRREFD", "tCK_ps",
];

/// Timing presets. `-1` marks values derived later (`nRFC`, `nREFISB`).
const TIMING_PRESETS: &[(&str, [i64; NUM_TIMINGS])] = &[
    ("HBM3_4.8Gbps",     [4800, 2, 17, 17, 17, 17, 41, 58, 20, 5, 8, 5, 2, 4, 6, 6, 2, 4, 8, 10, 3, 36, -1, 240, 4680, -1, 10, 1200]),
    ("HBM3_4.8Gbps_NPC", [4800, 2, 17, 17, 17, 17, 41, 58, 20, 5, 8, 5, 2, 4, 4, 4, 2, 4, 8, 10, 3, 36, -1, 240, 4680, -1, 10, 1200]),
    ("HBM3_5.2Gbps",     [5200, 2, 19, 19, 19, 19, 45, 63, 21, 6, 8, 6, 2, 4, 6, 6, 2, 4, 8, 11, 3, 39, -1, 260, 5070, -1, 11, 1300]),
    ("HBM3_5.2Gbps_NPC", [5200, 2, 19, 19, 19, 19, 45, 63, 21, 6, 8, 6, 2, 4, 4, 4, 2, 4, 8, 11, 3, 39, -1, 260, 5070, -1, 11, 1300]),
    ("HBM3_5.6Gbps",     [5600, 2, 20, 20, 20, 20, 48, 68, 23, 6, 9, 6, 2, 4, 6, 7, 2, 4, 9, 12, 3, 42, -1, 280, 5460, -1, 12, 1400]),
    ("HBM3_5.6Gbps_NPC", [5600, 2, 20, 20, 20, 20, 48, 68, 23, 6, 9, 6, 2, 4, 4, 4, 2, 4, 9, 12, 3, 42, -1, 280, 5460, -1, 12, 1400]),
    ("HBM3_6.0Gbps",     [6000, 2, 21, 21, 21, 21, 51, 72, 24, 6, 9, 6, 2, 4, 6, 7, 2, 4, 9, 12, 3, 45, -1, 300, 5850, -1, 12, 1500]),
    ("HBM3_6.0Gbps_NPC", [6000, 2, 21, 21, 21, 21, 51, 72, 24, 6, 9, 6, 2, 4, 4, 4, 2, 4, 9, 12, 3, 45, -1, 300, 5850, -1, 12, 1500]),
    ("HBM3_6.4Gbps",     [6400, 2, 23, 23, 23, 23, 55, 77, 26, 7, 10, 7, 2, 4, 7, 8, 2, 4, 10, 13, 3, 48, -1, 320, 6240, -1, 13, 1600]),
    ("HBM3_6.4Gbps_NPC", [6400, 2, 23, 23, 23, 23, 55, 77, 26, 7, 10, 7, 2, 4, 4, 4, 2, 4, 10, 13, 3, 48, -1, 320, 6240, -1, 13, 1600]),
];

/// tRFC by per-channel density, in nanoseconds.
fn t_rfc_ns(density_mbit: u64) -> Result<u64, ConfigError> {
    match density_mbit {
        2048 => Ok(160),
        4096 => Ok(260),
        6144 => Ok(310),
        8192 => Ok(350),
        12288 => Ok(410),
        16384 => Ok(450),
        24576 => Ok(610),
        32768 => Ok(650),
        other => Err(ConfigError::UnknownDensity(other)),
    }
}

/// tREFISB by rank count (4/8/12/16-Hi stacks), in nanoseconds.
fn t_refisb_ns(ranks: usize) -> Result<u64, ConfigError> {
    match ranks {
        1 => Ok(244),
        2 => Ok(122),
        3 => Ok(82),
        4 => Ok(61),
        other => Err(ConfigError::UnknownStackHeight(other)),
    }
}

/// JEDEC rounding: a duration in nanoseconds rounded *up* to whole cycles.
#[inline]
pub fn jedec_round(nanoseconds: f64, t_ck_ps: u64) -> u64 {
    ((nanoseconds * 1000.0) / t_ck_ps as f64).ceil() as u64
}

/// Fully resolved timing parameters, all in cycles except `rate` (MT/s) and
/// `t_ck_ps` (picoseconds).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)] // Field names are the JEDEC mnemonics in TIMING_NAMES.
pub struct TimingVals {
    pub rate: u64,
    pub n_bl: u64,
    pub n_cl: u64,
    pub n_rcdrd: u64,
    pub n_rcdwr: u64,
    pub n_rp: u64,
    pub n_ras: u64,
    pub n_rc: u64,
    pub n_wr: u64,
    pub n_rtps: u64,
    pub n_rtpl: u64,
    pub n_cwl: u64,
    pub n_ccds: u64,
    pub n_ccdl: u64,
    pub n_ccdab: u64,
    pub n_ccdsb: u64,
    pub n_rrds: u64,
    pub n_rrdl: u64,
    pub n_wtrs: u64,
    pub n_wtrl: u64,
    pub n_rtw: u64,
    pub n_faw: u64,
    pub n_rfc: u64,
    pub n_rfcsb: u64,
    pub n_refi: u64,
    pub n_refisb: u64,
    pub n_rrefd: u64,
    pub t_ck_ps: u64,
}

impl TimingVals {
    /// Resolves timing values: preset (or bare rate), QDR `tCK` computation,
    /// refresh derivation from the density/stack tables, then overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown preset, a `rate` override on
    /// top of a preset, an unknown override name, a missing refresh table
    /// entry, or any timing left unspecified.
    pub fn resolve(cfg: &TimingConfig, org: &Organization) -> Result<Self, ConfigError> {
        let mut vals: [i64; NUM_TIMINGS] = [-1; NUM_TIMINGS];

        if let Some(name) = &cfg.preset {
            let row = TIMING_PRESETS
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .ok_or_else(|| ConfigError::UnknownTimingPreset(name.clone()))?;
            vals = row.1;
            if cfg.rate.is_some() {
                return Err(ConfigError::RatePresetConflict);
            }
        } else if let Some(rate) = cfg.rate {
            vals[0] = rate as i64;
        } else {
            return Err(ConfigError::MissingRate);
        }

        // QDR DQ pins: the command clock runs at a quarter of the data rate.
        let rate = vals[0] as u64;
        if rate < 4 {
            return Err(ConfigError::InvalidRate(rate));
        }
        let t_ck_ps = 1_000_000 / (rate / 4);
        vals[NUM_TIMINGS - 1] = t_ck_ps as i64;

        vals[timing_index("nRFC")] = jedec_round(t_rfc_ns(org.density_mbit)? as f64, t_ck_ps) as i64;
        vals[timing_index("nREFISB")] =
            jedec_round(t_refisb_ns(org.count(Level::Rank))? as f64, t_ck_ps) as i64;

        // Overwrite with user-provided values; rate and tCK stay fixed.
        for (name, &cycles) in &cfg.cycles {
            vals[override_index(name)?] = cycles as i64;
        }
        for (name, &ns) in &cfg.nanos {
            let cycle_name = name
                .strip_prefix('t')
                .map(|rest| format!("n{rest}"))
                .ok_or_else(|| ConfigError::UnknownTiming(name.clone()))?;
            vals[override_index(&cycle_name)?] = jedec_round(ns, t_ck_ps) as i64;
        }

        for (idx, &v) in vals.iter().enumerate() {
            if v < 0 {
                return Err(ConfigError::MissingTiming(TIMING_NAMES[idx]));
            }
        }

        let v = |name: &str| vals[timing_index(name)] as u64;
        Ok(Self {
            rate,
            n_bl: v("nBL"),
            n_cl: v("nCL"),
            n_rcdrd: v("nRCDRD"),
            n_rcdwr: v("nRCDWR"),
            n_rp: v("nRP"),
            n_ras: v("nRAS"),
            n_rc: v("nRC"),
            n_wr: v("nWR"),
            n_rtps: v("nRTPS"),
            n_rtpl: v("nRTPL"),
            n_cwl: v("nCWL"),
            n_ccds: v("nCCDS"),
            n_ccdl: v("nCCDL"),
            n_ccdab: v("nCCDAB"),
            n_ccdsb: v("nCCDSB"),
            n_rrds: v("nRRDS"),
            n_rrdl: v("nRRDL"),
            n_wtrs: v("nWTRS"),
            n_wtrl: v("nWTRL"),
            n_rtw: v("nRTW"),
            n_faw: v("nFAW"),
            n_rfc: v("nRFC"),
            n_rfcsb: v("nRFCSB"),
            n_refi: v("nREFI"),
            n_refisb: v("nREFISB"),
            n_rrefd: v("nRREFD"),
            t_ck_ps,
        })
    }

    /// Read latency: column command to first data beat.
    #[inline]
    pub const fn read_latency(&self) -> u64 {
        self.n_cl + self.n_bl
    }

    /// Names of all known timing presets.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        TIMING_PRESETS.iter().map(|(name, _)| *name)
    }
}

/// Index of a timing name in table order. Unknown names panic; only used
/// with literal names internal to this module.
fn timing_index(name: &str) -> usize {
    TIMING_NAMES
        .iter()
        .position(|&n| n == name)
        .unwrap_or(usize::MAX)
}

/// Index of a user-overridable timing name (`rate` and `tCK_ps` excluded).
fn override_index(name: &str) -> Result<usize, ConfigError> {
    match TIMING_NAMES.iter().position(|&n| n == name) {
        Some(idx) if idx != 0 && idx != NUM_TIMINGS - 1 => Ok(idx),
        _ => Err(ConfigError::UnknownTiming(name.to_owned())),
    }
}

/// One outgoing timing edge: after the preceding command issues at a node,
/// `following` becomes legal there no earlier than `issue + latency`.
/// A nonzero `window` makes the constraint sliding: the floor is set by the
/// `window`-th most recent issue rather than the latest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingEdge {
    /// Command whose future-ready time this edge raises.
    pub following: Command,
    /// Minimum spacing in cycles.
    pub latency: u64,
    /// Sliding-window width; 0 for plain edges.
    pub window: usize,
}

/// Number of materialized node levels (channel through bank).
pub const NUM_NODE_LEVELS: usize = Level::Bank as usize + 1;

/// The timing-constraint graph, grouped by `(level, preceding command)`.
#[derive(Debug)]
pub struct TimingCons {
    groups: Vec<Vec<TimingEdge>>,
    max_window: Vec<usize>,
}

/// Commands sharing the pseudo-channel data path (DQ and the GEMV/softmax
/// buffer ports); they contend for bus occupancy at every level.
const DATA_PATH: [Command; 6] = [
    Command::Wrgb,
    Command::Mvsb,
    Command::Mvgb,
    Command::Sfm,
    Command::Rd,
    Command::Wr,
];

impl TimingCons {
    /// Builds the full constraint graph from resolved timing values.
    pub fn new(t: &TimingVals) -> Self {
        let mut cons = Self {
            groups: vec![Vec::new(); NUM_NODE_LEVELS * NUM_COMMANDS],
            max_window: vec![0; NUM_NODE_LEVELS * NUM_COMMANDS],
        };
        use Command::{
            Act, Actab, Actpb, Actsb, Macab, Macpb, Macsb, Pre, Prea, Prepb, Presb, Rd, Refab,
            Refsb, Wr,
        };
        use Level::{Bank, BankGroup, Channel, PseudoChannel, Rank};

        // ── Channel: 2-cycle row commands and all-bank / per-pCH MAC rates ──
        cons.add(Channel, &[Act], &[Act, Pre, Prea, Presb, Refab, Refsb], 2);
        cons.add(Channel, &[Actab], &[Actab, Act, Pre, Prea, Refab, Refsb], 2);
        cons.add(Channel, &[Actab], &[Actab], t.n_rc);
        cons.add(Channel, &[Actab], &[Macab], t.n_rcdrd);
        cons.add(Channel, &[Actab], &[Prea], t.n_ras);
        cons.add(Channel, &[Macab], &[Macab], t.n_ccdab);
        cons.add(Channel, &[Macab], &[Prea], t.n_rtpl);
        cons.add(Channel, &[Prea], &[Actab], t.n_rp);
        cons.add(Channel, &[Actsb], &[Actsb, Act, Pre, Prea, Presb, Refab, Refsb], 2);
        cons.add(Channel, &[Macsb], &[Macsb], t.n_ccdsb);
        cons.add(Channel, &[Actpb], &[Actpb, Act, Pre, Prea, Prepb, Refab, Refsb], 2);
        cons.add(Channel, &[Macpb], &[Macpb], t.n_bl);

        // ── Pseudo-channel: data-bus occupancy, CAS↔PREA, RAS↔REF ──
        cons.add(PseudoChannel, &DATA_PATH, &DATA_PATH, t.n_bl);
        cons.add(PseudoChannel, &[Rd], &[Prea], t.n_rtps);
        cons.add(PseudoChannel, &[Wr], &[Prea], t.n_cwl + t.n_bl + t.n_wr);
        cons.add(PseudoChannel, &[Act], &[Prea], t.n_ras);
        cons.add(PseudoChannel, &[Prea], &[Act], t.n_rp);
        cons.add(PseudoChannel, &[Act], &[Refab], t.n_rc);
        cons.add(PseudoChannel, &[Pre, Prea], &[Refab], t.n_rp);
        cons.add(PseudoChannel, &[Refab], &[Act, Refsb], t.n_rfc);
        cons.add(PseudoChannel, &[Actab], &[Refab], t.n_rc);
        cons.add(PseudoChannel, &[Refab], &[Actab], t.n_rfc);
        cons.add(PseudoChannel, &[Actsb], &[Refab], t.n_rc);
        cons.add(PseudoChannel, &[Presb], &[Refab], t.n_rp);
        cons.add(PseudoChannel, &[Refab], &[Actsb], t.n_rfc);
        cons.add(PseudoChannel, &[Actpb], &[Refab], t.n_rc);
        cons.add(PseudoChannel, &[Prepb], &[Refab], t.n_rp);
        cons.add(PseudoChannel, &[Refab], &[Actpb], t.n_rfc);

        // ── Rank: cross-bank-group spacings and the four-activation window ──
        cons.add(Rank, &DATA_PATH, &DATA_PATH, t.n_ccds);
        // Minimum read-to-write turnaround, assuming tWPRE = 1 tCK.
        cons.add(Rank, &[Rd], &[Wr], (t.n_cl + t.n_bl + 2).saturating_sub(t.n_cwl));
        cons.add(Rank, &[Wr], &[Rd], t.n_cwl + t.n_bl + t.n_wtrs);
        cons.add(Rank, &[Act], &[Act], t.n_rrds);
        cons.add_windowed(Rank, Act, Act, t.n_faw, 4);
        cons.add(Rank, &[Act], &[Prea], t.n_ras);
        cons.add(Rank, &[Prea], &[Act], t.n_rp);
        // ACT lands on its second cycle, so REFsb spacing gains a cycle.
        cons.add(Rank, &[Act], &[Refsb], t.n_rrds + 1);
        cons.add(Rank, &[Refsb], &[Refsb], t.n_rrefd);
        cons.add(Rank, &[Refsb], &[Act], t.n_rrefd.saturating_sub(1));
        cons.add(Rank, &[Macpb], &[Macpb], t.n_ccds);

        // ── Bank group: same-group spacings ──
        cons.add(BankGroup, &DATA_PATH, &DATA_PATH, t.n_ccdl);
        cons.add(BankGroup, &[Wr], &[Rd], t.n_cwl + t.n_bl + t.n_wtrl);
        cons.add(BankGroup, &[Act], &[Act], t.n_rrdl);
        cons.add(BankGroup, &[Act], &[Refsb], t.n_rrdl + 1);
        cons.add(BankGroup, &[Refsb], &[Act], t.n_rrdl.saturating_sub(1));
        cons.add(BankGroup, &[Macpb], &[Macpb], t.n_ccdl);

        // ── Bank: row cycle, RCD/RAS/RP/RTP, and the SB/PB MAC analogues ──
        cons.add(Bank, &[Act], &[Act], t.n_rc);
        cons.add(Bank, &[Act], &[Rd], t.n_rcdrd);
        cons.add(Bank, &[Act], &[Wr], t.n_rcdwr);
        cons.add(Bank, &[Act], &[Pre], t.n_ras);
        cons.add(Bank, &[Pre], &[Act], t.n_rp);
        cons.add(Bank, &[Rd], &[Pre], t.n_rtpl);
        cons.add(Bank, &[Wr], &[Pre], t.n_cwl + t.n_bl + t.n_wr);
        cons.add(Bank, &[Actsb], &[Actsb], t.n_rc);
        cons.add(Bank, &[Actsb], &[Macsb], t.n_rcdrd);
        cons.add(Bank, &[Actsb], &[Presb], t.n_ras);
        cons.add(Bank, &[Macsb], &[Presb], t.n_rtpl);
        cons.add(Bank, &[Presb], &[Actsb], t.n_rp);
        cons.add(Bank, &[Actpb], &[Actpb], t.n_rc);
        cons.add(Bank, &[Actpb], &[Macpb], t.n_rcdrd);
        cons.add(Bank, &[Actpb], &[Prepb], t.n_ras);
        cons.add(Bank, &[Macpb], &[Prepb], t.n_rtpl);
        cons.add(Bank, &[Prepb], &[Actpb], t.n_rp);

        cons
    }

    fn add(&mut self, level: Level, preceding: &[Command], following: &[Command], latency: u64) {
        for &pre in preceding {
            let group = &mut self.groups[Self::slot(level, pre)];
            for &fol in following {
                group.push(TimingEdge {
                    following: fol,
                    latency,
                    window: 0,
                });
            }
        }
    }

    fn add_windowed(
        &mut self,
        level: Level,
        preceding: Command,
        following: Command,
        latency: u64,
        window: usize,
    ) {
        let slot = Self::slot(level, preceding);
        self.groups[slot].push(TimingEdge {
            following,
            latency,
            window,
        });
        self.max_window[slot] = self.max_window[slot].max(window);
    }

    #[inline]
    fn slot(level: Level, cmd: Command) -> usize {
        (level as usize) * NUM_COMMANDS + cmd.index()
    }

    /// Edges triggered by issuing `cmd` at a node of `level`.
    #[inline]
    pub fn edges(&self, level: Level, cmd: Command) -> &[TimingEdge] {
        &self.groups[Self::slot(level, cmd)]
    }

    /// Widest sliding window among those edges (0 when none is windowed).
    #[inline]
    pub fn max_window(&self, level: Level, cmd: Command) -> usize {
        self.max_window[Self::slot(level, cmd)]
    }
}
