//! Setup-time error definitions.
//!
//! The simulator is deterministic: every error that can occur is a setup
//! defect (bad preset, inconsistent organization, malformed trace), surfaced
//! before the first simulated cycle. It provides:
//! 1. **Configuration errors:** unknown presets, density mismatches, missing timings.
//! 2. **Trace errors:** unreadable files and malformed trace lines.
//!
//! Runtime back-pressure (a full request buffer) is not an error; it is
//! reported through `send` return values and retried by the frontend.

use thiserror::Error;

/// Errors raised while building the device, mapper, or trace frontend.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The named organization preset does not exist.
    #[error("unrecognized organization preset \"{0}\"")]
    UnknownOrgPreset(String),

    /// The named timing preset does not exist.
    #[error("unrecognized timing preset \"{0}\"")]
    UnknownTimingPreset(String),

    /// A `rate` override was supplied together with a timing preset.
    #[error("cannot change the transfer rate when a timing preset is selected")]
    RatePresetConflict,

    /// No timing preset was selected and no `rate` was provided.
    #[error("timing requires either a preset or an explicit rate")]
    MissingRate,

    /// The transfer rate cannot produce a QDR command clock.
    #[error("transfer rate {0} MT/s is too low for a QDR command clock")]
    InvalidRate(u64),

    /// The per-level counts do not multiply out to the configured density.
    #[error("calculated channel density {calculated} Mb does not equal the configured density {configured} Mb")]
    DensityMismatch {
        /// Density implied by the level counts, DQ width, and prefetch size.
        calculated: u64,
        /// Density stated by the preset or override.
        configured: u64,
    },

    /// A timing value was still unset after presets, derivation, and overrides.
    #[error("timing {0} is not specified")]
    MissingTiming(&'static str),

    /// A timing override referred to a name outside the timing alphabet.
    #[error("unknown timing override \"{0}\"")]
    UnknownTiming(String),

    /// The refresh-interval tables carry no row for this density.
    #[error("no tRFC entry for density {0} Mb")]
    UnknownDensity(u64),

    /// The refresh-interval tables carry no column for this stack height.
    #[error("no tREFISB entry for {0} rank(s)")]
    UnknownStackHeight(usize),

    /// A hierarchy level has no entries at all.
    #[error("organization level {level} count must be at least 1")]
    InvalidLevelCount {
        /// Name of the offending level.
        level: &'static str,
    },

    /// The clock ratio must be a positive integer.
    #[error("clock ratio must be at least 1")]
    InvalidClockRatio,

    /// The trace file could not be read.
    #[error("trace {path} cannot be opened: {source}")]
    TraceIo {
        /// Path of the trace file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A trace line did not match `<OP> <addr>`.
    #[error("trace {path}: line {line}: {reason}")]
    MalformedTrace {
        /// Path of the trace file.
        path: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
}
