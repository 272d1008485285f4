//! Configuration system for the HBM3-PIM simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** baseline device and controller constants.
//! 2. **Structures:** hierarchical config for general, device (organization
//!    + timing), and controller settings.
//! 3. **Overrides:** per-level organization counts and per-timing values in
//!    cycles (`nXXX`) or nanoseconds (`tXXX`).
//!
//! Configuration is supplied as JSON, or use `Config::default()` for the CLI.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::device::Level;
use crate::mapper::MapperKind;

/// Default configuration constants.
mod defaults {
    /// Default organization preset (2 Gb single-rank stack).
    pub const ORG_PRESET: &str = "HBM3_2Gb_1R";

    /// Default channel width in bits.
    pub const CHANNEL_WIDTH: usize = 32;

    /// Default timing preset (6.4 Gbps DQ).
    pub const TIMING_PRESET: &str = "HBM3_6.4Gbps";

    /// Write-buffer occupancy below which the controller leaves write mode.
    pub const WR_LOW_WATERMARK: f32 = 0.2;

    /// Write-buffer occupancy above which the controller enters write mode.
    pub const WR_HIGH_WATERMARK: f32 = 0.8;

    /// Capacity of the active, read, write, and PIM buffers.
    pub const QUEUE_CAPACITY: usize = 32;

    /// Capacity of the priority (maintenance) buffer: three per-bank refresh
    /// generations for 512 banks plus slack.
    pub const PRIORITY_CAPACITY: usize = 512 * 3 + 32;

    /// Default frontend-to-memory clock ratio.
    pub const CLOCK_RATIO: u32 = 1;
}

/// Root configuration structure.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use hbmsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.device.org.preset, "HBM3_2Gb_1R");
/// assert_eq!(config.controller.queue_capacity, 32);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use hbmsim_core::config::Config;
/// use hbmsim_core::mapper::MapperKind;
///
/// let json = r#"{
///     "general": { "mapper": "Custom", "clock_ratio": 3 },
///     "device": {
///         "org": { "preset": "HBM3_8Gb_2R" },
///         "timing": {
///             "preset": "HBM3_6.4Gbps_NPC",
///             "cycles": { "nRCDRD": 24 },
///             "nanos": { "tRAS": 14.0 }
///         }
///     },
///     "controller": { "wr_high_watermark": 0.9 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.general.mapper, MapperKind::Custom);
/// assert_eq!(config.device.org.preset, "HBM3_8Gb_2R");
/// assert_eq!(config.device.timing.cycles["nRCDRD"], 24);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General run settings (mapper, clock ratio, command log).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Device organization and timing.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Controller buffers and watermarks.
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// General run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Address mapping scheme.
    #[serde(default)]
    pub mapper: MapperKind,

    /// Frontend-to-memory clock ratio (must be ≥ 1).
    #[serde(default = "GeneralConfig::default_clock_ratio")]
    pub clock_ratio: u32,

    /// Record every issued command with its cycle (the cycle timeline).
    #[serde(default)]
    pub log_commands: bool,
}

impl GeneralConfig {
    /// Returns the default clock ratio.
    fn default_clock_ratio() -> u32 {
        defaults::CLOCK_RATIO
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mapper: MapperKind::default(),
            clock_ratio: defaults::CLOCK_RATIO,
            log_commands: false,
        }
    }
}

/// Device configuration: organization plus timing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    /// Organization preset and overrides.
    #[serde(default)]
    pub org: OrgConfig,
    /// Timing preset and overrides.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Organization selection: a preset name plus optional overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgConfig {
    /// Organization preset name (see `Organization::preset_names`).
    #[serde(default = "OrgConfig::default_preset")]
    pub preset: String,

    /// Channel width in bits.
    #[serde(default = "OrgConfig::default_channel_width")]
    pub channel_width: usize,

    /// DQ pins per pseudo-channel override.
    #[serde(default)]
    pub dq: Option<usize>,

    /// Per-channel density override in megabits.
    #[serde(default)]
    pub density: Option<u64>,

    /// Channel count override.
    #[serde(default)]
    pub channel: Option<usize>,

    /// Pseudo-channel count override.
    #[serde(default)]
    pub pseudochannel: Option<usize>,

    /// Rank count override.
    #[serde(default)]
    pub rank: Option<usize>,

    /// Bank-group count override.
    #[serde(default)]
    pub bankgroup: Option<usize>,

    /// Bank count override.
    #[serde(default)]
    pub bank: Option<usize>,

    /// Row count override.
    #[serde(default)]
    pub row: Option<usize>,

    /// Column count override.
    #[serde(default)]
    pub column: Option<usize>,
}

impl OrgConfig {
    /// Returns the default organization preset name.
    fn default_preset() -> String {
        defaults::ORG_PRESET.to_owned()
    }

    /// Returns the default channel width.
    fn default_channel_width() -> usize {
        defaults::CHANNEL_WIDTH
    }

    /// The count override for one level, if configured.
    pub const fn count_override(&self, level: Level) -> Option<usize> {
        match level {
            Level::Channel => self.channel,
            Level::PseudoChannel => self.pseudochannel,
            Level::Rank => self.rank,
            Level::BankGroup => self.bankgroup,
            Level::Bank => self.bank,
            Level::Row => self.row,
            Level::Column => self.column,
        }
    }
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            preset: defaults::ORG_PRESET.to_owned(),
            channel_width: defaults::CHANNEL_WIDTH,
            dq: None,
            density: None,
            channel: None,
            pseudochannel: None,
            rank: None,
            bankgroup: None,
            bank: None,
            row: None,
            column: None,
        }
    }
}

/// Timing selection: a preset (or bare rate) plus optional overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Timing preset name (see `TimingVals::preset_names`). Set to `null`
    /// with an explicit `rate` to configure every timing by hand.
    #[serde(default = "TimingConfig::default_preset")]
    pub preset: Option<String>,

    /// Transfer rate in MT/s; only valid without a preset.
    #[serde(default)]
    pub rate: Option<u64>,

    /// Cycle-count overrides keyed by `nXXX` name.
    #[serde(default)]
    pub cycles: BTreeMap<String, u64>,

    /// Nanosecond overrides keyed by `tXXX` name, rounded up to cycles.
    #[serde(default)]
    pub nanos: BTreeMap<String, f64>,
}

impl TimingConfig {
    /// Returns the default timing preset name.
    fn default_preset() -> Option<String> {
        Some(defaults::TIMING_PRESET.to_owned())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            preset: Self::default_preset(),
            rate: None,
            cycles: BTreeMap::new(),
            nanos: BTreeMap::new(),
        }
    }
}

/// Controller buffers and write-mode watermarks.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Occupancy fraction below which write mode is left.
    #[serde(default = "ControllerConfig::default_low_watermark")]
    pub wr_low_watermark: f32,

    /// Occupancy fraction above which write mode is entered.
    #[serde(default = "ControllerConfig::default_high_watermark")]
    pub wr_high_watermark: f32,

    /// Capacity of the active, read, write, and PIM buffers.
    #[serde(default = "ControllerConfig::default_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of the priority (maintenance) buffer.
    #[serde(default = "ControllerConfig::default_priority_capacity")]
    pub priority_capacity: usize,
}

impl ControllerConfig {
    /// Returns the default low watermark.
    fn default_low_watermark() -> f32 {
        defaults::WR_LOW_WATERMARK
    }

    /// Returns the default high watermark.
    fn default_high_watermark() -> f32 {
        defaults::WR_HIGH_WATERMARK
    }

    /// Returns the default queue capacity.
    fn default_queue_capacity() -> usize {
        defaults::QUEUE_CAPACITY
    }

    /// Returns the default priority-buffer capacity.
    fn default_priority_capacity() -> usize {
        defaults::PRIORITY_CAPACITY
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            wr_low_watermark: defaults::WR_LOW_WATERMARK,
            wr_high_watermark: defaults::WR_HIGH_WATERMARK,
            queue_capacity: defaults::QUEUE_CAPACITY,
            priority_capacity: defaults::PRIORITY_CAPACITY,
        }
    }
}
