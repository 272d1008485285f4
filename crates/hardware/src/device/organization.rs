//! Device organization: per-level fan-outs, DQ width, density.
//!
//! Presets follow JESD238A stack configurations: 1/2/3/4 ranks correspond to
//! 4/8/12/16-Hi stacks, DQ is per pseudo-channel, and the internal prefetch
//! is fixed at 8 (burst of 8 column transfers per access).

use crate::common::ConfigError;
use crate::config::OrgConfig;

use super::level::{LEVELS, Level, NUM_LEVELS};

/// Internal prefetch size: column transfers fetched per column access.
pub const INTERNAL_PREFETCH: usize = 8;

/// A fully resolved device organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Organization {
    /// Per-channel density in megabits.
    pub density_mbit: u64,
    /// DQ pins per pseudo-channel.
    pub dq: usize,
    /// Fan-out at each hierarchy level, channel first.
    pub count: [usize; NUM_LEVELS],
    /// Channel width in bits (with the prefetch size, fixes the transaction size).
    pub channel_width: usize,
}

/// Organization presets: `(name, density Mb, dq, [ch, pch, ra, bg, ba, ro, co])`.
///
/// 1R/2R/3R/4R name suffixes select the rank count for 4/8/12/16-Hi stacks.
const ORG_PRESETS: &[(&str, u64, usize, [usize; NUM_LEVELS])] = &[
    ("HBM3_2Gb_1R", 2 << 10, 32, [1, 2, 1, 4, 4, 1 << 13, 1 << 5]),
    ("HBM3_4Gb_1R", 4 << 10, 32, [1, 2, 1, 4, 4, 1 << 14, 1 << 5]),
    ("HBM3_8Gb_1R", 8 << 10, 32, [1, 2, 1, 4, 4, 1 << 15, 1 << 5]),
    ("HBM3_4Gb_2R", 4 << 10, 32, [1, 2, 2, 4, 4, 1 << 13, 1 << 5]),
    ("HBM3_8Gb_2R", 8 << 10, 32, [1, 2, 2, 4, 4, 1 << 14, 1 << 5]),
    ("HBM3_16Gb_2R", 16 << 10, 32, [1, 2, 2, 4, 4, 1 << 15, 1 << 5]),
    ("HBM3_6Gb_3R", 6 << 10, 32, [1, 2, 3, 4, 4, 1 << 13, 1 << 5]),
    ("HBM3_12Gb_3R", 12 << 10, 32, [1, 2, 3, 4, 4, 1 << 14, 1 << 5]),
    ("HBM3_24Gb_3R", 24 << 10, 32, [1, 2, 3, 4, 4, 1 << 15, 1 << 5]),
    ("HBM3_8Gb_4R", 8 << 10, 32, [1, 2, 4, 4, 4, 1 << 13, 1 << 5]),
    ("HBM3_16Gb_4R", 16 << 10, 32, [1, 2, 4, 4, 4, 1 << 14, 1 << 5]),
    ("HBM3_32Gb_4R", 32 << 10, 32, [1, 2, 4, 4, 4, 1 << 15, 1 << 5]),
];

impl Organization {
    /// Resolves an organization from configuration: preset lookup, then
    /// per-field overrides, then the density sanity check.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown preset name or when the level
    /// counts do not multiply out to the configured density.
    pub fn resolve(cfg: &OrgConfig) -> Result<Self, ConfigError> {
        let preset = ORG_PRESETS
            .iter()
            .find(|(name, ..)| *name == cfg.preset)
            .ok_or_else(|| ConfigError::UnknownOrgPreset(cfg.preset.clone()))?;

        let mut org = Self {
            density_mbit: preset.1,
            dq: preset.2,
            count: preset.3,
            channel_width: cfg.channel_width,
        };

        if let Some(dq) = cfg.dq {
            org.dq = dq;
        }
        if let Some(density) = cfg.density {
            org.density_mbit = density;
        }
        for (level, count) in org.count.iter_mut().enumerate() {
            if let Some(over) = cfg.count_override(LEVELS[level]) {
                *count = over;
            }
        }

        org.validate()?;
        Ok(org)
    }

    /// Checks that every level is populated and that the counts multiply
    /// out to the configured density.
    fn validate(&self) -> Result<(), ConfigError> {
        for (idx, &count) in self.count.iter().enumerate() {
            if count == 0 {
                return Err(ConfigError::InvalidLevelCount {
                    level: LEVELS[idx].name(),
                });
            }
        }

        // Channel density in bits: everything below the channel, times DQ and
        // the internal prefetch.
        let bits: u64 = self.count[Level::PseudoChannel as usize..]
            .iter()
            .map(|&c| c as u64)
            .product::<u64>()
            * self.dq as u64
            * INTERNAL_PREFETCH as u64;
        let calculated = bits >> 20;
        if calculated != self.density_mbit {
            return Err(ConfigError::DensityMismatch {
                calculated,
                configured: self.density_mbit,
            });
        }
        Ok(())
    }

    /// Fan-out at one level.
    #[inline]
    pub const fn count(&self, level: Level) -> usize {
        self.count[level as usize]
    }

    /// Names of all known organization presets.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        ORG_PRESETS.iter().map(|(name, ..)| *name)
    }
}
