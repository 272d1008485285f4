//! Flat-address to hierarchy-coordinate mappers.
//!
//! Both mappers first drop the transaction offset — the low bits covered by
//! one burst (`prefetch × channel_width / 8` bytes) — then slice the
//! remaining bits into per-level indices:
//! 1. **Linear:** levels take bit fields most-significant first (channel in
//!    the top bits, column in the bottom bits).
//! 2. **Custom:** the HBM3 interleaving `Ro Ba Ra Co BG Pch Ch` (channel and
//!    pseudo-channel in the lowest bits for maximum parallelism).

use serde::Deserialize;

use crate::device::organization::INTERNAL_PREFETCH;
use crate::device::{Level, Organization};
use crate::request::Request;

/// Address mapping scheme selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MapperKind {
    /// Trivial MSB-first slicing.
    #[default]
    Linear,
    /// HBM3 custom interleaving (Ro Ba Ra Co BG Pch Ch).
    Custom,
}

/// A configured address mapper; populates `addr_vec` on a request.
#[derive(Debug, Clone)]
pub struct AddrMapper {
    kind: MapperKind,
    addr_bits: [u32; Level::Column as usize + 1],
    tx_offset: u32,
}

/// Custom interleaving slice order, low bits first: Ch, Pch, BG, Co, Ra, Ba, Ro.
const CUSTOM_ORDER: [Level; 7] = [
    Level::Channel,
    Level::PseudoChannel,
    Level::BankGroup,
    Level::Column,
    Level::Rank,
    Level::Bank,
    Level::Row,
];

impl AddrMapper {
    /// Builds a mapper for the given organization.
    ///
    /// Each level takes floor(log2(count)) bits; non-power-of-two fan-outs
    /// (the 3-rank 12-Hi stacks) simply leave their top entry unaddressed.
    pub fn new(kind: MapperKind, org: &Organization) -> Self {
        let mut addr_bits = [0u32; Level::Column as usize + 1];
        for (idx, bits) in addr_bits.iter_mut().enumerate() {
            *bits = org.count[idx].ilog2();
        }
        let tx_bytes = INTERNAL_PREFETCH * org.channel_width / 8;
        Self {
            kind,
            addr_bits,
            tx_offset: tx_bytes.trailing_zeros(),
        }
    }

    /// Decomposes `req.addr` into hierarchy coordinates.
    pub fn apply(&self, req: &mut Request) {
        let mut addr = req.addr >> self.tx_offset;
        match self.kind {
            MapperKind::Linear => {
                // Column takes the lowest bits, channel the highest.
                for idx in (0..self.addr_bits.len()).rev() {
                    req.addr_vec[idx] = slice_lower_bits(&mut addr, self.addr_bits[idx]);
                }
            }
            MapperKind::Custom => {
                for level in CUSTOM_ORDER {
                    req.addr_vec[level as usize] =
                        slice_lower_bits(&mut addr, self.addr_bits[level as usize]);
                }
            }
        }
    }

    /// Bits dropped below the transaction granularity.
    #[inline]
    pub const fn tx_offset(&self) -> u32 {
        self.tx_offset
    }

    /// Bit width of each level's field.
    pub const fn addr_bits(&self) -> &[u32; Level::Column as usize + 1] {
        &self.addr_bits
    }
}

/// Removes and returns the lowest `bits` bits of `addr`.
#[inline]
fn slice_lower_bits(addr: &mut u64, bits: u32) -> usize {
    let value = *addr & ((1u64 << bits) - 1);
    *addr >>= bits;
    value as usize
}
