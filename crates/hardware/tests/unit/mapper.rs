//! Address Mapper Tests.
//!
//! Verifies the transaction offset, the linear (MSB-first) decomposition,
//! the custom Ro-Ba-Ra-Co-BG-Pch-Ch interleaving, and the linear round-trip
//! property.

use proptest::prelude::*;

use hbmsim_core::config::Config;
use hbmsim_core::device::{Device, Level};
use hbmsim_core::mapper::{AddrMapper, MapperKind};
use hbmsim_core::request::{Request, RequestKind};

use crate::common::harness::linear_addr;

fn mapper(kind: MapperKind) -> AddrMapper {
    let dev = Device::new(&Config::default().device).unwrap();
    AddrMapper::new(kind, dev.organization())
}

fn map(kind: MapperKind, addr: u64) -> [usize; 7] {
    let mut req = Request::new(addr, RequestKind::Read);
    mapper(kind).apply(&mut req);
    req.addr_vec
}

// ══════════════════════════════════════════════════════════
// 1. Transaction offset
// ══════════════════════════════════════════════════════════

#[test]
fn tx_offset_covers_one_burst() {
    // prefetch 8 x 32-bit channel / 8 = 32 bytes -> 5 bits.
    assert_eq!(mapper(MapperKind::Linear).tx_offset(), 5);
}

#[test]
fn bit_widths_follow_the_organization() {
    // ch 1, pch 2, ra 1, bg 4, ba 4, ro 2^13, co 2^5.
    assert_eq!(mapper(MapperKind::Linear).addr_bits(), &[0, 1, 0, 2, 2, 13, 5]);
}

#[test]
fn addresses_within_one_transaction_coincide() {
    assert_eq!(map(MapperKind::Linear, 0x00), map(MapperKind::Linear, 0x1F));
    assert_eq!(map(MapperKind::Custom, 0x00), map(MapperKind::Custom, 0x1F));
}

// ══════════════════════════════════════════════════════════
// 2. Linear mapping
// ══════════════════════════════════════════════════════════

#[test]
fn linear_column_in_low_bits() {
    let vec = map(MapperKind::Linear, 0x40); // addr >> 5 == 2
    assert_eq!(vec[Level::Column as usize], 2);
    assert_eq!(vec[Level::Row as usize], 0);
}

#[test]
fn linear_decomposes_each_level() {
    let addr = linear_addr(1, 3, 2, 517, 9);
    let vec = map(MapperKind::Linear, addr);
    assert_eq!(vec[Level::Channel as usize], 0);
    assert_eq!(vec[Level::PseudoChannel as usize], 1);
    assert_eq!(vec[Level::Rank as usize], 0);
    assert_eq!(vec[Level::BankGroup as usize], 3);
    assert_eq!(vec[Level::Bank as usize], 2);
    assert_eq!(vec[Level::Row as usize], 517);
    assert_eq!(vec[Level::Column as usize], 9);
}

proptest! {
    /// Recomposing the linear addr_vec by the inverse bit layout reproduces
    /// `addr >> tx_offset`.
    #[test]
    fn linear_round_trip(addr in 0u64..(1 << 28)) {
        let dev = Device::new(&Config::default().device).unwrap();
        let org = dev.organization();
        let vec = map(MapperKind::Linear, addr);
        let mut recomposed = 0u64;
        for level in 0..7 {
            let bits = org.count[level].trailing_zeros();
            recomposed = (recomposed << bits) | vec[level] as u64;
        }
        prop_assert_eq!(recomposed, addr >> 5);
    }
}

// ══════════════════════════════════════════════════════════
// 3. Custom mapping (Ro Ba Ra Co BG Pch Ch)
// ══════════════════════════════════════════════════════════

#[test]
fn custom_pseudo_channel_in_lowest_bit() {
    let vec = map(MapperKind::Custom, 1 << 5);
    assert_eq!(vec[Level::PseudoChannel as usize], 1);
    assert_eq!(vec[Level::Column as usize], 0);
}

#[test]
fn custom_slice_order() {
    // After the pch bit come 2 bankgroup bits, 5 column bits, 0 rank bits,
    // 2 bank bits, then the row.
    let vec = map(MapperKind::Custom, 0b10 << 5);
    assert_eq!(vec[Level::BankGroup as usize], 1);

    let vec = map(MapperKind::Custom, 1 << (5 + 1 + 2));
    assert_eq!(vec[Level::Column as usize], 1);

    let vec = map(MapperKind::Custom, 1 << (5 + 1 + 2 + 5));
    assert_eq!(vec[Level::Bank as usize], 1);

    let vec = map(MapperKind::Custom, 1 << (5 + 1 + 2 + 5 + 2));
    assert_eq!(vec[Level::Row as usize], 1);
}

#[test]
fn custom_consecutive_transactions_interleave_pseudo_channels() {
    let a = map(MapperKind::Custom, 0x00);
    let b = map(MapperKind::Custom, 0x20);
    assert_eq!(a[Level::PseudoChannel as usize], 0);
    assert_eq!(b[Level::PseudoChannel as usize], 1);
}
