//! Cycle-accurate HBM3-PIM memory system simulator library.
//!
//! This crate models an HBM3-class DRAM device extended with processing-in-memory
//! (PIM) compute commands, and replays load/store/PIM traces against it:
//! 1. **Device:** the channel → pseudo-channel → rank → bank-group → bank hierarchy,
//!    the DRAM + PIM command alphabet, and the JEDEC-derived timing-constraint graph.
//! 2. **Controller:** per-channel request buffering, row-buffer-aware PIM scheduling,
//!    write-mode watermarking, and dual (row + column) command issue.
//! 3. **Memory system:** address mapping, per-channel fan-out, and request statistics.
//! 4. **Frontend:** a line-oriented load/store/PIM trace driver.
//! 5. **Simulation:** `Simulator` (frontend + memory system), configuration, statistics.

/// Common types shared across the simulator (errors).
pub mod common;
/// Simulator configuration (defaults, presets selection, overrides).
pub mod config;
/// Per-channel memory controller (buffers, scheduling, dual issue, refresh seam).
pub mod controller;
/// HBM3-PIM device model (hierarchy, commands, timing graph, state oracles).
pub mod device;
/// Flat-address to hierarchy-coordinate mappers.
pub mod mapper;
/// Memory system: mapper + controllers + request counters.
pub mod memory;
/// Memory request representation and request kinds.
pub mod request;
/// Simulation driver tying the trace frontend to the memory system.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;
/// Load/store/PIM trace parsing and replay.
pub mod trace;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The HBM3-PIM device timing/state model.
pub use crate::device::Device;
/// Memory system owning the device, mapper, and per-channel controllers.
pub use crate::memory::MemorySystem;
/// Top-level simulator; owns the trace frontend and the memory system.
pub use crate::sim::simulator::Simulator;
/// Trace frontend; parses and replays `<OP> <addr>` traces.
pub use crate::trace::TraceFrontend;
