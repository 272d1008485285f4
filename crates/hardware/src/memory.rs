//! The memory system: device + mapper + per-channel controllers.
//!
//! Incoming requests are mapped to hierarchy coordinates, routed to the
//! controller of their channel, and counted on admission. Channels are
//! independent: each controller sees only its own subtree of the device.
//!
//! Tick order is fixed: the memory-system clock, then the device, then
//! every controller.

use crate::common::ConfigError;
use crate::config::Config;
use crate::controller::ChannelController;
use crate::device::{Device, Level};
use crate::mapper::AddrMapper;
use crate::request::Request;
use crate::stats::SimStats;

/// The memory system for one HBM3-PIM device.
#[derive(Debug)]
pub struct MemorySystem {
    clk: u64,
    clock_ratio: u32,
    dram: Device,
    mapper: AddrMapper,
    controllers: Vec<ChannelController>,
    stats: SimStats,
}

impl MemorySystem {
    /// Builds the device, the mapper, and one controller per channel.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for inconsistent device configuration or a
    /// clock ratio below 1.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        if config.general.clock_ratio < 1 {
            return Err(ConfigError::InvalidClockRatio);
        }
        let mut dram = Device::new(&config.device)?;
        if config.general.log_commands {
            dram.enable_command_log();
        }
        let mapper = AddrMapper::new(config.general.mapper, dram.organization());
        let controllers = (0..dram.organization().count(Level::Channel))
            .map(|id| ChannelController::new(id, &config.controller))
            .collect();
        Ok(Self {
            clk: 0,
            clock_ratio: config.general.clock_ratio,
            dram,
            mapper,
            controllers,
            stats: SimStats::default(),
        })
    }

    /// Maps and routes a request to its channel's controller. On admission
    /// the per-kind counter is incremented (barriers count nothing); a full
    /// buffer hands the request back for retry.
    pub fn send(&mut self, mut req: Request) -> Result<(), Request> {
        self.mapper.apply(&mut req);
        let channel = req.addr_vec[Level::Channel as usize];
        let kind = req.kind;

        let controller = &mut self.controllers[channel];
        let outcome = if kind.is_refresh() {
            controller.priority_send(req)
        } else {
            controller.send(req)
        };

        if outcome.is_ok() {
            self.stats.record(kind);
        }
        outcome
    }

    /// Advances one cycle: device first, then every controller in channel
    /// order.
    pub fn tick(&mut self) {
        self.clk += 1;
        self.stats.memory_system_cycles = self.clk;
        self.dram.tick();
        for controller in &mut self.controllers {
            controller.tick(&mut self.dram);
        }
    }

    /// True while any controller still holds work.
    pub fn is_pending(&self) -> bool {
        self.controllers.iter().any(ChannelController::is_pending)
    }

    /// Command clock period in nanoseconds.
    pub fn tck_ns(&self) -> f64 {
        self.dram.timing().t_ck_ps as f64 / 1000.0
    }

    /// Frontend-to-memory clock ratio.
    pub const fn clock_ratio(&self) -> u32 {
        self.clock_ratio
    }

    /// Accumulated statistics.
    pub const fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// The device model (command log, bank states, timing).
    pub const fn device(&self) -> &Device {
        &self.dram
    }

    /// Mutable device access (e.g. draining the command log).
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.dram
    }

    /// The per-channel controllers, in channel order.
    pub fn controllers(&self) -> &[ChannelController] {
        &self.controllers
    }

    /// Current memory-system cycle.
    pub const fn clk(&self) -> u64 {
        self.clk
    }
}
