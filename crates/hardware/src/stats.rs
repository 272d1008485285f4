//! Simulation statistics collection and reporting.
//!
//! One counter per request kind, plus the memory-system cycle count. The
//! barrier token orders PIM work but transfers nothing, so it is not
//! counted.

use crate::request::RequestKind;

/// Per-run statistics.
#[derive(Clone, Debug, Default)]
pub struct SimStats {
    /// Cycles elapsed on the memory-system clock.
    pub memory_system_cycles: u64,
    /// Admitted read requests.
    pub num_read_requests: u64,
    /// Admitted write requests.
    pub num_write_requests: u64,
    /// Admitted all-bank MAC requests.
    pub num_pim_mac_all_bank_requests: u64,
    /// Admitted same-bank MAC requests.
    pub num_pim_mac_same_bank_requests: u64,
    /// Admitted per-bank MAC requests.
    pub num_pim_mac_per_bank_requests: u64,
    /// Admitted GEMV-buffer write requests.
    pub num_pim_write_to_gemv_buffer_requests: u64,
    /// Admitted softmax-buffer move requests.
    pub num_pim_move_to_softmax_buffer_requests: u64,
    /// Admitted GEMV-buffer move requests.
    pub num_pim_move_to_gemv_buffer_requests: u64,
    /// Admitted softmax requests.
    pub num_pim_softmax_requests: u64,
    /// Admitted model-register set requests.
    pub num_pim_set_model_requests: u64,
    /// Admitted head-register set requests.
    pub num_pim_set_head_requests: u64,
    /// Admitted requests of any other kind (refresh maintenance).
    pub num_other_requests: u64,
}

impl SimStats {
    /// Counts one successfully admitted request. Barriers count nothing.
    pub fn record(&mut self, kind: RequestKind) {
        match kind {
            RequestKind::Read => self.num_read_requests += 1,
            RequestKind::Write => self.num_write_requests += 1,
            RequestKind::PimMacAllBank => self.num_pim_mac_all_bank_requests += 1,
            RequestKind::PimMacSameBank => self.num_pim_mac_same_bank_requests += 1,
            RequestKind::PimMacPerBank => self.num_pim_mac_per_bank_requests += 1,
            RequestKind::PimWriteGemvBuffer => self.num_pim_write_to_gemv_buffer_requests += 1,
            RequestKind::PimMoveSoftmaxBuffer => self.num_pim_move_to_softmax_buffer_requests += 1,
            RequestKind::PimMoveGemvBuffer => self.num_pim_move_to_gemv_buffer_requests += 1,
            RequestKind::PimSoftmax => self.num_pim_softmax_requests += 1,
            RequestKind::PimSetModel => self.num_pim_set_model_requests += 1,
            RequestKind::PimSetHead => self.num_pim_set_head_requests += 1,
            RequestKind::PimBarrier => {}
            RequestKind::AllBankRefresh | RequestKind::PerBankRefresh => {
                self.num_other_requests += 1;
            }
        }
    }

    /// Sum of all request counters (everything except the cycle count).
    pub const fn total_requests(&self) -> u64 {
        self.num_read_requests
            + self.num_write_requests
            + self.num_pim_mac_all_bank_requests
            + self.num_pim_mac_same_bank_requests
            + self.num_pim_mac_per_bank_requests
            + self.num_pim_write_to_gemv_buffer_requests
            + self.num_pim_move_to_softmax_buffer_requests
            + self.num_pim_move_to_gemv_buffer_requests
            + self.num_pim_softmax_requests
            + self.num_pim_set_model_requests
            + self.num_pim_set_head_requests
            + self.num_other_requests
    }

    /// Prints all statistics to stdout.
    pub fn print(&self) {
        let row = |name: &str, value: u64| println!("{name:<46} {value}");
        println!("\n==========================================================");
        println!("HBM3-PIM MEMORY SYSTEM STATISTICS");
        println!("==========================================================");
        row("memory_system_cycles", self.memory_system_cycles);
        row("total_num_read_requests", self.num_read_requests);
        row("total_num_write_requests", self.num_write_requests);
        row(
            "total_num_pim_mac_all_bank_requests",
            self.num_pim_mac_all_bank_requests,
        );
        row(
            "total_num_pim_mac_same_bank_requests",
            self.num_pim_mac_same_bank_requests,
        );
        row(
            "total_num_pim_mac_per_bank_requests",
            self.num_pim_mac_per_bank_requests,
        );
        row(
            "total_num_pim_write_to_gemv_buffer_requests",
            self.num_pim_write_to_gemv_buffer_requests,
        );
        row(
            "total_num_pim_move_to_softmax_buffer_requests",
            self.num_pim_move_to_softmax_buffer_requests,
        );
        row(
            "total_num_pim_move_to_gemv_buffer_requests",
            self.num_pim_move_to_gemv_buffer_requests,
        );
        row("total_num_pim_softmax_requests", self.num_pim_softmax_requests);
        row(
            "total_num_pim_set_model_requests",
            self.num_pim_set_model_requests,
        );
        row(
            "total_num_pim_set_head_requests",
            self.num_pim_set_head_requests,
        );
        row("total_num_other_requests", self.num_other_requests);
        println!("==========================================================");
    }
}
