/// Deterministic work-unit charges per engine operation.
///
/// Units are an abstract resource measure: a flat charge per invocation plus
/// a per-transfer charge for each asset class. Receipts carry the computed
/// units and the engine keeps a cumulative lifetime total, so harnesses can
/// benchmark batch cost without the engine knowing anything about them.
#[derive(Debug, Clone)]
pub struct CostSchedule {
    pub invocation_base: u64,
    pub native_transfer: u64,
    pub token_transfer: u64,
    pub sweep: u64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            invocation_base: 21_000,
            native_transfer: 9_000,
            token_transfer: 23_000,
            sweep: 30_000,
        }
    }
}

impl CostSchedule {
    pub fn payout_units(&self, native_transfers: usize, token_transfers: usize) -> u64 {
        self.invocation_base
            .saturating_add(self.native_transfer.saturating_mul(native_transfers as u64))
            .saturating_add(self.token_transfer.saturating_mul(token_transfers as u64))
    }

    pub fn sweep_units(&self) -> u64 {
        self.invocation_base.saturating_add(self.sweep)
    }
}
