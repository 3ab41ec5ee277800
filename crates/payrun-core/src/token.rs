use crate::error::TokenError;
use crate::types::Address;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The external fungible-token contract the engine distributes from.
///
/// `transfer` moves tokens out of the operator's holdings (the engine calls
/// it on its own behalf) and must fail loudly when it cannot be applied.
/// `begin`/`commit`/`rollback` bracket a batch of transfers so a substrate
/// without native atomic transactions can still discard a half-applied batch
/// as one unit: the engine opens a bracket before its first hand-off and
/// either commits or rolls the whole bracket back.
pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, address: &Address) -> u64;

    fn transfer(&mut self, to: &Address, amount: u64) -> Result<(), TokenError>;

    fn begin(&mut self);

    fn commit(&mut self);

    fn rollback(&mut self);
}

/// Shared handle to the token reference fixed at engine construction.
pub type SharedToken = Arc<RwLock<dyn TokenLedger>>;

/// Reference in-memory token: per-address balances, external issuance, and
/// checkpoint-based bracket support. Used by tests, the service, and local
/// demos; a production deployment would wire a real contract binding here.
#[derive(Debug, Clone)]
pub struct LocalToken {
    operator: Address,
    balances: HashMap<Address, u64>,
    checkpoint: Option<HashMap<Address, u64>>,
}

impl LocalToken {
    /// Create a token whose `transfer` debits `operator`.
    pub fn new(operator: Address) -> Self {
        Self {
            operator,
            balances: HashMap::new(),
            checkpoint: None,
        }
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    /// Mint `amount` to `to` (the issuance path funding sources use).
    pub fn issue(&mut self, to: Address, amount: u64) {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}

impl TokenLedger for LocalToken {
    fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn transfer(&mut self, to: &Address, amount: u64) -> Result<(), TokenError> {
        let available = self.balance_of(&self.operator);
        if available < amount {
            return Err(TokenError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        self.balances.insert(self.operator, available - amount);
        let credited = self.balance_of(to).saturating_add(amount);
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn begin(&mut self) {
        self.checkpoint = Some(self.balances.clone());
    }

    fn commit(&mut self) {
        self.checkpoint = None;
    }

    fn rollback(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.balances = checkpoint;
        }
    }
}
