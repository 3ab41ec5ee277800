use crate::error::EngineError;
use crate::types::{Address, AssetClass};
use std::collections::{HashMap, HashSet};

/// Rollback journal for native-balance mutation.
///
/// Records each touched address's balance the first time a transfer touches
/// it; `NativeLedger::rollback` replays those priors to discard every
/// mutation made under the journal as one unit.
#[derive(Debug, Default)]
pub struct Journal {
    priors: Vec<(Address, u64)>,
    touched: HashSet<Address>,
}

impl Journal {
    /// Capture `prior` for `address` unless the journal already holds an
    /// earlier (and therefore authoritative) value for it.
    pub fn note(&mut self, address: Address, prior: u64) {
        if self.touched.insert(address) {
            self.priors.push((address, prior));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.priors.is_empty()
    }

    pub fn touched_accounts(&self) -> usize {
        self.priors.len()
    }
}

/// In-memory native-currency ledger: per-address balances, external deposits,
/// and journaled transfers.
#[derive(Debug, Default)]
pub struct NativeLedger {
    balances: HashMap<Address, u64>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Credit an address from outside the ledger (a funding source).
    pub fn deposit(&mut self, address: Address, amount: u64) -> Result<(), EngineError> {
        let credited = self
            .balance_of(&address)
            .checked_add(amount)
            .ok_or(EngineError::AmountOverflow {
                asset: AssetClass::Native,
            })?;
        self.balances.insert(address, credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to`, capturing priors in the journal.
    ///
    /// Debit happens before credit so a self-transfer nets to zero instead of
    /// minting. Any error leaves the caller responsible for rolling the
    /// journal back.
    pub fn transfer(
        &mut self,
        journal: &mut Journal,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), EngineError> {
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(EngineError::InsufficientFunds {
                asset: AssetClass::Native,
                requested: amount,
                available: from_balance,
            });
        }

        journal.note(from, from_balance);
        self.balances.insert(from, from_balance - amount);

        let to_balance = self.balance_of(&to);
        journal.note(to, to_balance);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(EngineError::AmountOverflow {
                asset: AssetClass::Native,
            })?;
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Discard every mutation captured by the journal, restoring each touched
    /// address to its pre-journal balance.
    pub fn rollback(&mut self, journal: Journal) {
        for (address, prior) in journal.priors.into_iter().rev() {
            if prior == 0 {
                self.balances.remove(&address);
            } else {
                self.balances.insert(address, prior);
            }
        }
    }
}
