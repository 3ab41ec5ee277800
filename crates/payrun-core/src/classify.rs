use crate::types::Address;
use std::collections::HashSet;
use std::sync::RwLock;

/// Capability query: does this address currently carry executable logic that
/// could run on receipt of funds?
///
/// Implementations must answer from live state on every call. Code can appear
/// at or vanish from an address between invocations, so a cached answer is a
/// stale answer.
pub trait RecipientClassifier: Send + Sync {
    fn is_contract_like(&self, address: &Address) -> bool;
}

/// In-memory classification service: the set of addresses known to carry
/// executable code. Registration and clearing model deployment and
/// destruction on the underlying substrate.
#[derive(Debug, Default)]
pub struct CodeRegistry {
    contracts: RwLock<HashSet<Address>>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an address as carrying executable code.
    pub fn register_contract(&self, address: Address) {
        if let Ok(mut contracts) = self.contracts.write() {
            contracts.insert(address);
        }
    }

    /// Remove an address from the code set (destruction analog).
    pub fn clear_contract(&self, address: &Address) {
        if let Ok(mut contracts) = self.contracts.write() {
            contracts.remove(address);
        }
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl RecipientClassifier for CodeRegistry {
    fn is_contract_like(&self, address: &Address) -> bool {
        // A poisoned registry fails closed: every address reads contract-like.
        self.contracts
            .read()
            .map(|contracts| contracts.contains(address))
            .unwrap_or(true)
    }
}
