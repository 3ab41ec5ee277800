use crate::types::{Address, AssetClass};
use thiserror::Error;

/// Engine errors. Every variant means the invocation aborted with zero state
/// change: no partial transfers, no partial balance mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("caller {caller} is not the engine owner")]
    NotAuthorized { caller: Address },

    #[error("{asset} batch length mismatch: {recipients} recipients, {amounts} amounts")]
    LengthMismatch {
        asset: AssetClass,
        recipients: usize,
        amounts: usize,
    },

    #[error("{asset} recipient at index {index} is the zero address")]
    ZeroRecipient { asset: AssetClass, index: usize },

    #[error("native recipient {address} at index {index} is contract-like")]
    ContractRecipient { address: Address, index: usize },

    #[error("sweep beneficiary is the zero address")]
    ZeroBeneficiary,

    #[error("insufficient {asset} custody: requested {requested}, available {available}")]
    InsufficientFunds {
        asset: AssetClass,
        requested: u64,
        available: u64,
    },

    #[error("token transfer to {recipient} failed: {reason}")]
    TransferRejected { recipient: Address, reason: String },

    #[error("{asset} amounts overflow the balance width")]
    AmountOverflow { asset: AssetClass },

    #[error("call rejected: another invocation is still live")]
    ReentrantCall,

    #[error("engine has been terminated")]
    Terminated,

    #[error("shared state lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Errors surfaced by the external token reference. A transfer that cannot be
/// applied must fail loudly through one of these; silent success is not an
/// option the engine tolerates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("insufficient token balance: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}
