//! Payrun core: a custody-and-distribution engine.
//!
//! One administered account pool holds two asset classes - a native currency
//! balance and an external fungible-token balance - and distributes them to
//! large recipient batches in a single all-or-nothing invocation. The crate
//! enforces argument consistency, solvency, single-owner authorization, and
//! reentrancy defense, and terminates through a one-shot sweep.

#![deny(unsafe_code)]

pub mod auth;
pub mod classify;
pub mod costs;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod token;
pub mod types;

pub use auth::Ownership;
pub use classify::{CodeRegistry, RecipientClassifier};
pub use costs::CostSchedule;
pub use engine::{EngineConfig, PayrollEngine};
pub use error::{EngineError, TokenError};
pub use ledger::{Journal, NativeLedger};
pub use token::{LocalToken, SharedToken, TokenLedger};
pub use types::{
    AccountBalances, Address, AddressParseError, AssetClass, PayoutReceipt, PayoutRequest,
    SweepReceipt,
};
