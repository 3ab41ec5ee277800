//! Harness collaborators for the payrun engine.
//!
//! Nothing here is part of the engine's contract: this crate carries the
//! deterministic account derivation, tabular fixtures, and misbehaving token
//! doubles the test harness and local demos are built from.

#![deny(unsafe_code)]

pub mod accounts;
pub mod fixtures;

pub use accounts::{derive_account, derive_accounts};
pub use fixtures::{FixtureError, PayoutFixture};

use payrun_core::{
    Address, EngineError, LocalToken, PayoutRequest, PayrollEngine, TokenError, TokenLedger,
};
use std::sync::{Arc, Mutex, Weak};

/// Token double that refuses transfers after a configurable number of
/// successes. Deterministic chaos: lets tests fail a batch mid-flight.
#[derive(Debug)]
pub struct RejectingToken {
    inner: LocalToken,
    allow: usize,
    applied: usize,
}

impl RejectingToken {
    /// Refuse every transfer outright.
    pub fn refusing_immediately(operator: Address) -> Self {
        Self::refusing_after(operator, 0)
    }

    /// Apply `allow` transfers, then refuse the rest.
    pub fn refusing_after(operator: Address, allow: usize) -> Self {
        Self {
            inner: LocalToken::new(operator),
            allow,
            applied: 0,
        }
    }

    pub fn issue(&mut self, to: Address, amount: u64) {
        self.inner.issue(to, amount);
    }
}

impl TokenLedger for RejectingToken {
    fn balance_of(&self, address: &Address) -> u64 {
        self.inner.balance_of(address)
    }

    fn transfer(&mut self, to: &Address, amount: u64) -> Result<(), TokenError> {
        if self.applied >= self.allow {
            return Err(TokenError::Rejected(format!(
                "refused after {} applied transfers",
                self.applied
            )));
        }
        self.applied += 1;
        self.inner.transfer(to, amount)
    }

    fn begin(&mut self) {
        self.inner.begin();
    }

    fn commit(&mut self) {
        self.inner.commit();
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

/// Token double that calls back into the engine from inside `transfer`,
/// records what the engine answered, then refuses the transfer.
///
/// This is the reentrancy probe: a correctly latched engine answers the
/// callback with `ReentrantCall`, and the refusal forces the outer
/// invocation to unwind.
pub struct ReentrantToken {
    inner: LocalToken,
    engine: Mutex<Option<Weak<PayrollEngine>>>,
    observed: Mutex<Option<EngineError>>,
}

impl ReentrantToken {
    pub fn new(operator: Address) -> Self {
        Self {
            inner: LocalToken::new(operator),
            engine: Mutex::new(None),
            observed: Mutex::new(None),
        }
    }

    /// Point the probe at the engine it should attack. Called after engine
    /// construction because the two reference each other.
    pub fn arm(&self, engine: &Arc<PayrollEngine>) {
        *self.engine.lock().expect("probe target lock") = Some(Arc::downgrade(engine));
    }

    pub fn issue(&mut self, to: Address, amount: u64) {
        self.inner.issue(to, amount);
    }

    /// What the engine answered the reentrant callback, if one was attempted.
    pub fn observed_rejection(&self) -> Option<EngineError> {
        self.observed.lock().expect("probe result lock").clone()
    }
}

impl TokenLedger for ReentrantToken {
    fn balance_of(&self, address: &Address) -> u64 {
        self.inner.balance_of(address)
    }

    fn transfer(&mut self, to: &Address, amount: u64) -> Result<(), TokenError> {
        let target = self
            .engine
            .lock()
            .expect("probe target lock")
            .clone()
            .and_then(|weak| weak.upgrade());

        if let Some(engine) = target {
            return match engine.payout(engine.owner(), &PayoutRequest::default()) {
                Err(err) => {
                    *self.observed.lock().expect("probe result lock") = Some(err);
                    Err(TokenError::Rejected("reentrant dispatch refused".into()))
                }
                Ok(_) => Err(TokenError::Rejected(
                    "reentrant dispatch unexpectedly succeeded".into(),
                )),
            };
        }

        self.inner.transfer(to, amount)
    }

    fn begin(&mut self) {
        self.inner.begin();
    }

    fn commit(&mut self) {
        self.inner.commit();
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}
