use crate::auth::Ownership;
use crate::classify::RecipientClassifier;
use crate::costs::CostSchedule;
use crate::error::EngineError;
use crate::ledger::{Journal, NativeLedger};
use crate::token::SharedToken;
use crate::types::{
    invocation_id, AccountBalances, Address, AssetClass, PayoutReceipt, PayoutRequest, SweepReceipt,
};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Engine construction parameters. The owner and the engine's own custody
/// address are fixed for the engine's whole life.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub owner: Address,
    pub address: Address,
    pub costs: CostSchedule,
}

impl EngineConfig {
    pub fn new(owner: Address, address: Address) -> Self {
        Self {
            owner,
            address,
            costs: CostSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Active,
    Terminated,
}

/// Custody-and-distribution engine over one native ledger and one external
/// token reference.
///
/// All entry points run to completion under a reentrancy latch: a collaborator
/// that calls back in mid-invocation observes `ReentrantCall` instead of a
/// second live invocation. Mutation is all-or-nothing per invocation - the
/// native side through a rollback journal, the token side through the
/// reference's transactional bracket.
pub struct PayrollEngine {
    address: Address,
    ownership: Ownership,
    native: Arc<RwLock<NativeLedger>>,
    token: SharedToken,
    classifier: Arc<dyn RecipientClassifier>,
    costs: CostSchedule,
    lifecycle: RwLock<LifecycleState>,
    entered: AtomicBool,
    lifetime_cost: AtomicU64,
}

/// Latch released when the invocation that acquired it returns.
struct ReentryGuard<'a>(&'a AtomicBool);

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PayrollEngine {
    pub fn new(
        config: EngineConfig,
        native: Arc<RwLock<NativeLedger>>,
        token: SharedToken,
        classifier: Arc<dyn RecipientClassifier>,
    ) -> Self {
        Self {
            address: config.address,
            ownership: Ownership::new(config.owner),
            native,
            token,
            classifier,
            costs: config.costs,
            lifecycle: RwLock::new(LifecycleState::Active),
            entered: AtomicBool::new(false),
            lifetime_cost: AtomicU64::new(0),
        }
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle
            .read()
            .map(|state| *state == LifecycleState::Active)
            .unwrap_or(false)
    }

    /// Total work units charged across every completed invocation.
    pub fn cumulative_cost(&self) -> u64 {
        self.lifetime_cost.load(Ordering::Relaxed)
    }

    /// Atomic dual-asset batch distribution.
    ///
    /// Validates everything before touching a single balance, then applies
    /// native transfers in list order followed by token transfers in list
    /// order. Any failure after the first mutation unwinds both asset
    /// classes before the error is returned.
    pub fn payout(
        &self,
        caller: Address,
        request: &PayoutRequest,
    ) -> Result<PayoutReceipt, EngineError> {
        let _latch = self.enter()?;
        self.ensure_live()?;
        self.ownership.ensure(caller)?;

        self.validate_recipients(request)?;
        let total_native = checked_sum(&request.native_amounts, AssetClass::Native)?;
        let total_token = checked_sum(&request.token_amounts, AssetClass::Token)?;
        self.ensure_solvent(AssetClass::Native, total_native)?;
        self.ensure_solvent(AssetClass::Token, total_token)?;

        let mut journal = Journal::default();
        {
            let mut native = self
                .native
                .write()
                .map_err(|_| EngineError::LockPoisoned("native ledger"))?;
            for (recipient, amount) in request
                .native_recipients
                .iter()
                .zip(&request.native_amounts)
            {
                if let Err(err) = native.transfer(&mut journal, self.address, *recipient, *amount) {
                    native.rollback(journal);
                    return Err(err);
                }
            }
        }

        {
            let mut token = self
                .token
                .write()
                .map_err(|_| EngineError::LockPoisoned("token reference"))?;
            token.begin();
            for (recipient, amount) in request.token_recipients.iter().zip(&request.token_amounts) {
                if let Err(err) = token.transfer(recipient, *amount) {
                    token.rollback();
                    drop(token);
                    self.native
                        .write()
                        .map_err(|_| EngineError::LockPoisoned("native ledger"))?
                        .rollback(journal);
                    return Err(EngineError::TransferRejected {
                        recipient: *recipient,
                        reason: err.to_string(),
                    });
                }
            }
            token.commit();
        }

        let cost_units = self.costs.payout_units(
            request.native_recipients.len(),
            request.token_recipients.len(),
        );
        let cumulative = self.charge(cost_units);
        let receipt = PayoutReceipt {
            invocation_id: invocation_id(),
            total_native,
            total_token,
            native_recipients: request.native_recipients.len(),
            token_recipients: request.token_recipients.len(),
            cost_units,
            executed_at: Utc::now(),
        };

        debug!(
            invocation_id = receipt.invocation_id.as_str(),
            native_recipients = receipt.native_recipients,
            token_recipients = receipt.token_recipients,
            total_native,
            total_token,
            cost_units,
            cumulative,
            "payout applied"
        );

        Ok(receipt)
    }

    /// Live custody readings for any address. No authorization required; the
    /// token side always reflects the reference's current accounting.
    ///
    /// Latched like the mutating operations: a collaborator reading back in
    /// mid-invocation would otherwise deadlock on the token lock the outer
    /// invocation holds.
    pub fn balance_of(&self, address: &Address) -> Result<AccountBalances, EngineError> {
        let _latch = self.enter()?;
        self.ensure_live()?;

        let native = self
            .native
            .read()
            .map_err(|_| EngineError::LockPoisoned("native ledger"))?
            .balance_of(address);
        let token = self
            .token
            .read()
            .map_err(|_| EngineError::LockPoisoned("token reference"))?
            .balance_of(address);

        Ok(AccountBalances { native, token })
    }

    /// One-shot sweep and permanent decommissioning.
    ///
    /// Moves the engine's entire current custody (both classes) to the
    /// beneficiary, then terminates. A failed token sweep aborts the whole
    /// operation and leaves the engine live. Terminal and irreversible.
    pub fn kill(
        &self,
        caller: Address,
        beneficiary: Address,
    ) -> Result<SweepReceipt, EngineError> {
        let _latch = self.enter()?;
        self.ensure_live()?;
        self.ownership.ensure(caller)?;
        if beneficiary.is_zero() {
            return Err(EngineError::ZeroBeneficiary);
        }

        let mut journal = Journal::default();
        let native_swept = {
            let mut native = self
                .native
                .write()
                .map_err(|_| EngineError::LockPoisoned("native ledger"))?;
            let held = native.balance_of(&self.address);
            if held > 0 {
                if let Err(err) = native.transfer(&mut journal, self.address, beneficiary, held) {
                    native.rollback(journal);
                    return Err(err);
                }
            }
            held
        };

        let token_swept = {
            let mut token = self
                .token
                .write()
                .map_err(|_| EngineError::LockPoisoned("token reference"))?;
            let held = token.balance_of(&self.address);
            token.begin();
            if held > 0 {
                if let Err(err) = token.transfer(&beneficiary, held) {
                    token.rollback();
                    drop(token);
                    self.native
                        .write()
                        .map_err(|_| EngineError::LockPoisoned("native ledger"))?
                        .rollback(journal);
                    return Err(EngineError::TransferRejected {
                        recipient: beneficiary,
                        reason: err.to_string(),
                    });
                }
            }
            token.commit();
            held
        };

        *self
            .lifecycle
            .write()
            .map_err(|_| EngineError::LockPoisoned("lifecycle"))? = LifecycleState::Terminated;

        let cost_units = self.costs.sweep_units();
        let cumulative = self.charge(cost_units);
        let receipt = SweepReceipt {
            invocation_id: invocation_id(),
            beneficiary,
            native_swept,
            token_swept,
            cost_units,
            executed_at: Utc::now(),
        };

        info!(
            invocation_id = receipt.invocation_id.as_str(),
            beneficiary = %beneficiary,
            native_swept,
            token_swept,
            cumulative,
            "engine terminated, custody swept"
        );

        Ok(receipt)
    }

    /// Acquire the reentrancy latch. Runs before liveness, authorization, and
    /// every lock acquisition, so a callback from a collaborator fails here
    /// without a chance to deadlock on state the outer invocation holds.
    fn enter(&self) -> Result<ReentryGuard<'_>, EngineError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .map_err(|_| EngineError::ReentrantCall)?;
        Ok(ReentryGuard(&self.entered))
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        let state = self
            .lifecycle
            .read()
            .map_err(|_| EngineError::LockPoisoned("lifecycle"))?;
        if *state == LifecycleState::Terminated {
            return Err(EngineError::Terminated);
        }
        Ok(())
    }

    fn validate_recipients(&self, request: &PayoutRequest) -> Result<(), EngineError> {
        if request.native_recipients.len() != request.native_amounts.len() {
            return Err(EngineError::LengthMismatch {
                asset: AssetClass::Native,
                recipients: request.native_recipients.len(),
                amounts: request.native_amounts.len(),
            });
        }
        if request.token_recipients.len() != request.token_amounts.len() {
            return Err(EngineError::LengthMismatch {
                asset: AssetClass::Token,
                recipients: request.token_recipients.len(),
                amounts: request.token_amounts.len(),
            });
        }

        for (index, recipient) in request.native_recipients.iter().enumerate() {
            if recipient.is_zero() {
                return Err(EngineError::ZeroRecipient {
                    asset: AssetClass::Native,
                    index,
                });
            }
            // Queried fresh every invocation: code can appear at an address
            // between payouts.
            if self.classifier.is_contract_like(recipient) {
                return Err(EngineError::ContractRecipient {
                    address: *recipient,
                    index,
                });
            }
        }

        for (index, recipient) in request.token_recipients.iter().enumerate() {
            if recipient.is_zero() {
                return Err(EngineError::ZeroRecipient {
                    asset: AssetClass::Token,
                    index,
                });
            }
        }

        Ok(())
    }

    fn ensure_solvent(&self, asset: AssetClass, requested: u64) -> Result<(), EngineError> {
        let available = match asset {
            AssetClass::Native => self
                .native
                .read()
                .map_err(|_| EngineError::LockPoisoned("native ledger"))?
                .balance_of(&self.address),
            AssetClass::Token => self
                .token
                .read()
                .map_err(|_| EngineError::LockPoisoned("token reference"))?
                .balance_of(&self.address),
        };
        if requested > available {
            return Err(EngineError::InsufficientFunds {
                asset,
                requested,
                available,
            });
        }
        Ok(())
    }

    fn charge(&self, units: u64) -> u64 {
        self.lifetime_cost.fetch_add(units, Ordering::Relaxed) + units
    }
}

fn checked_sum(amounts: &[u64], asset: AssetClass) -> Result<u64, EngineError> {
    amounts
        .iter()
        .try_fold(0u64, |acc, amount| acc.checked_add(*amount))
        .ok_or(EngineError::AmountOverflow { asset })
}
