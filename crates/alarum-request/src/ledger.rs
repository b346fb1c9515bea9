//! Value-transfer and downstream-call seams.
//!
//! The request never touches ambient environment state: its escrow is an
//! explicit field, outbound value goes through a [`Ledger`], and the
//! deferred call itself goes through a [`Dispatcher`]. Hosts plug in their
//! own implementations; the in-memory ones here back the test suite.

use alarum_core::types::{AccountId, Balance, Gas};
use std::collections::BTreeMap;
use thiserror::Error;

// ── Ledger ───────────────────────────────────────────────────────────────────

/// Credits value to accounts. Debiting happens from the request's own
/// escrow field before `credit` is called, never here.
pub trait Ledger {
    fn credit(&mut self, account: &AccountId, amount: Balance);
}

/// In-memory ledger keyed by account.
#[derive(Default, Debug, Clone)]
pub struct MemoryLedger {
    balances: BTreeMap<AccountId, Balance>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

impl Ledger for MemoryLedger {
    fn credit(&mut self, account: &AccountId, amount: Balance) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(account.clone()).or_insert(0) += amount;
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

/// Failure of the downstream call itself. Fatal to `execute`: the whole
/// operation rolls back with no persisted mutation.
#[derive(Debug, Error)]
#[error("dispatch to {destination} failed: {reason}")]
pub struct DispatchError {
    pub destination: AccountId,
    pub reason: String,
}

/// Performs the deferred call a request encapsulates.
pub trait Dispatcher {
    /// Deliver `payload` to `destination` with the given budget and attached
    /// value. Returns the gas actually consumed.
    fn dispatch(
        &mut self,
        destination: &AccountId,
        payload: &[u8],
        call_gas: Gas,
        call_value: Balance,
    ) -> Result<Gas, DispatchError>;
}

/// Dispatcher that records every delivery and reports a fixed gas figure.
#[derive(Default, Debug)]
pub struct RecordingDispatcher {
    pub delivered: Vec<(AccountId, Vec<u8>, Gas, Balance)>,
    pub gas_used: Gas,
    /// When set, every dispatch fails with this reason.
    pub fail_with: Option<String>,
}

impl RecordingDispatcher {
    pub fn new(gas_used: Gas) -> Self {
        Self {
            gas_used,
            ..Self::default()
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(
        &mut self,
        destination: &AccountId,
        payload: &[u8],
        call_gas: Gas,
        call_value: Balance,
    ) -> Result<Gas, DispatchError> {
        if let Some(reason) = &self.fail_with {
            return Err(DispatchError {
                destination: destination.clone(),
                reason: reason.clone(),
            });
        }
        self.delivered
            .push((destination.clone(), payload.to_vec(), call_gas, call_value));
        Ok(self.gas_used.min(call_gas))
    }
}
