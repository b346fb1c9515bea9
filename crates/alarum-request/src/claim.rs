//! Exclusive-claim escrow state.

use alarum_core::constants::CLAIM_DEPOSIT_FACTOR;
use alarum_core::types::{AccountId, Balance};
use serde::{Deserialize, Serialize};

/// Claim state of a request.
///
/// `claimant` is write-once: there is no re-claiming and no un-claiming.
/// The payment modifier is fixed at claim time and never recomputed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimState {
    /// The exclusive claimant, if any.
    pub claimant: Option<AccountId>,
    /// Stake escrowed by the claimant. Zeroed when folded into a payout.
    pub deposit: Balance,
    /// 0–100 percent applied to the payment when the claimant's request
    /// executes. Fixed by `ScheduleWindow::compute_payment_modifier`.
    pub payment_modifier: u8,
}

impl ClaimState {
    pub fn unclaimed() -> Self {
        Self {
            claimant: None,
            deposit: 0,
            payment_modifier: 0,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimant.is_some()
    }

    /// The stake a claimant must strictly exceed.
    pub fn required_deposit(base_payment: Balance) -> Balance {
        base_payment.saturating_mul(CLAIM_DEPOSIT_FACTOR)
    }

    /// True iff `caller` holds the claim.
    pub fn is_claimed_by(&self, caller: &AccountId) -> bool {
        self.claimant.as_ref() == Some(caller)
    }
}
