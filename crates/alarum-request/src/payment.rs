//! Payment and donation terms, the gas-price-relative multiplier, and the
//! pull-payment transfer primitives.

use alarum_core::constants::{MULTIPLIER_CEILING, MULTIPLIER_PAR};
use alarum_core::types::{AccountId, Balance, GasPrice};
use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;

/// Economic terms and accrued owed balances of one request.
///
/// `payment_owed` and `donation_owed` are pull-payable: they are accrued
/// during `execute`/`cancel` and swept in a separate zero-before-transfer
/// step, so a reentrant receiver always observes a zero owed balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentState {
    /// Payment at multiplier 100, fixed at creation.
    pub base_payment: Balance,
    /// Donation at multiplier 100, fixed at creation.
    pub base_donation: Balance,
    /// Referral beneficiary; `None` disables donations entirely.
    pub donation_benefactor: Option<AccountId>,
    /// Set to the executor at execution time.
    pub payment_benefactor: Option<AccountId>,
    /// Gas price recorded at creation; the multiplier pivots around it.
    pub anchor_gas_price: GasPrice,
    /// Accrued, not-yet-swept payment balance.
    pub payment_owed: Balance,
    /// Accrued, not-yet-swept donation balance.
    pub donation_owed: Balance,
}

impl PaymentState {
    pub fn new(
        base_payment: Balance,
        base_donation: Balance,
        donation_benefactor: Option<AccountId>,
        anchor_gas_price: GasPrice,
    ) -> Self {
        Self {
            base_payment,
            base_donation,
            donation_benefactor,
            payment_benefactor: None,
            anchor_gas_price,
            payment_owed: 0,
            donation_owed: 0,
        }
    }

    pub fn has_benefactor(&self) -> bool {
        self.donation_benefactor.is_some()
    }

    /// Gas-price-relative scale factor in 0..=200 percent.
    ///
    /// Above the anchor the multiplier shrinks toward 0 (`anchor*100 /
    /// current`), penalizing wasteful gas pricing. At or below the anchor it
    /// rises continuously from 100 toward 200 (`200 - current*100 / anchor`),
    /// rewarding cheap execution.
    pub fn multiplier(&self, current_gas_price: GasPrice) -> u128 {
        if self.anchor_gas_price == 0 {
            return MULTIPLIER_PAR;
        }
        if current_gas_price > self.anchor_gas_price {
            self.anchor_gas_price
                .saturating_mul(100)
                .checked_div(current_gas_price)
                .unwrap_or(0)
        } else {
            let discount = current_gas_price.saturating_mul(100) / self.anchor_gas_price;
            (MULTIPLIER_CEILING - discount).min(MULTIPLIER_CEILING)
        }
    }

    /// Donation scaled by the multiplier; zero when the multiplier is zero.
    pub fn donation(&self, current_gas_price: GasPrice) -> Balance {
        let m = self.multiplier(current_gas_price);
        if m == 0 {
            return 0;
        }
        self.base_donation.saturating_mul(m) / 100
    }

    /// Payment scaled by the multiplier.
    pub fn payment(&self, current_gas_price: GasPrice) -> Balance {
        self.base_payment.saturating_mul(self.multiplier(current_gas_price)) / 100
    }

    /// Payment scaled by the multiplier and then by the claim-time modifier.
    /// Applied only when the request was claimed.
    pub fn payment_with_modifier(&self, current_gas_price: GasPrice, modifier: u8) -> Balance {
        self.payment(current_gas_price).saturating_mul(modifier as u128) / 100
    }

    // ── Pull-payment primitives ──────────────────────────────────────────────

    /// Sweep the owed donation to the donation benefactor.
    ///
    /// The owed balance is zeroed strictly before the ledger credit, so any
    /// reentry from the receiving side sees nothing left to sweep. Returns
    /// the amount transferred (0 when nothing was owed or no benefactor).
    pub fn send_donation(&mut self, escrow: &mut Balance, ledger: &mut dyn Ledger) -> Balance {
        let benefactor = match &self.donation_benefactor {
            Some(b) => b.clone(),
            None => return 0,
        };
        let amount = self.donation_owed.min(*escrow);
        self.donation_owed = 0;
        *escrow -= amount;
        ledger.credit(&benefactor, amount);
        amount
    }

    /// Sweep the owed payment to the payment benefactor, zero-before-transfer.
    pub fn send_payment(&mut self, escrow: &mut Balance, ledger: &mut dyn Ledger) -> Balance {
        let benefactor = match &self.payment_benefactor {
            Some(b) => b.clone(),
            None => return 0,
        };
        let amount = self.payment_owed.min(*escrow);
        self.payment_owed = 0;
        *escrow -= amount;
        ledger.credit(&benefactor, amount);
        amount
    }
}
