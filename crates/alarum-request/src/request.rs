//! The request lifecycle state machine.
//!
//! A `Request` composes its schedule, claim, and payment state with the
//! execution parameters of the deferred call, and owns the ordered
//! authorization → execution → accounting protocol of `execute`, plus
//! `cancel`, `claim`, and the pull-payment refund entrypoints.
//!
//! Two error tiers apply throughout (soft aborts inside `execute` complete
//! successfully with a diagnostic reason; everything else is fatal and
//! mutates nothing), and every field that gates a one-time payout is reset
//! to its spent value strictly before the corresponding transfer.

use alarum_core::constants::{
    CANCEL_BOUNTY_DIVISOR, CANCEL_GAS, EXECUTION_EXTRA_GAS, EXECUTION_GAS_OVERHEAD,
    PRE_EXECUTION_GAS,
};
use alarum_core::error::AlarumError;
use alarum_core::types::{AccountId, Balance, ChainTime, Gas, GasPrice, RequestId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::claim::ClaimState;
use crate::ledger::{Dispatcher, Ledger};
use crate::payment::PaymentState;
use crate::schedule::ScheduleWindow;

// ── Call parameters ──────────────────────────────────────────────────────────

/// The deferred call a request encapsulates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpec {
    pub destination: AccountId,
    pub payload: Vec<u8>,
    /// Budget forwarded to the downstream call.
    pub call_gas: Gas,
    /// Value attached to the downstream call, funded from the escrow.
    pub call_value: Balance,
}

// ── Identity and status ──────────────────────────────────────────────────────

/// Identity and status flags. All flags are monotonic: false → true, never
/// reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub creator: AccountId,
    pub owner: AccountId,
    pub is_cancelled: bool,
    pub was_called: bool,
    pub was_successful: bool,
}

// ── Operation context ────────────────────────────────────────────────────────

/// Per-call facts about the caller and the ledger observation, supplied by
/// the host at operation entry.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub caller: AccountId,
    /// Gas price the caller is executing at.
    pub gas_price: GasPrice,
    /// Remaining execution budget at entry.
    pub gas_provided: Gas,
    pub chain: ChainTime,
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// Why `execute` declined without reverting. Codes 0–5 are stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    InsufficientGas = 0,
    AlreadyCalled = 1,
    WasCancelled = 2,
    BeforeCallWindow = 3,
    AfterCallWindow = 4,
    ReservedForClaimer = 5,
}

impl AbortReason {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Result of a non-fatal `execute` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The downstream call ran; figures are the amounts actually swept.
    Executed {
        payment: Balance,
        donation: Balance,
        gas_used: Gas,
    },
    /// A benign precondition failed; nothing was mutated.
    Aborted(AbortReason),
}

impl ExecuteOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecuteOutcome::Executed { .. })
    }
}

/// Result of a successful `cancel`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelReceipt {
    /// Reward paid to a third-party canceller (0 for the owner).
    pub reward: Balance,
    /// Gas figure reimbursed inside the reward.
    pub gas_used: Gas,
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// Structured point-in-time view of a request, for off-ledger executors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub id: RequestId,
    pub call: CallSpec,
    pub meta: RequestMeta,
    pub schedule: ScheduleWindow,
    pub claim: ClaimState,
    pub payment: PaymentState,
    pub escrow_balance: Balance,
}

// ── Request ──────────────────────────────────────────────────────────────────

/// One scheduled call with its escrowed economics.
///
/// Created once by the factory with terms fixed; mutated only through
/// `claim`, `execute`, `cancel`, and the refund entrypoints. Once
/// `is_cancelled` or `was_called` is set the request is terminal and only
/// refund/withdraw operations remain meaningful.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub call: CallSpec,
    pub meta: RequestMeta,
    pub schedule: ScheduleWindow,
    pub claim: ClaimState,
    pub payment: PaymentState,
    /// Explicit escrow owned by the request; never a query of host state.
    pub escrow_balance: Balance,
}

impl Request {
    pub fn new(
        id: RequestId,
        creator: AccountId,
        owner: AccountId,
        call: CallSpec,
        schedule: ScheduleWindow,
        payment: PaymentState,
        endowment: Balance,
    ) -> Self {
        Self {
            id,
            call,
            meta: RequestMeta {
                creator,
                owner,
                is_cancelled: false,
                was_called: false,
                was_successful: false,
            },
            schedule,
            claim: ClaimState::unclaimed(),
            payment,
            escrow_balance: endowment,
        }
    }

    // ── Views ────────────────────────────────────────────────────────────────

    pub fn is_terminal(&self) -> bool {
        self.meta.is_cancelled || self.meta.was_called
    }

    /// Execution budget a caller must bring to attempt `execute`.
    pub fn required_execution_gas(&self) -> Gas {
        self.call.call_gas.saturating_add(EXECUTION_GAS_OVERHEAD)
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            id: self.id.clone(),
            call: self.call.clone(),
            meta: self.meta.clone(),
            schedule: self.schedule,
            claim: self.claim.clone(),
            payment: self.payment.clone(),
            escrow_balance: self.escrow_balance,
        }
    }

    pub fn call_data(&self) -> &[u8] {
        &self.call.payload
    }

    /// Solvency invariant: the escrow covers every committed balance.
    pub fn is_solvent(&self) -> bool {
        self.escrow_balance >= self.committed_balance()
    }

    fn committed_balance(&self) -> Balance {
        self.claim
            .deposit
            .saturating_add(self.payment.payment_owed)
            .saturating_add(self.payment.donation_owed)
    }

    /// Escrow not yet committed to a deposit or owed balance.
    fn headroom(&self) -> Balance {
        self.escrow_balance.saturating_sub(self.committed_balance())
    }

    // ── Accrual (clamped to headroom so solvency holds structurally) ─────────

    fn accrue_payment(&mut self, amount: Balance) -> Balance {
        let add = amount.min(self.headroom());
        self.payment.payment_owed += add;
        add
    }

    fn accrue_donation(&mut self, amount: Balance) -> Balance {
        let add = amount.min(self.headroom());
        self.payment.donation_owed += add;
        add
    }

    // ── execute ──────────────────────────────────────────────────────────────

    /// Ordered authorization checks; the first failure wins.
    fn authorize_execution(&self, ctx: &ExecutionContext) -> Option<AbortReason> {
        let required = self
            .required_execution_gas()
            .saturating_sub(PRE_EXECUTION_GAS);
        if ctx.gas_provided < required {
            return Some(AbortReason::InsufficientGas);
        }
        if self.meta.was_called {
            return Some(AbortReason::AlreadyCalled);
        }
        if self.meta.is_cancelled {
            return Some(AbortReason::WasCancelled);
        }
        if self.schedule.is_before_window(&ctx.chain) {
            return Some(AbortReason::BeforeCallWindow);
        }
        if self.schedule.is_after_window(&ctx.chain) {
            return Some(AbortReason::AfterCallWindow);
        }
        if self.claim.is_claimed()
            && !self.claim.is_claimed_by(&ctx.caller)
            && self.schedule.in_reserved_window(&ctx.chain)
        {
            return Some(AbortReason::ReservedForClaimer);
        }
        None
    }

    /// Trigger the deferred call.
    ///
    /// Benign non-readiness returns `Ok(Aborted(reason))` with no mutation
    /// beyond a log line. A failing downstream call is fatal and rolls the
    /// whole operation back. On success the executor is paid, the donation
    /// swept, and any residual escrow returned to the owner.
    pub fn execute(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn Ledger,
        dispatcher: &mut dyn Dispatcher,
    ) -> Result<ExecuteOutcome, AlarumError> {
        if let Some(reason) = self.authorize_execution(ctx) {
            warn!(
                request = %self.id,
                caller = %ctx.caller,
                code = reason.code(),
                reason = ?reason,
                "execution aborted"
            );
            return Ok(ExecuteOutcome::Aborted(reason));
        }

        // Stage all mutations; commit only after the downstream call lands.
        let mut staged = self.clone();

        // The guard goes up before the call: a reentrant `execute` against
        // the committed state will hit AlreadyCalled.
        staged.meta.was_called = true;

        let gas_used = dispatcher
            .dispatch(
                &staged.call.destination,
                &staged.call.payload,
                staged.call.call_gas,
                staged.call.call_value,
            )
            .map_err(|e| AlarumError::CallFailed(e.to_string()))?;

        staged.meta.was_successful = true;
        // The attached value left with the call.
        staged.escrow_balance = staged.escrow_balance.saturating_sub(staged.call.call_value);

        // ── Accounting ───────────────────────────────────────────────────────

        let mut donation = 0;
        if staged.payment.has_benefactor() {
            let d = staged.payment.donation(ctx.gas_price);
            staged.accrue_donation(d);
            donation = staged
                .payment
                .send_donation(&mut staged.escrow_balance, ledger);
        }

        staged.payment.payment_benefactor = Some(ctx.caller.clone());

        if staged.claim.is_claimed() {
            // The claimant's deposit folds into the payout, spent first.
            let deposit = staged.claim.deposit;
            staged.claim.deposit = 0;
            staged.payment.payment_owed += deposit;
            let p = staged
                .payment
                .payment_with_modifier(ctx.gas_price, staged.claim.payment_modifier);
            staged.accrue_payment(p);
        } else {
            let p = staged.payment.payment(ctx.gas_price);
            staged.accrue_payment(p);
        }

        let measured = gas_used.saturating_add(EXECUTION_EXTRA_GAS);
        staged.accrue_payment((measured as u128).saturating_mul(ctx.gas_price));

        info!(
            request = %staged.id,
            executor = %ctx.caller,
            payment = staged.payment.payment_owed,
            donation,
            gas_used = measured,
            "executed"
        );

        let payment = staged
            .payment
            .send_payment(&mut staged.escrow_balance, ledger);

        // Terminal now: nothing remains committed, return the rest.
        staged.sweep_owner_residue(ledger);

        *self = staged;
        Ok(ExecuteOutcome::Executed {
            payment,
            donation,
            gas_used: measured,
        })
    }

    // ── cancel ───────────────────────────────────────────────────────────────

    /// Cancel the request.
    ///
    /// Eligible iff not already cancelled and either the window has closed
    /// unexecuted (anyone may clean up, for a reward) or the owner cancels
    /// an unclaimed request before the freeze.
    pub fn cancel(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn Ledger,
    ) -> Result<CancelReceipt, AlarumError> {
        if self.meta.is_cancelled {
            return Err(AlarumError::NotCancellable);
        }
        let stale = !self.meta.was_called && self.schedule.is_after_window(&ctx.chain);
        let owner_early = !self.claim.is_claimed()
            && self.schedule.is_before_freeze(&ctx.chain)
            && ctx.caller == self.meta.owner;
        if !stale && !owner_early {
            return Err(AlarumError::NotCancellable);
        }

        // Guard before any transfer.
        self.meta.is_cancelled = true;

        if self.claim.deposit > 0 {
            if let Some(claimant) = self.claim.claimant.clone() {
                let deposit = self.claim.deposit.min(self.escrow_balance);
                self.claim.deposit = 0;
                self.escrow_balance -= deposit;
                ledger.credit(&claimant, deposit);
            }
        }

        let mut reward = 0;
        if ctx.caller != self.meta.owner {
            // Incentive to clean up abandoned requests: outstanding payment
            // plus 1% of the base payment plus gas for this call.
            let bounty = self
                .payment
                .payment_owed
                .saturating_add(self.payment.base_payment / CANCEL_BOUNTY_DIVISOR)
                .saturating_add((CANCEL_GAS as u128).saturating_mul(ctx.gas_price));
            self.payment.payment_owed = 0;
            reward = bounty.min(self.escrow_balance);
            self.escrow_balance -= reward;
            ledger.credit(&ctx.caller, reward);
        }

        info!(
            request = %self.id,
            canceller = %ctx.caller,
            reward,
            gas_used = CANCEL_GAS,
            "cancelled"
        );

        self.sweep_owner_residue(ledger);
        Ok(CancelReceipt {
            reward,
            gas_used: CANCEL_GAS,
        })
    }

    // ── claim ────────────────────────────────────────────────────────────────

    /// Stake a deposit for exclusive execution rights in the reserved
    /// sub-window. Write-once; the stake joins the escrow and the payment
    /// modifier is fixed here. Returns the modifier.
    pub fn claim(&mut self, ctx: &ExecutionContext, stake: Balance) -> Result<u8, AlarumError> {
        if self.claim.is_claimed() {
            return Err(AlarumError::AlreadyClaimed);
        }
        if self.meta.is_cancelled {
            return Err(AlarumError::ClaimOnCancelled);
        }
        if !self.schedule.in_claim_window(&ctx.chain) {
            return Err(AlarumError::NotInClaimWindow);
        }
        let required = ClaimState::required_deposit(self.payment.base_payment);
        if stake <= required {
            return Err(AlarumError::InsufficientStake {
                need: required,
                got: stake,
            });
        }
        let modifier = self
            .schedule
            .compute_payment_modifier(&ctx.chain)
            .ok_or(AlarumError::NotInClaimWindow)?;

        self.claim.claimant = Some(ctx.caller.clone());
        self.claim.deposit = stake;
        self.claim.payment_modifier = modifier;
        self.escrow_balance = self.escrow_balance.saturating_add(stake);

        info!(
            request = %self.id,
            claimant = %ctx.caller,
            deposit = stake,
            modifier,
            "claimed"
        );
        Ok(modifier)
    }

    // ── Refunds and pull withdrawals ─────────────────────────────────────────

    /// Return the claim deposit to the claimant, once the request is
    /// cancelled or its window has closed. Exactly-once: the deposit is
    /// zeroed before the transfer and a second call fails.
    pub fn refund_claim_deposit(
        &mut self,
        chain: &ChainTime,
        ledger: &mut dyn Ledger,
    ) -> Result<Balance, AlarumError> {
        if !self.meta.is_cancelled && !self.schedule.is_after_window(chain) {
            return Err(AlarumError::NotYetTerminal);
        }
        let claimant = self
            .claim
            .claimant
            .clone()
            .ok_or(AlarumError::NoDepositOutstanding)?;
        if self.claim.deposit == 0 {
            return Err(AlarumError::NoDepositOutstanding);
        }
        let amount = self.claim.deposit.min(self.escrow_balance);
        self.claim.deposit = 0;
        self.escrow_balance -= amount;
        ledger.credit(&claimant, amount);
        Ok(amount)
    }

    /// Sweep any owed donation once the window has closed (or the request
    /// is terminal). Callable by anyone.
    pub fn send_donation(
        &mut self,
        chain: &ChainTime,
        ledger: &mut dyn Ledger,
    ) -> Result<Balance, AlarumError> {
        if !self.schedule.is_after_window(chain) && !self.is_terminal() {
            return Err(AlarumError::WindowStillOpen);
        }
        Ok(self.payment.send_donation(&mut self.escrow_balance, ledger))
    }

    /// Sweep any owed payment once the window has closed (or the request
    /// is terminal). Callable by anyone.
    pub fn send_payment(
        &mut self,
        chain: &ChainTime,
        ledger: &mut dyn Ledger,
    ) -> Result<Balance, AlarumError> {
        if !self.schedule.is_after_window(chain) && !self.is_terminal() {
            return Err(AlarumError::WindowStillOpen);
        }
        Ok(self.payment.send_payment(&mut self.escrow_balance, ledger))
    }

    /// Return uncommitted escrow to the owner once the request is terminal.
    pub fn send_owner_residue(&mut self, ledger: &mut dyn Ledger) -> Result<Balance, AlarumError> {
        if !self.is_terminal() {
            return Err(AlarumError::NotYetTerminal);
        }
        Ok(self.sweep_owner_residue(ledger))
    }

    fn sweep_owner_residue(&mut self, ledger: &mut dyn Ledger) -> Balance {
        let residue = self.headroom();
        if residue > 0 {
            self.escrow_balance -= residue;
            ledger.credit(&self.meta.owner, residue);
        }
        residue
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
