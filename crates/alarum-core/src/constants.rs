//! Protocol constants.
//!
//! A request escrows an endowment at creation, executors race to trigger it
//! once its window opens, and a claimant may pre-stake a deposit for
//! exclusive rights to the leading slice of that window.

// ── Economic factors ─────────────────────────────────────────────────────────

/// Maximum value of the gas-price multiplier (percent). Payment and donation
/// scale in 0..=200 around the anchor gas price recorded at creation.
pub const MULTIPLIER_CEILING: u128 = 200;

/// Multiplier value when the executing gas price equals the anchor.
pub const MULTIPLIER_PAR: u128 = 100;

/// A claim stake must strictly exceed `CLAIM_DEPOSIT_FACTOR * base_payment`.
pub const CLAIM_DEPOSIT_FACTOR: u128 = 2;

/// Payment modifier granted to a claim, in percent. Fixed at claim time.
pub const PAYMENT_MODIFIER_MAX: u8 = 100;

/// Endowment safety margin: payment, donation, and gas cost are all funded
/// at twice their base value, covering the 200% multiplier ceiling plus
/// cost volatility.
pub const ENDOWMENT_MARGIN: u128 = 2;

/// Share of the base payment awarded to a third-party canceller, as a
/// divisor: reward includes `base_payment / CANCEL_BOUNTY_DIVISOR` (1%).
pub const CANCEL_BOUNTY_DIVISOR: u128 = 100;

// ── Gas accounting ───────────────────────────────────────────────────────────

/// Overhead charged on top of the downstream call's own budget when sizing
/// the total execution budget a caller must bring.
pub const EXECUTION_GAS_OVERHEAD: u64 = 180_000;

/// Budget already burned before `execute`'s own gas check can run; the
/// authorization check forgives this much of the requirement.
pub const PRE_EXECUTION_GAS: u64 = 25_000;

/// Gas spent after measurement stops inside `execute` (event emission and
/// payout sweeps). Added to the measured figure before reimbursement.
pub const EXECUTION_EXTRA_GAS: u64 = 90_000;

/// Flat gas estimate reimbursed to a third-party canceller.
pub const CANCEL_GAS: u64 = 85_000;

/// Ceiling on a single downstream call budget plus overhead.
pub const EXECUTION_GAS_CEILING: u64 = 12_000_000;

// ── Schedule defaults: block unit ────────────────────────────────────────────

/// Default execution window size (blocks).
pub const DEFAULT_WINDOW_SIZE_BLOCKS: u64 = 255;

/// Default reserved sub-window for the claimant (blocks).
pub const DEFAULT_RESERVED_WINDOW_SIZE_BLOCKS: u64 = 16;

/// Default freeze period before window start (blocks).
pub const DEFAULT_FREEZE_PERIOD_BLOCKS: u64 = 10;

/// Default claim window size before window start (blocks).
pub const DEFAULT_CLAIM_WINDOW_SIZE_BLOCKS: u64 = 255;

// ── Schedule defaults: timestamp unit ────────────────────────────────────────

/// Default execution window size (seconds): one hour.
pub const DEFAULT_WINDOW_SIZE_SECS: u64 = 3_600;

/// Default reserved sub-window (seconds): five minutes.
pub const DEFAULT_RESERVED_WINDOW_SIZE_SECS: u64 = 300;

/// Default freeze period (seconds): three minutes.
pub const DEFAULT_FREEZE_PERIOD_SECS: u64 = 180;

/// Default claim window size (seconds): one hour.
pub const DEFAULT_CLAIM_WINDOW_SIZE_SECS: u64 = 3_600;

// ── Builder defaults ─────────────────────────────────────────────────────────

/// Default downstream call budget filled in by the scheduler.
pub const DEFAULT_CALL_GAS: u64 = 200_000;

/// Default anchor gas price filled in by the scheduler.
pub const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;

/// Default base payment filled in by the scheduler.
pub const DEFAULT_BASE_PAYMENT: u128 = 1_000_000_000_000_000;

/// Default donation, as a divisor of the base payment (1%).
pub const DEFAULT_DONATION_DIVISOR: u128 = 100;
