use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlarumError {
    // ── Claim errors ─────────────────────────────────────────────────────────
    #[error("request already claimed")]
    AlreadyClaimed,

    #[error("request is cancelled; claiming is closed")]
    ClaimOnCancelled,

    #[error("outside the claim window")]
    NotInClaimWindow,

    #[error("claim stake too small: must exceed {need}, got {got}")]
    InsufficientStake { need: u128, got: u128 },

    // ── Cancel errors ────────────────────────────────────────────────────────
    #[error("request is not cancellable in its current state")]
    NotCancellable,

    // ── Execution errors ─────────────────────────────────────────────────────
    #[error("downstream call failed: {0}")]
    CallFailed(String),

    // ── Refund / withdrawal errors ───────────────────────────────────────────
    #[error("request is not yet terminal; funds remain committed")]
    NotYetTerminal,

    #[error("no claim deposit outstanding")]
    NoDepositOutstanding,

    #[error("call window has not closed; owed balances are not yet sweepable")]
    WindowStillOpen,

    // ── Creation errors ──────────────────────────────────────────────────────
    #[error("invalid request parameters: {0:?}")]
    InvalidRequestParams([bool; 6]),

    #[error("escrow cannot fund the endowment: need {need}, have {have}")]
    InsufficientEscrow { need: u128, have: u128 },

    // ── Tracker errors ───────────────────────────────────────────────────────
    #[error("request not tracked: {0}")]
    RequestNotTracked(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
