use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance in wei-equivalent base units. u128 comfortably covers any
/// endowment plus stacked deposits without overflow in normal operation.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Ledger block height.
pub type BlockNumber = u64;

/// Execution budget units for a downstream call.
pub type Gas = u64;

/// Price paid per unit of execution budget.
pub type GasPrice = u128;

// ── AccountId ────────────────────────────────────────────────────────────────

/// 32-byte account identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero account. Never a valid destination or benefactor.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, bs58::decode::Error> {
        let bytes = bs58::decode(s).into_vec()?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32]);
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_b58()[..8])
    }
}

// ── RequestId ────────────────────────────────────────────────────────────────

/// 32-byte request identifier: BLAKE3 of (creator ‖ sequence ‖ window_start).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub [u8; 32]);

impl RequestId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a request id from its creator, a per-creator sequence number,
    /// and the scheduled window start.
    pub fn derive(creator: &AccountId, sequence: u64, window_start: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(creator.as_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.update(&window_start.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32]);
        Ok(Self(arr))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({}…)", &self.to_hex()[..16])
    }
}

// ── Temporal model ───────────────────────────────────────────────────────────

/// Which clock a request's schedule is measured against.
///
/// Every schedule field (window start, window size, freeze period, …) is a
/// plain `u64` tick count interpreted in this unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalUnit {
    /// Ticks are ledger block heights.
    Blocks,
    /// Ticks are Unix-timestamp seconds.
    Timestamp,
}

/// A point-in-time observation of the underlying ledger.
///
/// Deadlines are never callbacks; they are data compared against one of
/// these at operation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTime {
    pub block_number: BlockNumber,
    pub timestamp: Timestamp,
}

impl ChainTime {
    pub fn new(block_number: BlockNumber, timestamp: Timestamp) -> Self {
        Self {
            block_number,
            timestamp,
        }
    }

    /// Current tick in the given unit.
    pub fn tick(&self, unit: TemporalUnit) -> u64 {
        match unit {
            TemporalUnit::Blocks => self.block_number,
            TemporalUnit::Timestamp => self.timestamp.max(0) as u64,
        }
    }
}
