//! Temporal predicates for a request's execution window.
//!
//! All schedule fields are tick counts in the request's `TemporalUnit`
//! (block heights or Unix seconds) and are compared against a `ChainTime`
//! observation taken at operation entry. The layout around `window_start`:
//!
//! ```text
//!   claim window          freeze          execution window
//! [start - claim_size ──────────── start)[start ───────── start + size)
//!                 [start - freeze, start)      [start, start + reserved)
//!                                               reserved sub-window
//! ```

use alarum_core::constants::PAYMENT_MODIFIER_MAX;
use alarum_core::types::{ChainTime, TemporalUnit};
use serde::{Deserialize, Serialize};

/// The temporal state of one request.
///
/// Invariant (enforced by the factory): `reserved_window_size <= window_size`
/// and, at creation, `window_start` lies beyond the freeze period from "now".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub unit: TemporalUnit,
    /// First tick at which execution is authorized.
    pub window_start: u64,
    /// Number of ticks the execution window stays open.
    pub window_size: u64,
    /// Leading slice of the window reserved for the claimant.
    pub reserved_window_size: u64,
    /// Ticks before `window_start` after which free owner cancellation ends.
    pub freeze_period: u64,
    /// Ticks before `window_start` during which a claim may be staked.
    pub claim_window_size: u64,
}

impl ScheduleWindow {
    fn now(&self, chain: &ChainTime) -> u64 {
        chain.tick(self.unit)
    }

    /// First tick at which the window has closed.
    pub fn window_end(&self) -> u64 {
        self.window_start.saturating_add(self.window_size)
    }

    pub fn is_before_window(&self, chain: &ChainTime) -> bool {
        self.now(chain) < self.window_start
    }

    pub fn is_after_window(&self, chain: &ChainTime) -> bool {
        self.now(chain) >= self.window_end()
    }

    pub fn in_window(&self, chain: &ChainTime) -> bool {
        let now = self.now(chain);
        now >= self.window_start && now < self.window_end()
    }

    /// True only while inside `[window_start, window_start + reserved_window_size)`.
    pub fn in_reserved_window(&self, chain: &ChainTime) -> bool {
        let now = self.now(chain);
        now >= self.window_start
            && now < self.window_start.saturating_add(self.reserved_window_size)
    }

    /// True only before `window_start` and at or after
    /// `window_start - claim_window_size`.
    pub fn in_claim_window(&self, chain: &ChainTime) -> bool {
        let now = self.now(chain);
        now < self.window_start && now >= self.window_start.saturating_sub(self.claim_window_size)
    }

    /// True while more than `freeze_period` ticks remain before `window_start`.
    pub fn is_before_freeze(&self, chain: &ChainTime) -> bool {
        self.now(chain).saturating_add(self.freeze_period) < self.window_start
    }

    /// Payment modifier for a claim staked at `chain`, or `None` outside the
    /// claim window.
    ///
    /// Linear descending curve over the claim window: the earliest possible
    /// claim earns the full 100, a claim immediately before the window earns
    /// approximately 0. Earlier claims commit capital for longer and are
    /// rewarded for it.
    pub fn compute_payment_modifier(&self, chain: &ChainTime) -> Option<u8> {
        if !self.in_claim_window(chain) {
            return None;
        }
        if self.claim_window_size == 0 {
            return Some(0);
        }
        let remaining = self.window_start - self.now(chain);
        let modifier = remaining
            .saturating_mul(PAYMENT_MODIFIER_MAX as u64)
            .checked_div(self.claim_window_size)
            .unwrap_or(0);
        Some(modifier.min(PAYMENT_MODIFIER_MAX as u64) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(window_start: u64) -> ScheduleWindow {
        ScheduleWindow {
            unit: TemporalUnit::Blocks,
            window_start,
            window_size: 255,
            reserved_window_size: 16,
            freeze_period: 10,
            claim_window_size: 255,
        }
    }

    fn at(block: u64) -> ChainTime {
        ChainTime::new(block, 0)
    }

    #[test]
    fn window_boundaries() {
        let s = blocks(1000);
        assert!(s.is_before_window(&at(999)));
        assert!(!s.is_before_window(&at(1000)));
        assert!(s.in_window(&at(1000)));
        assert!(s.in_window(&at(1254)));
        assert!(!s.in_window(&at(1255)));
        assert!(s.is_after_window(&at(1255)), "window is half-open at the end");
    }

    #[test]
    fn reserved_window_is_leading_slice() {
        let s = blocks(1000);
        assert!(!s.in_reserved_window(&at(999)));
        assert!(s.in_reserved_window(&at(1000)));
        assert!(s.in_reserved_window(&at(1015)));
        assert!(!s.in_reserved_window(&at(1016)));
    }

    #[test]
    fn claim_window_is_strictly_pre_window() {
        let s = blocks(1000);
        assert!(!s.in_claim_window(&at(744)));
        assert!(s.in_claim_window(&at(745)));
        assert!(s.in_claim_window(&at(999)));
        assert!(!s.in_claim_window(&at(1000)), "claiming closes at window start");
    }

    #[test]
    fn freeze_boundary() {
        let s = blocks(1000);
        assert!(s.is_before_freeze(&at(989)));
        assert!(!s.is_before_freeze(&at(990)), "within 10 blocks of start is frozen");
        assert!(!s.is_before_freeze(&at(1000)));
    }

    #[test]
    fn payment_modifier_descends_linearly() {
        let s = blocks(1000);
        // Earliest claimable tick.
        assert_eq!(s.compute_payment_modifier(&at(745)), Some(100));
        // Midway.
        let mid = s.compute_payment_modifier(&at(1000 - 128)).unwrap();
        assert!((49..=51).contains(&mid), "midway modifier should be ~50, got {mid}");
        // Last claimable tick.
        assert_eq!(s.compute_payment_modifier(&at(999)), Some(0));
        // Outside the claim window.
        assert_eq!(s.compute_payment_modifier(&at(700)), None);
        assert_eq!(s.compute_payment_modifier(&at(1000)), None);
    }

    #[test]
    fn timestamp_unit_reads_the_clock() {
        let s = ScheduleWindow {
            unit: TemporalUnit::Timestamp,
            window_start: 2_000_000,
            window_size: 3_600,
            reserved_window_size: 300,
            freeze_period: 180,
            claim_window_size: 3_600,
        };
        let chain = ChainTime::new(0, 2_000_100);
        assert!(s.in_window(&chain));
        assert!(s.in_reserved_window(&chain));
    }
}
