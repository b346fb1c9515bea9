//! The scheduler: calibrated defaults plus endowment sizing, driving
//! request creation through the factory and registration in the tracker.

use alarum_core::constants::{
    DEFAULT_BASE_PAYMENT, DEFAULT_CALL_GAS, DEFAULT_CLAIM_WINDOW_SIZE_BLOCKS,
    DEFAULT_CLAIM_WINDOW_SIZE_SECS, DEFAULT_DONATION_DIVISOR, DEFAULT_FREEZE_PERIOD_BLOCKS,
    DEFAULT_FREEZE_PERIOD_SECS, DEFAULT_GAS_PRICE, DEFAULT_RESERVED_WINDOW_SIZE_BLOCKS,
    DEFAULT_RESERVED_WINDOW_SIZE_SECS, DEFAULT_WINDOW_SIZE_BLOCKS, DEFAULT_WINDOW_SIZE_SECS,
};
use alarum_core::error::AlarumError;
use alarum_core::types::{AccountId, Balance, ChainTime, Gas, GasPrice, TemporalUnit};
use alarum_request::request::Request;
use alarum_request::schedule::ScheduleWindow;
use alarum_tracker::RequestTracker;
use tracing::info;

use crate::factory::{RequestFactory, RequestParams};

/// Fluent request description. Unset fields fall back to calibrated
/// defaults for the chosen temporal mode.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    unit: TemporalUnit,
    window_start: u64,
    window_size: Option<u64>,
    reserved_window_size: Option<u64>,
    freeze_period: Option<u64>,
    claim_window_size: Option<u64>,
    destination: Option<AccountId>,
    payload: Vec<u8>,
    call_gas: Option<Gas>,
    call_value: Balance,
    base_payment: Option<Balance>,
    base_donation: Option<Balance>,
    donation_benefactor: Option<AccountId>,
    anchor_gas_price: Option<GasPrice>,
    owner: Option<AccountId>,
}

impl RequestBuilder {
    fn new(unit: TemporalUnit, window_start: u64) -> Self {
        Self {
            unit,
            window_start,
            window_size: None,
            reserved_window_size: None,
            freeze_period: None,
            claim_window_size: None,
            destination: None,
            payload: Vec::new(),
            call_gas: None,
            call_value: 0,
            base_payment: None,
            base_donation: None,
            donation_benefactor: None,
            anchor_gas_price: None,
            owner: None,
        }
    }

    /// Block-height schedule opening at `window_start`.
    pub fn at_block(window_start: u64) -> Self {
        Self::new(TemporalUnit::Blocks, window_start)
    }

    /// Wall-clock schedule opening at `window_start` (Unix seconds).
    pub fn at_timestamp(window_start: u64) -> Self {
        Self::new(TemporalUnit::Timestamp, window_start)
    }

    pub fn window_size(mut self, ticks: u64) -> Self {
        self.window_size = Some(ticks);
        self
    }

    pub fn reserved_window_size(mut self, ticks: u64) -> Self {
        self.reserved_window_size = Some(ticks);
        self
    }

    pub fn freeze_period(mut self, ticks: u64) -> Self {
        self.freeze_period = Some(ticks);
        self
    }

    pub fn claim_window_size(mut self, ticks: u64) -> Self {
        self.claim_window_size = Some(ticks);
        self
    }

    pub fn destination(mut self, destination: AccountId) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn call_gas(mut self, gas: Gas) -> Self {
        self.call_gas = Some(gas);
        self
    }

    pub fn call_value(mut self, value: Balance) -> Self {
        self.call_value = value;
        self
    }

    pub fn base_payment(mut self, payment: Balance) -> Self {
        self.base_payment = Some(payment);
        self
    }

    pub fn base_donation(mut self, donation: Balance) -> Self {
        self.base_donation = Some(donation);
        self
    }

    pub fn donation_benefactor(mut self, benefactor: AccountId) -> Self {
        self.donation_benefactor = Some(benefactor);
        self
    }

    pub fn anchor_gas_price(mut self, price: GasPrice) -> Self {
        self.anchor_gas_price = Some(price);
        self
    }

    pub fn owner(mut self, owner: AccountId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Resolve every unset field to its calibrated default. The scheduling
    /// caller becomes destination and owner unless overridden.
    fn resolve(self, caller: &AccountId) -> RequestParams {
        let (window, reserved, freeze, claim) = match self.unit {
            TemporalUnit::Blocks => (
                DEFAULT_WINDOW_SIZE_BLOCKS,
                DEFAULT_RESERVED_WINDOW_SIZE_BLOCKS,
                DEFAULT_FREEZE_PERIOD_BLOCKS,
                DEFAULT_CLAIM_WINDOW_SIZE_BLOCKS,
            ),
            TemporalUnit::Timestamp => (
                DEFAULT_WINDOW_SIZE_SECS,
                DEFAULT_RESERVED_WINDOW_SIZE_SECS,
                DEFAULT_FREEZE_PERIOD_SECS,
                DEFAULT_CLAIM_WINDOW_SIZE_SECS,
            ),
        };
        let base_payment = self.base_payment.unwrap_or(DEFAULT_BASE_PAYMENT);
        RequestParams {
            creator: caller.clone(),
            owner: self.owner.unwrap_or_else(|| caller.clone()),
            destination: self.destination.unwrap_or_else(|| caller.clone()),
            payload: self.payload,
            call_gas: self.call_gas.unwrap_or(DEFAULT_CALL_GAS),
            call_value: self.call_value,
            base_payment,
            base_donation: self
                .base_donation
                .unwrap_or(base_payment / DEFAULT_DONATION_DIVISOR),
            donation_benefactor: self.donation_benefactor,
            anchor_gas_price: self.anchor_gas_price.unwrap_or(DEFAULT_GAS_PRICE),
            schedule: ScheduleWindow {
                unit: self.unit,
                window_start: self.window_start,
                window_size: self.window_size.unwrap_or(window),
                reserved_window_size: self.reserved_window_size.unwrap_or(reserved),
                freeze_period: self.freeze_period.unwrap_or(freeze),
                claim_window_size: self.claim_window_size.unwrap_or(claim),
            },
        }
    }
}

/// Drives creation: sizes the endowment, requires the caller's balance to
/// cover it, mints through the factory, and indexes in the tracker.
pub struct Scheduler<'a> {
    factory: &'a mut RequestFactory,
    tracker: &'a RequestTracker,
}

impl<'a> Scheduler<'a> {
    pub fn new(factory: &'a mut RequestFactory, tracker: &'a RequestTracker) -> Self {
        Self { factory, tracker }
    }

    /// Schedule a request for `caller`, funding it from `available_balance`.
    ///
    /// Fails loudly when the balance cannot cover the computed endowment;
    /// an under-funded request is never created. Returns the request and
    /// the endowment actually escrowed.
    pub fn schedule(
        &mut self,
        caller: &AccountId,
        available_balance: Balance,
        builder: RequestBuilder,
        chain: &ChainTime,
    ) -> Result<(Request, Balance), AlarumError> {
        let params = builder.resolve(caller);
        let endowment = self.factory.required_endowment(&params);
        if endowment > available_balance {
            return Err(AlarumError::InsufficientEscrow {
                need: endowment,
                have: available_balance,
            });
        }

        let window_start = params.schedule.window_start;
        let request = self
            .factory
            .create_validated_request(params, endowment, chain)?;
        self.tracker
            .add_request(self.factory.id(), &request.id, window_start)?;

        info!(
            request = %request.id,
            scheduler = %caller,
            window_start,
            endowment,
            "scheduled request"
        );
        Ok((request, endowment))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alarum_core::constants::EXECUTION_GAS_OVERHEAD;
    use alarum_request::endowment::compute_endowment;

    fn acct(tag: u8) -> AccountId {
        AccountId::from_bytes([tag; 32])
    }

    fn temp_tracker(name: &str) -> RequestTracker {
        let dir = std::env::temp_dir().join(format!("alarum_builder_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        RequestTracker::open(&dir).expect("open temp tracker")
    }

    #[test]
    fn block_defaults_fill_unset_fields() {
        let caller = acct(1);
        let params = RequestBuilder::at_block(5_000).resolve(&caller);
        assert_eq!(params.schedule.unit, TemporalUnit::Blocks);
        assert_eq!(params.schedule.window_size, DEFAULT_WINDOW_SIZE_BLOCKS);
        assert_eq!(params.schedule.freeze_period, DEFAULT_FREEZE_PERIOD_BLOCKS);
        assert_eq!(params.destination, caller, "destination defaults to the caller");
        assert_eq!(params.owner, caller);
        assert_eq!(params.base_payment, DEFAULT_BASE_PAYMENT);
        assert_eq!(
            params.base_donation,
            DEFAULT_BASE_PAYMENT / DEFAULT_DONATION_DIVISOR
        );
    }

    #[test]
    fn timestamp_defaults_differ_from_block_defaults() {
        let params = RequestBuilder::at_timestamp(2_000_000_000).resolve(&acct(1));
        assert_eq!(params.schedule.unit, TemporalUnit::Timestamp);
        assert_eq!(params.schedule.window_size, DEFAULT_WINDOW_SIZE_SECS);
        assert_eq!(
            params.schedule.reserved_window_size,
            DEFAULT_RESERVED_WINDOW_SIZE_SECS
        );
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let params = RequestBuilder::at_block(5_000)
            .window_size(100)
            .destination(acct(9))
            .base_payment(777)
            .base_donation(0)
            .resolve(&acct(1));
        assert_eq!(params.schedule.window_size, 100);
        assert_eq!(params.destination, acct(9));
        assert_eq!(params.base_payment, 777);
        assert_eq!(params.base_donation, 0);
    }

    #[test]
    fn scheduling_registers_with_the_tracker() {
        let tracker = temp_tracker("registers");
        let mut factory = RequestFactory::new(acct(0xFA));
        let mut scheduler = Scheduler::new(&mut factory, &tracker);
        let chain = ChainTime::new(100, 0);

        let (request, endowment) = scheduler
            .schedule(
                &acct(1),
                Balance::MAX,
                RequestBuilder::at_block(5_000).destination(acct(9)),
                &chain,
            )
            .expect("schedule");

        assert_eq!(request.escrow_balance, endowment);
        assert!(tracker.is_known_request(&request.id));
        assert_eq!(tracker.window_start_of(&request.id).unwrap(), Some(5_000));
        assert!(factory.is_known_request(&request.id));
    }

    #[test]
    fn under_funded_scheduling_fails_loudly() {
        let tracker = temp_tracker("underfunded");
        let mut factory = RequestFactory::new(acct(0xFA));
        let factory_id = factory.id().clone();
        let mut scheduler = Scheduler::new(&mut factory, &tracker);
        let chain = ChainTime::new(100, 0);

        let builder = RequestBuilder::at_block(5_000)
            .destination(acct(9))
            .base_payment(10_000)
            .base_donation(100)
            .call_gas(200_000)
            .anchor_gas_price(20);
        let need = compute_endowment(10_000, 100, 200_000, 0, 20, EXECUTION_GAS_OVERHEAD);

        let err = scheduler
            .schedule(&acct(1), need - 1, builder.clone(), &chain)
            .unwrap_err();
        assert!(matches!(
            err,
            AlarumError::InsufficientEscrow { need: n, have: h } if n == need && h == need - 1
        ));
        // Nothing was created or tracked.
        assert_eq!(
            tracker
                .query(&factory_id, alarum_tracker::QueryOp::Gte, 0)
                .unwrap(),
            None
        );

        // The exact endowment is enough.
        let (request, endowment) = scheduler
            .schedule(&acct(1), need, builder, &chain)
            .expect("schedule");
        assert_eq!(endowment, need);
        assert_eq!(request.escrow_balance, need);
    }
}
