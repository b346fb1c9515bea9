//! Request factory: parameter validation and instantiation.
//!
//! Validation reports one boolean per checked dimension rather than the
//! first failure, so a caller sees every violated constraint at once.

use alarum_core::constants::{EXECUTION_GAS_CEILING, EXECUTION_GAS_OVERHEAD};
use alarum_core::error::AlarumError;
use alarum_core::types::{AccountId, Balance, ChainTime, Gas, GasPrice, RequestId};
use alarum_request::endowment::{compute_endowment, validate_endowment};
use alarum_request::payment::PaymentState;
use alarum_request::request::{CallSpec, Request};
use alarum_request::schedule::ScheduleWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Everything needed to mint one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestParams {
    pub creator: AccountId,
    pub owner: AccountId,
    pub destination: AccountId,
    pub payload: Vec<u8>,
    pub call_gas: Gas,
    pub call_value: Balance,
    pub base_payment: Balance,
    pub base_donation: Balance,
    pub donation_benefactor: Option<AccountId>,
    pub anchor_gas_price: GasPrice,
    pub schedule: ScheduleWindow,
}

/// Per-dimension validation report. All six must hold to mint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsValidity {
    /// The attached endowment covers the computed requirement.
    pub sufficient_endowment: bool,
    /// `reserved_window_size <= window_size`.
    pub reserved_window_fits: bool,
    /// `window_start` lies beyond the freeze period from now.
    pub window_start_after_freeze: bool,
    /// The anchor gas price is nonzero.
    pub anchor_gas_price_nonzero: bool,
    /// The destination is a real account, not the zero account.
    pub destination_set: bool,
    /// `call_gas` plus overhead fits under the execution ceiling.
    pub call_gas_within_ceiling: bool,
}

impl ParamsValidity {
    pub fn all(&self) -> bool {
        self.as_array().iter().all(|ok| *ok)
    }

    pub fn as_array(&self) -> [bool; 6] {
        [
            self.sufficient_endowment,
            self.reserved_window_fits,
            self.window_start_after_freeze,
            self.anchor_gas_price_nonzero,
            self.destination_set,
            self.call_gas_within_ceiling,
        ]
    }
}

/// Mints validated requests and remembers which ids it minted.
pub struct RequestFactory {
    factory_id: AccountId,
    sequence: u64,
    known: BTreeSet<RequestId>,
}

impl RequestFactory {
    pub fn new(factory_id: AccountId) -> Self {
        Self {
            factory_id,
            sequence: 0,
            known: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.factory_id
    }

    pub fn is_known_request(&self, request_id: &RequestId) -> bool {
        self.known.contains(request_id)
    }

    /// The endowment this factory would require for `params`.
    pub fn required_endowment(&self, params: &RequestParams) -> Balance {
        compute_endowment(
            params.base_payment,
            params.base_donation,
            params.call_gas,
            params.call_value,
            params.anchor_gas_price,
            EXECUTION_GAS_OVERHEAD,
        )
    }

    pub fn validate_request_params(
        &self,
        params: &RequestParams,
        endowment: Balance,
        chain: &ChainTime,
    ) -> ParamsValidity {
        let now = chain.tick(params.schedule.unit);
        ParamsValidity {
            sufficient_endowment: validate_endowment(
                endowment,
                params.base_payment,
                params.base_donation,
                params.call_gas,
                params.call_value,
                params.anchor_gas_price,
                EXECUTION_GAS_OVERHEAD,
            ),
            reserved_window_fits: params.schedule.reserved_window_size
                <= params.schedule.window_size,
            window_start_after_freeze: params.schedule.window_start
                > now.saturating_add(params.schedule.freeze_period),
            anchor_gas_price_nonzero: params.anchor_gas_price > 0,
            destination_set: !params.destination.is_zero(),
            call_gas_within_ceiling: params.call_gas.saturating_add(EXECUTION_GAS_OVERHEAD)
                <= EXECUTION_GAS_CEILING,
        }
    }

    /// Validate and mint. The full validity report rides in the error when
    /// any dimension fails.
    pub fn create_validated_request(
        &mut self,
        params: RequestParams,
        endowment: Balance,
        chain: &ChainTime,
    ) -> Result<Request, AlarumError> {
        let validity = self.validate_request_params(&params, endowment, chain);
        if !validity.all() {
            return Err(AlarumError::InvalidRequestParams(validity.as_array()));
        }

        let id = RequestId::derive(&params.creator, self.sequence, params.schedule.window_start);
        self.sequence += 1;
        self.known.insert(id.clone());

        let request = Request::new(
            id.clone(),
            params.creator,
            params.owner,
            CallSpec {
                destination: params.destination,
                payload: params.payload,
                call_gas: params.call_gas,
                call_value: params.call_value,
            },
            params.schedule,
            PaymentState::new(
                params.base_payment,
                params.base_donation,
                params.donation_benefactor,
                params.anchor_gas_price,
            ),
            endowment,
        );
        info!(request = %id, endowment, "request created");
        Ok(request)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
