//! Endowment sizing: the up-front escrow a requester must attach.

use alarum_core::constants::ENDOWMENT_MARGIN;
use alarum_core::types::{Balance, Gas, GasPrice};

/// Required up-front funding for the given economic terms.
///
/// `2*(payment + donation) + 2*call_gas*gas_price + 2*overhead*gas_price
/// + call_value`. The factor of two covers the 200% multiplier ceiling on
/// payment and donation and doubles the gas cost as a volatility margin.
/// Saturating throughout, so the result is non-decreasing in every argument.
pub fn compute_endowment(
    payment: Balance,
    donation: Balance,
    call_gas: Gas,
    call_value: Balance,
    gas_price: GasPrice,
    gas_overhead: Gas,
) -> Balance {
    let reward_margin = payment
        .saturating_add(donation)
        .saturating_mul(ENDOWMENT_MARGIN);
    let call_cost = (call_gas as u128)
        .saturating_mul(gas_price)
        .saturating_mul(ENDOWMENT_MARGIN);
    let overhead_cost = (gas_overhead as u128)
        .saturating_mul(gas_price)
        .saturating_mul(ENDOWMENT_MARGIN);
    reward_margin
        .saturating_add(call_cost)
        .saturating_add(overhead_cost)
        .saturating_add(call_value)
}

/// True iff `endowment` covers the computed requirement.
pub fn validate_endowment(
    endowment: Balance,
    payment: Balance,
    donation: Balance,
    call_gas: Gas,
    call_value: Balance,
    gas_price: GasPrice,
    gas_overhead: Gas,
) -> bool {
    endowment >= compute_endowment(payment, donation, call_gas, call_value, gas_price, gas_overhead)
}
