use forge_core::constants::{FLOOR_FEE_SATS, MULTIPLIER_BASE_PCT};
use forge_core::types::{Amount, Percent};
use serde::{Deserialize, Serialize};

use crate::layers::{
    age_multiplier, band_cap, demand_multiplier, price_multiplier, supply_growth_fee,
};

/// Aggregate metrics the fee is computed from. Callers are responsible for
/// supplying a consistent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInputs {
    /// Completed admissions so far.
    pub forge_count: u64,
    /// Admissions in the last rolling week.
    pub forges_last_week: u64,
    pub days_since_launch: u64,
    /// Current reference price; `None` or zero means unknown.
    pub reference_price: Option<Amount>,
    /// Reference price at which layer 4 is neutral.
    pub target_price: Amount,
}

/// Every intermediate value of one fee computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub supply_fee: Amount,
    pub demand_pct: Percent,
    pub age_pct: Percent,
    pub price_pct: Percent,
    /// Layers 1–4 combined, before cap and floor.
    pub combined: Amount,
    pub band_cap: Amount,
    pub fee: Amount,
}

fn apply_pct(amount: Amount, pct: Percent) -> Amount {
    amount.saturating_mul(pct as u128) / MULTIPLIER_BASE_PCT as u128
}

pub fn fee_breakdown(inputs: &FeeInputs) -> FeeBreakdown {
    let supply_fee = supply_growth_fee(inputs.forge_count);
    let demand_pct = demand_multiplier(inputs.forges_last_week);
    let age_pct = age_multiplier(inputs.days_since_launch);
    let price_pct = price_multiplier(inputs.reference_price, inputs.target_price);

    let mut combined = apply_pct(supply_fee, demand_pct);
    combined = apply_pct(combined, age_pct);
    combined = apply_pct(combined, price_pct);

    let cap = band_cap(inputs.forge_count);
    // The floor wins over both the cap and layer 4's downward pull.
    let fee = combined.min(cap).max(FLOOR_FEE_SATS);

    FeeBreakdown {
        supply_fee,
        demand_pct,
        age_pct,
        price_pct,
        combined,
        band_cap: cap,
        fee,
    }
}

/// Base required fee: layers 1–4, band cap, floor.
pub fn required_fee(inputs: &FeeInputs) -> Amount {
    fee_breakdown(inputs).fee
}

/// Forecast the fee for hypothetical metrics. Identical to `required_fee`;
/// kept as a separate entry point for planning tools.
pub fn project_future_fee(
    forge_count: u64,
    forges_last_week: u64,
    days_since_launch: u64,
    reference_price: Option<Amount>,
    target_price: Amount,
) -> Amount {
    required_fee(&FeeInputs {
        forge_count,
        forges_last_week,
        days_since_launch,
        reference_price,
        target_price,
    })
}
