use forge_core::constants::{
    AGE_GROWTH_DEN, AGE_GROWTH_NUM, AGE_MONTH_DAYS, BAND_1_CAP_SATS, BAND_1_LIMIT,
    BAND_2_CAP_SATS, BAND_2_LIMIT, BAND_3_CAP_SATS, BAND_3_LIMIT, BAND_4_CAP_SATS,
    DEMAND_SLOPE_DIVISOR, DEMAND_TARGET_WEEKLY, ERA_GROWTH_DEN, ERA_GROWTH_NUM, ERA_LENGTH,
    FLOOR_FEE_SATS, MULTIPLIER_BASE_PCT, MULTIPLIER_MAX_PCT, PRICE_MULTIPLIER_MAX_PCT,
    PRICE_MULTIPLIER_MIN_PCT,
};
use forge_core::types::{Amount, Percent};

/// Compound `value` by `num / den` once per step, truncating each time.
///
/// Saturates at `u128::MAX` instead of overflowing; every caller clamps
/// afterwards.
fn compound(mut value: u128, steps: u64, num: u128, den: u128) -> u128 {
    for _ in 0..steps {
        if value > u128::MAX / num {
            return u128::MAX;
        }
        value = value * num / den;
    }
    value
}

/// Layer 1: base fee for the supply-growth era containing `forge_count`.
///
/// Flat within an era; +10% (truncated) at every multiple of `ERA_LENGTH`.
pub fn supply_growth_fee(forge_count: u64) -> Amount {
    compound(FLOOR_FEE_SATS, forge_count / ERA_LENGTH, ERA_GROWTH_NUM, ERA_GROWTH_DEN)
}

/// Layer 2: demand multiplier from admissions in the last rolling week.
pub fn demand_multiplier(forges_last_week: u64) -> Percent {
    if forges_last_week <= DEMAND_TARGET_WEEKLY {
        return MULTIPLIER_BASE_PCT;
    }
    let excess = forges_last_week - DEMAND_TARGET_WEEKLY;
    let excess_pct = excess.saturating_mul(100) / DEMAND_TARGET_WEEKLY;
    MULTIPLIER_BASE_PCT
        .saturating_add(excess_pct / DEMAND_SLOPE_DIVISOR)
        .min(MULTIPLIER_MAX_PCT)
}

/// Layer 3: protocol-age multiplier. +1% (truncated) per elapsed 30-day month.
pub fn age_multiplier(days_since_launch: u64) -> Percent {
    let pct = compound(
        MULTIPLIER_BASE_PCT as u128,
        days_since_launch / AGE_MONTH_DAYS,
        AGE_GROWTH_NUM,
        AGE_GROWTH_DEN,
    );
    pct.min(u64::MAX as u128) as u64
}

/// Layer 4: reference-price normalisation. A zero or unknown reference price
/// leaves the fee unadjusted.
pub fn price_multiplier(reference_price: Option<Amount>, target_price: Amount) -> Percent {
    let reference = match reference_price {
        Some(p) if p > 0 => p,
        _ => return MULTIPLIER_BASE_PCT,
    };
    let raw = target_price.saturating_mul(100) / reference;
    raw.clamp(PRICE_MULTIPLIER_MIN_PCT as u128, PRICE_MULTIPLIER_MAX_PCT as u128) as u64
}

/// Band cap keyed by completed admissions.
pub fn band_cap(forge_count: u64) -> Amount {
    if forge_count < BAND_1_LIMIT {
        BAND_1_CAP_SATS
    } else if forge_count < BAND_2_LIMIT {
        BAND_2_CAP_SATS
    } else if forge_count < BAND_3_LIMIT {
        BAND_3_CAP_SATS
    } else {
        BAND_4_CAP_SATS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::constants::DEFAULT_TARGET_REFERENCE_PRICE;

    #[test]
    fn supply_layer_steps_once_per_era() {
        assert_eq!(supply_growth_fee(0), FLOOR_FEE_SATS);
        assert_eq!(supply_growth_fee(ERA_LENGTH - 1), FLOOR_FEE_SATS);
        assert_eq!(supply_growth_fee(ERA_LENGTH), 110_000_000);
        assert_eq!(supply_growth_fee(2 * ERA_LENGTH - 1), 110_000_000);
        assert_eq!(supply_growth_fee(2 * ERA_LENGTH), 121_000_000);
    }

    #[test]
    fn supply_layer_is_non_decreasing() {
        let mut prev = 0;
        for era in 0..200u64 {
            for offset in [0, 1, ERA_LENGTH / 2, ERA_LENGTH - 1] {
                let fee = supply_growth_fee(era * ERA_LENGTH + offset);
                assert!(fee >= prev);
                prev = fee;
            }
            // Exactly +10% truncated at each boundary.
            if era > 0 {
                let before = supply_growth_fee(era * ERA_LENGTH - 1);
                assert_eq!(supply_growth_fee(era * ERA_LENGTH), before * 110 / 100);
            }
        }
    }

    #[test]
    fn supply_layer_saturates_instead_of_overflowing() {
        assert!(supply_growth_fee(u64::MAX) > BAND_4_CAP_SATS);
    }

    #[test]
    fn demand_layer_shape() {
        for f in [0, 1, 250, 500] {
            assert_eq!(demand_multiplier(f), 100);
        }
        assert_eq!(demand_multiplier(501), 100); // 0% excess after truncation
        assert_eq!(demand_multiplier(525), 101);
        assert_eq!(demand_multiplier(600), 104);
        assert_eq!(demand_multiplier(1_000), 120);
        assert_eq!(demand_multiplier(3_000), 200);
        assert_eq!(demand_multiplier(u64::MAX), 200);

        let mut prev = 0;
        for f in (0..5_000).step_by(7) {
            let m = demand_multiplier(f);
            assert!(m >= prev && m <= 200);
            prev = m;
        }
    }

    #[test]
    fn age_layer_steps_once_per_month() {
        assert_eq!(age_multiplier(0), 100);
        assert_eq!(age_multiplier(29), 100);
        assert_eq!(age_multiplier(30), 101);
        assert_eq!(age_multiplier(59), 101);
        assert_eq!(age_multiplier(60), 102);
        // Truncation keeps the integer percent flat until it can step again.
        let mut prev = 0;
        for day in 0..3_650 {
            let m = age_multiplier(day);
            assert!(m >= prev);
            if day % 30 != 0 {
                assert_eq!(m, age_multiplier(day - day % 30));
            }
            prev = m;
        }
    }

    #[test]
    fn price_layer_clamps_and_handles_unknown() {
        let target = DEFAULT_TARGET_REFERENCE_PRICE;
        assert_eq!(price_multiplier(None, target), 100);
        assert_eq!(price_multiplier(Some(0), target), 100);
        assert_eq!(price_multiplier(Some(target), target), 100);
        assert_eq!(price_multiplier(Some(target / 2), target), 200);
        assert_eq!(price_multiplier(Some(target / 10), target), 200);
        assert_eq!(price_multiplier(Some(target * 2), target), 50);
        assert_eq!(price_multiplier(Some(target * 10), target), 50);
        assert_eq!(price_multiplier(Some(target * 4 / 5), target), 125);
    }

    #[test]
    fn band_caps_strictly_increase() {
        assert_eq!(band_cap(0), BAND_1_CAP_SATS);
        assert_eq!(band_cap(999), BAND_1_CAP_SATS);
        assert_eq!(band_cap(1_000), BAND_2_CAP_SATS);
        assert_eq!(band_cap(9_999), BAND_2_CAP_SATS);
        assert_eq!(band_cap(10_000), BAND_3_CAP_SATS);
        assert_eq!(band_cap(50_000), BAND_4_CAP_SATS);
        assert!(BAND_1_CAP_SATS < BAND_2_CAP_SATS);
        assert!(BAND_2_CAP_SATS < BAND_3_CAP_SATS);
        assert!(BAND_3_CAP_SATS < BAND_4_CAP_SATS);
    }
}
