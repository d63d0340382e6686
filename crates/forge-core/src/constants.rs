/// ─── Forge Protocol Constants ───────────────────────────────────────────────
///
/// Admission into the forge is paid off-chain in BTC and attested by the
/// payment oracle. Every amount in this workspace is denominated in satoshis.
///
/// Base unit:  satoshi  (1 BTC = 100,000,000 sats)

// ── Units ────────────────────────────────────────────────────────────────────

/// 1 BTC expressed in satoshis.
pub const SATS_PER_BTC: u128 = 100_000_000;

/// Seconds in one day. All "day" arithmetic truncates to whole days.
pub const SECS_PER_DAY: i64 = 86_400;

/// Seconds in one hour.
pub const SECS_PER_HOUR: i64 = 3_600;

// ── Fee engine ───────────────────────────────────────────────────────────────

/// Minimum required fee. No layer may push the quote below this.
pub const FLOOR_FEE_SATS: u128 = SATS_PER_BTC; // 1 BTC

/// Admissions per supply-growth era. The base fee is flat within an era.
pub const ERA_LENGTH: u64 = 2_016;

/// Per-era compounding of the base fee (numerator / denominator): +10%.
pub const ERA_GROWTH_NUM: u128 = 110;
pub const ERA_GROWTH_DEN: u128 = 100;

/// Days per protocol-age month.
pub const AGE_MONTH_DAYS: u64 = 30;

/// Per-month compounding of the age multiplier (numerator / denominator): +1%.
pub const AGE_GROWTH_NUM: u128 = 101;
pub const AGE_GROWTH_DEN: u128 = 100;

/// Demand target: admissions per rolling week before surge pricing applies.
pub const DEMAND_TARGET_WEEKLY: u64 = 500;

/// Excess-percentage divisor for the demand multiplier (1 point per 5% over).
pub const DEMAND_SLOPE_DIVISOR: u64 = 5;

/// Neutral multiplier (1.00×) expressed in percent.
pub const MULTIPLIER_BASE_PCT: u64 = 100;

/// Ceiling for every demand-style multiplier (2.00×).
pub const MULTIPLIER_MAX_PCT: u64 = 200;

/// Reference-price normalisation clamp (0.50× – 2.00×).
pub const PRICE_MULTIPLIER_MIN_PCT: u64 = 50;
pub const PRICE_MULTIPLIER_MAX_PCT: u64 = 200;

/// Fixed-point scale of reference prices (8 decimals).
pub const PRICE_SCALE: u128 = 100_000_000;

/// Default target reference price: 60,000.00000000 quote units per BTC.
pub const DEFAULT_TARGET_REFERENCE_PRICE: u128 = 60_000 * PRICE_SCALE;

/// Band caps keyed by completed admissions. Strictly increasing.
pub const BAND_1_LIMIT: u64 = 1_000;
pub const BAND_2_LIMIT: u64 = 10_000;
pub const BAND_3_LIMIT: u64 = 50_000;
pub const BAND_1_CAP_SATS: u128 = 2 * SATS_PER_BTC;
pub const BAND_2_CAP_SATS: u128 = 5 * SATS_PER_BTC;
pub const BAND_3_CAP_SATS: u128 = 10 * SATS_PER_BTC;
pub const BAND_4_CAP_SATS: u128 = 21 * SATS_PER_BTC;

// ── Velocity ledger ──────────────────────────────────────────────────────────

/// Entries older than this are expired by compaction.
pub const VELOCITY_RETENTION_DAYS: i64 = 14;

/// `record` triggers a compaction pass on every Nth call.
pub const VELOCITY_COMPACTION_INTERVAL: u64 = 100;

/// Rate reported when all valid entries fall on the same day.
pub const VELOCITY_BURST_SENTINEL_PCT: u64 = 300;

/// Ledger-side multiplier slope: 1 multiplier point per 2 rate points over 100%.
pub const VELOCITY_MULTIPLIER_SLOPE_DIVISOR: u64 = 2;

// ── Early adopters ───────────────────────────────────────────────────────────

/// Discount while an early adopter has fewer than `EARLY_TIER_ADMISSIONS`.
pub const EARLY_DISCOUNT_PCT: u64 = 25;

/// Permanent discount once the early tier is exhausted.
pub const LOYAL_DISCOUNT_PCT: u64 = 10;

pub const EARLY_TIER_ADMISSIONS: u64 = 10;

/// Early adopters are shielded from the demand multiplier below this count.
pub const SHIELD_ADMISSIONS: u64 = 100;

/// Default registration window after launch. Default: 90 days.
pub const DEFAULT_EARLY_ADOPTER_WINDOW_SECS: i64 = 90 * SECS_PER_DAY;

/// Default global admission count that closes early-adopter registration.
pub const DEFAULT_EARLY_ADOPTER_LIMIT: u64 = 1_000;

// ── Milestones ───────────────────────────────────────────────────────────────

/// Admission-count milestone interval (one era).
pub const COUNT_MILESTONE_INTERVAL: u64 = ERA_LENGTH;

/// Time milestone interval. Default: 30 days.
pub const TIME_MILESTONE_INTERVAL_SECS: i64 = 30 * SECS_PER_DAY;

/// Treasury milestone interval: 100 BTC.
pub const TREASURY_MILESTONE_INTERVAL_SATS: u128 = 100 * SATS_PER_BTC;

/// Sustained-demand trigger thresholds.
pub const VELOCITY_TRIGGER_MIN_PCT: u64 = 150;
pub const VELOCITY_TRIGGER_MIN_DAYS: u64 = 3;

// ── Coordinator ──────────────────────────────────────────────────────────────

/// Maximum verified admissions per participant per UTC day.
pub const DAILY_ADMISSION_QUOTA: u32 = 3;

/// Cooldown surcharges (percent of the protected fee).
pub const COOLDOWN_HOUR_SURCHARGE_PCT: u64 = 150;
pub const COOLDOWN_DAY_SURCHARGE_PCT: u64 = 110;

/// Announcements retained in memory for `forge_getRecentEvents`.
pub const RECENT_EVENTS_CAPACITY: usize = 256;

/// Maximum length of an oracle diagnostic reason kept on a record.
pub const MAX_REASON_BYTES: usize = 256;
