use std::collections::VecDeque;

use forge_core::constants::{
    DEMAND_TARGET_WEEKLY, MULTIPLIER_BASE_PCT, MULTIPLIER_MAX_PCT, SECS_PER_DAY,
    VELOCITY_BURST_SENTINEL_PCT, VELOCITY_COMPACTION_INTERVAL,
    VELOCITY_MULTIPLIER_SLOPE_DIVISOR, VELOCITY_RETENTION_DAYS,
};
use forge_core::types::{whole_days_between, Percent, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compaction {
    pub previous_cursor: u64,
    pub cursor: u64,
}

impl Compaction {
    /// Number of entries expired by this pass.
    pub fn expired(&self) -> u64 {
        self.cursor - self.previous_cursor
    }
}

/// Append-only log of admission timestamps with an oldest-valid cursor.
///
/// Indices are absolute: the entry recorded first has index 0 forever.
/// Entries below `cursor` are expired and have been dropped from memory;
/// `entries` holds exactly the valid suffix `[cursor, len)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityLedger {
    entries: VecDeque<Timestamp>,
    cursor: u64,
    record_calls: u64,
}

impl VelocityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts. `valid` must be the entries
    /// from `cursor` onward, oldest first.
    pub fn from_parts(valid: Vec<Timestamp>, cursor: u64, record_calls: u64) -> Self {
        Self {
            entries: valid.into(),
            cursor,
            record_calls,
        }
    }

    /// Append an admission. Every `VELOCITY_COMPACTION_INTERVAL`th call also
    /// runs a compaction pass anchored at `at`.
    pub fn record(&mut self, at: Timestamp) -> Option<Compaction> {
        self.entries.push_back(at);
        self.record_calls += 1;
        if self.record_calls % VELOCITY_COMPACTION_INTERVAL == 0 {
            Some(self.compact(at))
        } else {
            None
        }
    }

    /// Advance the cursor past every entry older than the retention window.
    ///
    /// Scans forward from the cursor only and stops at the first entry still
    /// inside the window. A second call with no intervening `record` is a
    /// no-op.
    pub fn compact(&mut self, now: Timestamp) -> Compaction {
        let threshold = now.saturating_sub(VELOCITY_RETENTION_DAYS * SECS_PER_DAY);
        let previous_cursor = self.cursor;
        while let Some(&oldest) = self.entries.front() {
            if oldest >= threshold {
                break;
            }
            self.entries.pop_front();
            self.cursor += 1;
        }
        let pass = Compaction { previous_cursor, cursor: self.cursor };
        if pass.expired() > 0 {
            debug!(expired = pass.expired(), cursor = pass.cursor, "velocity ledger compacted");
        }
        pass
    }

    /// Number of admissions in the last `days` days (inclusive lower bound).
    pub fn count_since(&self, days: u64, now: Timestamp) -> u64 {
        if days == 0 || self.entries.is_empty() {
            return 0;
        }
        let span = (days.min((i64::MAX / SECS_PER_DAY) as u64) as i64) * SECS_PER_DAY;
        let since = now.saturating_sub(span);
        self.entries.iter().filter(|&&t| t >= since).count() as u64
    }

    /// Observed daily admission rate as a percentage of the target daily
    /// rate (`DEMAND_TARGET_WEEKLY / 7`).
    ///
    /// 0 with fewer than two valid entries; `VELOCITY_BURST_SENTINEL_PCT`
    /// when every valid entry falls within the same whole day.
    pub fn rate(&self) -> Percent {
        let (Some(&oldest), Some(&newest)) = (self.entries.front(), self.entries.back()) else {
            return 0;
        };
        let valid = self.entries.len() as u128;
        if valid < 2 {
            return 0;
        }
        let elapsed_days = whole_days_between(oldest, newest) as u128;
        if elapsed_days == 0 {
            return VELOCITY_BURST_SENTINEL_PCT;
        }
        // (valid / elapsed) / (weekly / 7) * 100, kept in one integer division.
        let pct = valid * 100 * 7 / (elapsed_days * DEMAND_TARGET_WEEKLY as u128);
        pct.min(u64::MAX as u128) as u64
    }

    /// Ledger-side velocity multiplier: 100 at or below a 100% rate, then one
    /// point per `VELOCITY_MULTIPLIER_SLOPE_DIVISOR` rate points, capped at 200.
    ///
    /// Not used by the live fee path; the fee engine has its own demand
    /// multiplier.
    pub fn rate_multiplier(&self) -> Percent {
        rate_to_multiplier(self.rate())
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Total entries ever recorded (expired ones included).
    pub fn len(&self) -> u64 {
        self.cursor + self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn valid_len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn record_calls(&self) -> u64 {
        self.record_calls
    }

    /// Valid entries with their absolute indices, oldest first.
    pub fn valid_entries(&self) -> impl Iterator<Item = (u64, Timestamp)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, &t)| (self.cursor + i as u64, t))
    }
}

/// Maps a ledger rate to the 100–200 multiplier range.
pub fn rate_to_multiplier(rate: Percent) -> Percent {
    if rate <= MULTIPLIER_BASE_PCT {
        return MULTIPLIER_BASE_PCT;
    }
    let bonus = (rate - MULTIPLIER_BASE_PCT) / VELOCITY_MULTIPLIER_SLOPE_DIVISOR;
    (MULTIPLIER_BASE_PCT + bonus).min(MULTIPLIER_MAX_PCT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = SECS_PER_DAY;
    const T0: i64 = 1_800_000_000;

    #[test]
    fn empty_ledger_reports_fallbacks() {
        let ledger = VelocityLedger::new();
        assert_eq!(ledger.count_since(7, T0), 0);
        assert_eq!(ledger.rate(), 0);
        assert_eq!(ledger.rate_multiplier(), 100);
        assert!(ledger.is_empty());
    }

    #[test]
    fn single_entry_is_insufficient_data() {
        let mut ledger = VelocityLedger::new();
        ledger.record(T0);
        assert_eq!(ledger.rate(), 0);
    }

    #[test]
    fn same_day_burst_returns_sentinel() {
        let mut ledger = VelocityLedger::new();
        ledger.record(T0);
        ledger.record(T0 + 3_600);
        ledger.record(T0 + 7_200);
        assert_eq!(ledger.rate(), VELOCITY_BURST_SENTINEL_PCT);
        assert_eq!(ledger.rate_multiplier(), 200);
    }

    #[test]
    fn rate_is_percent_of_daily_target() {
        // 1000 admissions over 7 days = 2× the weekly target of 500.
        let mut ledger = VelocityLedger::new();
        for i in 0..1_000i64 {
            ledger.record(T0 + i * 7 * DAY / 999);
        }
        // record() compacted periodically but nothing is older than 14 days.
        assert_eq!(ledger.cursor(), 0);
        assert_eq!(ledger.rate(), 200);
        assert_eq!(ledger.rate_multiplier(), 150);
    }

    #[test]
    fn count_since_is_monotonic_in_days() {
        let mut ledger = VelocityLedger::new();
        for d in 0..10 {
            ledger.record(T0 + d * DAY);
        }
        let now = T0 + 10 * DAY;
        assert_eq!(ledger.count_since(0, now), 0);
        let mut prev = 0;
        for days in 1..=20 {
            let c = ledger.count_since(days, now);
            assert!(c >= prev, "count_since({days}) = {c} < {prev}");
            prev = c;
        }
        assert_eq!(ledger.count_since(1, now), 1);
        assert_eq!(ledger.count_since(7, now), 7);
        assert_eq!(ledger.count_since(u64::MAX, now), 10);
    }

    #[test]
    fn compaction_expires_old_entries_and_is_idempotent() {
        let mut ledger = VelocityLedger::new();
        for d in 0..20 {
            ledger.record(T0 + d * DAY);
        }
        let now = T0 + 20 * DAY;
        let first = ledger.compact(now);
        // Entries from days 0..=5 are older than 14 days.
        assert_eq!(first, Compaction { previous_cursor: 0, cursor: 6 });
        assert_eq!(ledger.len(), 20);
        assert_eq!(ledger.valid_len(), 14);

        let second = ledger.compact(now);
        assert_eq!(second.expired(), 0);
        assert_eq!(second.cursor, first.cursor);
    }

    #[test]
    fn every_hundredth_record_compacts() {
        let mut ledger = VelocityLedger::new();
        for i in 0..99 {
            assert!(ledger.record(T0 + i).is_none());
        }
        // 100th call lands 30 days later: all 99 earlier entries expire.
        let pass = ledger.record(T0 + 30 * DAY).expect("compaction on 100th record");
        assert_eq!(pass.cursor, 99);
        assert_eq!(ledger.valid_len(), 1);
        assert!(ledger.cursor() <= ledger.len());
    }

    #[test]
    fn valid_entries_carry_absolute_indices() {
        let mut ledger = VelocityLedger::new();
        for d in 0..16 {
            ledger.record(T0 + d * DAY);
        }
        ledger.compact(T0 + 16 * DAY);
        let first = ledger.valid_entries().next().unwrap();
        assert_eq!(first, (2, T0 + 2 * DAY));

        let rebuilt = VelocityLedger::from_parts(
            ledger.valid_entries().map(|(_, t)| t).collect(),
            ledger.cursor(),
            ledger.record_calls(),
        );
        assert_eq!(rebuilt.len(), ledger.len());
        assert_eq!(rebuilt.rate(), ledger.rate());
    }

    #[test]
    fn ledger_multiplier_slope_and_cap() {
        assert_eq!(rate_to_multiplier(0), 100);
        assert_eq!(rate_to_multiplier(100), 100);
        assert_eq!(rate_to_multiplier(150), 125);
        assert_eq!(rate_to_multiplier(300), 200);
        assert_eq!(rate_to_multiplier(10_000), 200);
    }
}
