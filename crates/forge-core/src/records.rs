use serde::{Deserialize, Serialize};

use crate::types::{day_index, AdmissionId, Amount, ParticipantId, PaymentRef, Timestamp};

// ── GlobalCounters ───────────────────────────────────────────────────────────

/// Protocol-wide aggregates owned by the coordinator.
///
/// `total_admissions` and `total_fees` move only on successful verification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalCounters {
    pub total_admissions: u64,
    pub total_fees: Amount,
    pub launch_time: Timestamp,
    /// Submissions accepted into the Submitted state.
    #[serde(default)]
    pub total_submitted: u64,
    /// Oracle-reported failures.
    #[serde(default)]
    pub total_rejected: u64,
}

impl GlobalCounters {
    pub fn new(launch_time: Timestamp) -> Self {
        Self {
            total_admissions: 0,
            total_fees: 0,
            launch_time,
            total_submitted: 0,
            total_rejected: 0,
        }
    }
}

// ── AdmissionRecord ──────────────────────────────────────────────────────────

/// Oracle-reported failure attached to an admission that stays unverified.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    /// Diagnostic text from the oracle. Never parsed.
    pub reason: String,
    pub rejected_at: Timestamp,
}

/// One submitted admission.
///
/// Lifecycle: Submitted → Verified, or Submitted forever when the oracle
/// reports failure. Immutable once verified.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdmissionRecord {
    pub id: AdmissionId,
    pub participant: ParticipantId,
    pub payment_ref: PaymentRef,
    pub offered: Amount,
    /// The quote the offer was checked against.
    pub quoted: Amount,
    pub submitted_at: Timestamp,
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
    #[serde(default)]
    pub rejection: Option<Rejection>,
}

impl AdmissionRecord {
    pub fn submitted(
        participant: ParticipantId,
        payment_ref: PaymentRef,
        offered: Amount,
        quoted: Amount,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AdmissionId::derive(&participant, &payment_ref, now),
            participant,
            payment_ref,
            offered,
            quoted,
            submitted_at: now,
            verified: false,
            verified_at: None,
            rejection: None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match (self.verified, &self.rejection) {
            (true, _) => "verified",
            (false, Some(_)) => "rejected",
            (false, None) => "submitted",
        }
    }
}

// ── ParticipantStatus ────────────────────────────────────────────────────────

/// Loyalty status tracked by the early-adopter registry.
///
/// `admission_count` grows on every recorded admission; `is_early_adopter`
/// is only ever set before the registration cutoff.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParticipantStatus {
    pub participant: ParticipantId,
    pub first_admission_at: Option<Timestamp>,
    pub admission_count: u64,
    pub is_early_adopter: bool,
    #[serde(default)]
    pub registered_at: Option<Timestamp>,
}

impl ParticipantStatus {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            first_admission_at: None,
            admission_count: 0,
            is_early_adopter: false,
            registered_at: None,
        }
    }
}

// ── RateLimitState ───────────────────────────────────────────────────────────

/// Per-participant daily quota window. Resets when the UTC day changes.
///
/// Verified admissions count against the day they were verified; pending
/// submissions count against the day they were submitted until the oracle
/// answers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RateLimitState {
    pub last_day: i64,
    pub admissions_today: u32,
    #[serde(default)]
    pub pending_day: i64,
    #[serde(default)]
    pub pending_today: u32,
}

impl RateLimitState {
    /// Admissions already counted against `now`'s day.
    pub fn admissions_on(&self, now: Timestamp) -> u32 {
        if self.last_day == day_index(now) {
            self.admissions_today
        } else {
            0
        }
    }

    /// Submissions made on `now`'s day still waiting for the oracle.
    pub fn pending_on(&self, now: Timestamp) -> u32 {
        if self.pending_day == day_index(now) {
            self.pending_today
        } else {
            0
        }
    }

    /// Quota used on `now`'s day: verified plus pending.
    pub fn used_on(&self, now: Timestamp) -> u32 {
        self.admissions_on(now).saturating_add(self.pending_on(now))
    }

    pub fn record(&mut self, now: Timestamp) {
        let today = day_index(now);
        if self.last_day != today {
            self.last_day = today;
            self.admissions_today = 0;
        }
        self.admissions_today += 1;
    }

    /// Hold a quota slot for a submission made at `now`.
    pub fn reserve(&mut self, now: Timestamp) {
        let today = day_index(now);
        if self.pending_day != today {
            self.pending_day = today;
            self.pending_today = 0;
        }
        self.pending_today += 1;
    }

    /// Return the slot held by a submission made at `submitted_at`. A slot
    /// from an earlier day has already lapsed.
    pub fn release(&mut self, submitted_at: Timestamp) {
        if self.pending_day == day_index(submitted_at) {
            self.pending_today = self.pending_today.saturating_sub(1);
        }
    }
}

/// Coordinator-side activity for one participant: daily quota plus the
/// timestamp the cooldown surcharge is measured from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParticipantActivity {
    pub participant: ParticipantId,
    pub rate_limit: RateLimitState,
    pub last_admission_at: Option<Timestamp>,
}

impl ParticipantActivity {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            rate_limit: RateLimitState::default(),
            last_admission_at: None,
        }
    }
}

// ── MilestoneState ───────────────────────────────────────────────────────────

/// Last administrative fee override recorded by the milestone monitor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeeOverride {
    pub fee: Amount,
    pub reason: String,
    pub set_at: Timestamp,
}

/// Milestone markers. Every field advances monotonically.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MilestoneState {
    pub last_count_milestone: u64,
    pub last_time_milestone_at: Timestamp,
    pub last_treasury_milestone: u128,
    /// Set while a sustained-demand assertion stands; cleared by the next
    /// assertion that fails the predicate.
    #[serde(default)]
    pub velocity_trigger_active: bool,
    #[serde(default)]
    pub fee_override: Option<FeeOverride>,
}

impl MilestoneState {
    pub fn new(launch_time: Timestamp) -> Self {
        Self {
            last_count_milestone: 0,
            last_time_milestone_at: launch_time,
            last_treasury_milestone: 0,
            velocity_trigger_active: false,
            fee_override: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECS_PER_DAY;

    #[test]
    fn rate_limit_resets_on_new_day() {
        let mut rl = RateLimitState::default();
        let day5 = 5 * SECS_PER_DAY + 10;
        rl.record(day5);
        rl.record(day5 + 60);
        assert_eq!(rl.admissions_on(day5 + 120), 2);
        assert_eq!(rl.admissions_on(day5 + SECS_PER_DAY), 0);

        rl.record(day5 + SECS_PER_DAY);
        assert_eq!(rl.admissions_today, 1);
        assert_eq!(rl.last_day, 6);
    }

    #[test]
    fn pending_submissions_hold_quota_until_answered() {
        let mut rl = RateLimitState::default();
        let day5 = 5 * SECS_PER_DAY + 10;
        rl.reserve(day5);
        rl.reserve(day5 + 60);
        assert_eq!(rl.used_on(day5 + 120), 2);

        // Verified the same day: the slot moves from pending to admitted.
        rl.release(day5);
        rl.record(day5 + 300);
        assert_eq!((rl.pending_on(day5 + 400), rl.admissions_on(day5 + 400)), (1, 1));
        assert_eq!(rl.used_on(day5 + 400), 2);

        // Yesterday's pending slot no longer counts, and releasing it later
        // does not eat into today's.
        let day6 = day5 + SECS_PER_DAY;
        rl.reserve(day6);
        rl.release(day5 + 60);
        assert_eq!(rl.used_on(day6), 1);
    }

    #[test]
    fn status_label_tracks_lifecycle() {
        let mut rec = AdmissionRecord::submitted(
            ParticipantId([1; 32]),
            PaymentRef([2; 32]),
            10,
            10,
            1_000,
        );
        assert_eq!(rec.status_label(), "submitted");
        rec.rejection = Some(Rejection { reason: "no confirmations".into(), rejected_at: 1_001 });
        assert_eq!(rec.status_label(), "rejected");
    }
}
