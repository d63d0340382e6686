use std::collections::HashMap;

use forge_core::constants::{
    EARLY_DISCOUNT_PCT, EARLY_TIER_ADMISSIONS, LOYAL_DISCOUNT_PCT, MULTIPLIER_BASE_PCT,
    SHIELD_ADMISSIONS,
};
use forge_core::error::ForgeError;
use forge_core::records::ParticipantStatus;
use forge_core::types::{Amount, ParticipantId, Percent, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Registration cutoff. Registration is open while `now < time` and the
/// global admission count has not exceeded `count`.
///
/// `closed` latches the first time the cutoff is observed as passed, so a
/// later administrative extension cannot reopen registration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdopterCutoff {
    pub time: Timestamp,
    pub count: u64,
    #[serde(default)]
    pub closed: bool,
}

impl AdopterCutoff {
    pub fn new(time: Timestamp, count: u64) -> Self {
        Self { time, count, closed: false }
    }

    pub fn has_passed(&self, now: Timestamp, global_count: u64) -> bool {
        self.closed || now >= self.time || global_count > self.count
    }
}

/// Outcome of recording one admission against the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub status: ParticipantStatus,
    /// True only on the admission that granted early-adopter status.
    pub newly_registered: bool,
}

/// Discount tier for a participant status: 0, 25 or 10 percent.
pub fn discount_for_status(status: Option<&ParticipantStatus>) -> Percent {
    match status {
        Some(s) if s.is_early_adopter => {
            if s.admission_count < EARLY_TIER_ADMISSIONS {
                EARLY_DISCOUNT_PCT
            } else {
                LOYAL_DISCOUNT_PCT
            }
        }
        _ => 0,
    }
}

/// Early adopters are exempt from the demand multiplier for their first
/// `SHIELD_ADMISSIONS` admissions.
pub fn is_shielded_status(status: Option<&ParticipantStatus>) -> bool {
    matches!(status, Some(s) if s.is_early_adopter && s.admission_count < SHIELD_ADMISSIONS)
}

#[derive(Clone, Debug)]
pub struct EarlyAdopterRegistry {
    cutoff: AdopterCutoff,
    participants: HashMap<ParticipantId, ParticipantStatus>,
}

impl EarlyAdopterRegistry {
    pub fn new(cutoff: AdopterCutoff) -> Self {
        Self { cutoff, participants: HashMap::new() }
    }

    /// Rebuild from persisted statuses.
    pub fn from_parts(
        cutoff: AdopterCutoff,
        statuses: impl IntoIterator<Item = ParticipantStatus>,
    ) -> Self {
        let participants = statuses.into_iter().map(|s| (s.participant, s)).collect();
        Self { cutoff, participants }
    }

    pub fn cutoff(&self) -> AdopterCutoff {
        self.cutoff
    }

    pub fn status(&self, participant: &ParticipantId) -> Option<&ParticipantStatus> {
        self.participants.get(participant)
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantStatus> {
        self.participants.values()
    }

    pub fn early_adopter_count(&self) -> usize {
        self.participants.values().filter(|s| s.is_early_adopter).count()
    }

    /// Record a verified admission for `participant`.
    ///
    /// The running count always increments. A participant's first admission
    /// grants early-adopter status if the cutoff has not passed for
    /// `global_count` (the admission total including this one). Already
    /// flagged participants are left flagged.
    pub fn register_on_first_admission(
        &mut self,
        participant: &ParticipantId,
        global_count: u64,
        now: Timestamp,
    ) -> Registration {
        let registration = self.registration_for(participant, global_count, now);
        self.apply(&registration, global_count, now);
        registration
    }

    /// What `register_on_first_admission` would record, without recording it.
    pub fn registration_for(
        &self,
        participant: &ParticipantId,
        global_count: u64,
        now: Timestamp,
    ) -> Registration {
        let mut status = self
            .participants
            .get(participant)
            .cloned()
            .unwrap_or_else(|| ParticipantStatus::new(*participant));

        let first_admission = status.admission_count == 0 && status.first_admission_at.is_none();
        if status.first_admission_at.is_none() {
            status.first_admission_at = Some(now);
        }

        let mut newly_registered = false;
        if first_admission
            && !status.is_early_adopter
            && !self.cutoff.has_passed(now, global_count)
        {
            status.is_early_adopter = true;
            status.registered_at = Some(now);
            newly_registered = true;
        }
        status.admission_count += 1;

        Registration { status, newly_registered }
    }

    /// The cutoff as it stands after an admission at `global_count`.
    pub fn cutoff_after(&self, global_count: u64, now: Timestamp) -> AdopterCutoff {
        let mut cutoff = self.cutoff;
        if cutoff.has_passed(now, global_count) {
            cutoff.closed = true;
        }
        cutoff
    }

    /// Store a registration computed by `registration_for`.
    pub fn apply(&mut self, registration: &Registration, global_count: u64, now: Timestamp) {
        let cutoff = self.cutoff_after(global_count, now);
        if cutoff.closed && !self.cutoff.closed {
            info!(global_count, "early-adopter registration closed");
        }
        self.cutoff = cutoff;

        let status = &registration.status;
        if registration.newly_registered {
            info!(participant = %status.participant, global_count, "early adopter registered");
        } else {
            debug!(participant = %status.participant, count = status.admission_count, "admission counted");
        }
        self.participants.insert(status.participant, status.clone());
    }

    /// Move the registration cutoff. Rejects a non-future time, a zero count
    /// limit, or a cutoff that has already passed. `global_count` is the
    /// total the next admission would carry.
    pub fn set_cutoff(
        &mut self,
        time: Timestamp,
        count: u64,
        now: Timestamp,
        global_count: u64,
    ) -> Result<AdopterCutoff, ForgeError> {
        if count == 0 {
            return Err(ForgeError::ZeroCutoffCount);
        }
        if time <= now {
            return Err(ForgeError::CutoffNotInFuture { cutoff: time, now });
        }
        if self.cutoff.has_passed(now, global_count) {
            self.cutoff.closed = true;
            return Err(ForgeError::RegistrationClosed);
        }
        self.cutoff = AdopterCutoff::new(time, count);
        info!(time, count, "early-adopter cutoff updated");
        Ok(self.cutoff)
    }

    /// Administrative backfill of an early adopter. Bypasses the cutoff.
    /// A seeded count never lowers a count already recorded.
    pub fn manual_register(
        &mut self,
        participant: &ParticipantId,
        seed_count: u64,
        now: Timestamp,
    ) -> Result<ParticipantStatus, ForgeError> {
        let status = self
            .participants
            .entry(*participant)
            .or_insert_with(|| ParticipantStatus::new(*participant));
        if status.is_early_adopter {
            return Err(ForgeError::AlreadyRegistered(participant.to_string()));
        }
        status.is_early_adopter = true;
        status.registered_at = Some(now);
        status.admission_count = status.admission_count.max(seed_count);
        info!(participant = %participant, seed_count, "early adopter registered manually");
        Ok(status.clone())
    }

    pub fn discount_for(&self, participant: &ParticipantId) -> Percent {
        discount_for_status(self.status(participant))
    }

    pub fn is_shielded(&self, participant: &ParticipantId) -> bool {
        is_shielded_status(self.status(participant))
    }

    pub fn is_early_adopter(&self, participant: &ParticipantId) -> bool {
        self.status(participant).map(|s| s.is_early_adopter).unwrap_or(false)
    }

    /// `fee × (100 − discount) ÷ 100`, truncated.
    pub fn discounted_fee(&self, participant: &ParticipantId, fee: Amount) -> Amount {
        let keep = MULTIPLIER_BASE_PCT - self.discount_for(participant);
        fee.saturating_mul(keep as u128) / MULTIPLIER_BASE_PCT as u128
    }

    /// Discount first; shielded participants then ignore the demand
    /// multiplier, everyone else pays it on the discounted fee.
    pub fn protected_fee(
        &self,
        participant: &ParticipantId,
        fee: Amount,
        demand_pct: Percent,
    ) -> Amount {
        let discounted = self.discounted_fee(participant, fee);
        if self.is_shielded(participant) {
            return discounted;
        }
        discounted.saturating_mul(demand_pct as u128) / MULTIPLIER_BASE_PCT as u128
    }
}
