use serde::{Deserialize, Serialize};

use crate::types::{AdmissionId, Amount, ParticipantId, Percent, Timestamp};

/// Announcements emitted for downstream automation.
///
/// Milestone announcements are advisory. `VelocityMilestone` in particular
/// carries caller-asserted figures that nothing in the forge recomputes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForgeEvent {
    // ── Milestones ───────────────────────────────────────────────────────────
    CountMilestone {
        milestone: u64,
        total_admissions: u64,
    },
    TimeMilestone {
        months_since_launch: u64,
        at: Timestamp,
    },
    TreasuryMilestone {
        milestone: u128,
        balance: Amount,
    },
    VelocityMilestone {
        velocity_pct: Percent,
        sustained_days: u64,
        at: Timestamp,
    },
    FeeAdjusted {
        new_fee: Amount,
        reason: String,
        at: Timestamp,
    },

    // ── Admission lifecycle ──────────────────────────────────────────────────
    AdmissionSubmitted {
        admission: AdmissionId,
        participant: ParticipantId,
        offered: Amount,
        quoted: Amount,
    },
    AdmissionVerified {
        admission: AdmissionId,
        participant: ParticipantId,
        total_admissions: u64,
    },
    AdmissionRejected {
        admission: AdmissionId,
        participant: ParticipantId,
        reason: String,
    },
    EarlyAdopterRegistered {
        participant: ParticipantId,
        admission_count: u64,
        manual: bool,
    },
}

impl ForgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ForgeEvent::CountMilestone { .. } => "count_milestone",
            ForgeEvent::TimeMilestone { .. } => "time_milestone",
            ForgeEvent::TreasuryMilestone { .. } => "treasury_milestone",
            ForgeEvent::VelocityMilestone { .. } => "velocity_milestone",
            ForgeEvent::FeeAdjusted { .. } => "fee_adjusted",
            ForgeEvent::AdmissionSubmitted { .. } => "admission_submitted",
            ForgeEvent::AdmissionVerified { .. } => "admission_verified",
            ForgeEvent::AdmissionRejected { .. } => "admission_rejected",
            ForgeEvent::EarlyAdopterRegistered { .. } => "early_adopter_registered",
        }
    }

    pub fn is_milestone(&self) -> bool {
        matches!(
            self,
            ForgeEvent::CountMilestone { .. }
                | ForgeEvent::TimeMilestone { .. }
                | ForgeEvent::TreasuryMilestone { .. }
                | ForgeEvent::VelocityMilestone { .. }
        )
    }
}
