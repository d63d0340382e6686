use forge_core::constants::{
    DAILY_ADMISSION_QUOTA, DEMAND_TARGET_WEEKLY, ERA_LENGTH, FLOOR_FEE_SATS,
    VELOCITY_RETENTION_DAYS,
};
use forge_core::event::ForgeEvent;
use forge_core::records::AdmissionRecord;
use forge_state::{ForgeStats, ParticipantView, Quote, VelocitySnapshot};
use serde::{Deserialize, Serialize};

/// Admission record returned by submit / verify / `forge_getAdmission`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcAdmission {
    pub admission_id: String,
    pub participant: String,
    pub payment_ref: String,
    /// Offered amount in sats (u128 as string).
    pub offered_sats: String,
    /// Quote the offer was checked against (u128 as string).
    pub quoted_sats: String,
    pub submitted_at: i64,
    /// "submitted", "verified" or "rejected".
    pub status: String,
    pub verified_at: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl From<&AdmissionRecord> for RpcAdmission {
    fn from(r: &AdmissionRecord) -> Self {
        Self {
            admission_id: r.id.to_hex(),
            participant: r.participant.to_b58(),
            payment_ref: r.payment_ref.to_hex(),
            offered_sats: r.offered.to_string(),
            quoted_sats: r.quoted.to_string(),
            submitted_at: r.submitted_at,
            status: r.status_label().to_string(),
            verified_at: r.verified_at,
            rejection_reason: r.rejection.as_ref().map(|x| x.reason.clone()),
        }
    }
}

/// Participant quote with every fee layer, returned by `forge_getFeeBreakdown`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcFeeBreakdown {
    pub participant: String,
    pub quoted_at: i64,
    pub supply_fee_sats: String,
    pub demand_pct: u64,
    pub age_pct: u64,
    pub price_pct: u64,
    /// Layers 1–4 before cap and floor.
    pub combined_sats: String,
    pub band_cap_sats: String,
    pub base_fee_sats: String,
    pub discount_pct: u64,
    pub shielded: bool,
    pub protected_fee_sats: String,
    pub cooldown_pct: u64,
    pub fee_sats: String,
}

impl RpcFeeBreakdown {
    pub fn new(participant: String, quoted_at: i64, q: &Quote) -> Self {
        Self {
            participant,
            quoted_at,
            supply_fee_sats: q.base.supply_fee.to_string(),
            demand_pct: q.base.demand_pct,
            age_pct: q.base.age_pct,
            price_pct: q.base.price_pct,
            combined_sats: q.base.combined.to_string(),
            band_cap_sats: q.base.band_cap.to_string(),
            base_fee_sats: q.base.fee.to_string(),
            discount_pct: q.discount_pct,
            shielded: q.shielded,
            protected_fee_sats: q.protected_fee.to_string(),
            cooldown_pct: q.cooldown_pct,
            fee_sats: q.fee.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcParticipant {
    pub participant: String,
    pub is_early_adopter: bool,
    pub admission_count: u64,
    pub first_admission_at: Option<i64>,
    pub registered_at: Option<i64>,
    pub discount_pct: u64,
    pub shielded: bool,
    pub last_admission_at: Option<i64>,
    pub admissions_today: u32,
}

impl RpcParticipant {
    pub fn new(view: &ParticipantView, now: i64) -> Self {
        let status = view.status.as_ref();
        let activity = view.activity.as_ref();
        Self {
            participant: view.participant.to_b58(),
            is_early_adopter: status.map(|s| s.is_early_adopter).unwrap_or(false),
            admission_count: status.map(|s| s.admission_count).unwrap_or(0),
            first_admission_at: status.and_then(|s| s.first_admission_at),
            registered_at: status.and_then(|s| s.registered_at),
            discount_pct: view.discount_pct,
            shielded: view.shielded,
            last_admission_at: activity.and_then(|a| a.last_admission_at),
            admissions_today: activity.map(|a| a.rate_limit.admissions_on(now)).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcVelocity {
    pub cursor: u64,
    pub length: u64,
    pub valid: u64,
    pub forges_last_week: u64,
    pub rate_pct: u64,
    /// Ledger-side multiplier; informational.
    pub rate_multiplier_pct: u64,
    /// Multiplier the fee engine is applying right now.
    pub demand_multiplier_pct: u64,
}

impl From<VelocitySnapshot> for RpcVelocity {
    fn from(v: VelocitySnapshot) -> Self {
        Self {
            cursor: v.cursor,
            length: v.length,
            valid: v.valid,
            forges_last_week: v.forges_last_week,
            rate_pct: v.rate_pct,
            rate_multiplier_pct: v.rate_multiplier_pct,
            demand_multiplier_pct: v.demand_multiplier_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcStats {
    pub total_submitted: u64,
    pub total_admissions: u64,
    pub total_rejected: u64,
    pub success_rate_bps: u64,
    pub total_fees_sats: String,
    pub launch_time: i64,
    pub early_adopters: u64,
    pub registration_open: bool,
    pub reference_price: Option<String>,
    pub fee_override_sats: Option<String>,
    pub fee_override_reason: Option<String>,
}

impl From<ForgeStats> for RpcStats {
    fn from(s: ForgeStats) -> Self {
        Self {
            total_submitted: s.total_submitted,
            total_admissions: s.total_admissions,
            total_rejected: s.total_rejected,
            success_rate_bps: s.success_rate_bps,
            total_fees_sats: s.total_fees.to_string(),
            launch_time: s.launch_time,
            early_adopters: s.early_adopters,
            registration_open: s.registration_open,
            reference_price: s.reference_price.map(|p| p.to_string()),
            fee_override_sats: s.fee_override.as_ref().map(|o| o.fee.to_string()),
            fee_override_reason: s.fee_override.map(|o| o.reason),
        }
    }
}

/// Flattened announcement. Fields not relevant to `kind` are null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RpcEvent {
    pub kind: String,
    pub participant: Option<String>,
    pub admission_id: Option<String>,
    /// Milestone number (era, month, or treasury step).
    pub milestone: Option<String>,
    /// Amount carried by the event in sats (u128 as string).
    pub amount_sats: Option<String>,
    pub total_admissions: Option<u64>,
    pub velocity_pct: Option<u64>,
    pub sustained_days: Option<u64>,
    pub manual: Option<bool>,
    pub reason: Option<String>,
    pub at: Option<i64>,
}

impl From<&ForgeEvent> for RpcEvent {
    fn from(e: &ForgeEvent) -> Self {
        let base = RpcEvent { kind: e.name().to_string(), ..Default::default() };
        match e {
            ForgeEvent::CountMilestone { milestone, total_admissions } => RpcEvent {
                milestone: Some(milestone.to_string()),
                total_admissions: Some(*total_admissions),
                ..base
            },
            ForgeEvent::TimeMilestone { months_since_launch, at } => RpcEvent {
                milestone: Some(months_since_launch.to_string()),
                at: Some(*at),
                ..base
            },
            ForgeEvent::TreasuryMilestone { milestone, balance } => RpcEvent {
                milestone: Some(milestone.to_string()),
                amount_sats: Some(balance.to_string()),
                ..base
            },
            ForgeEvent::VelocityMilestone { velocity_pct, sustained_days, at } => RpcEvent {
                velocity_pct: Some(*velocity_pct),
                sustained_days: Some(*sustained_days),
                at: Some(*at),
                ..base
            },
            ForgeEvent::FeeAdjusted { new_fee, reason, at } => RpcEvent {
                amount_sats: Some(new_fee.to_string()),
                reason: Some(reason.clone()),
                at: Some(*at),
                ..base
            },
            ForgeEvent::AdmissionSubmitted { admission, participant, offered, .. } => RpcEvent {
                admission_id: Some(admission.to_hex()),
                participant: Some(participant.to_b58()),
                amount_sats: Some(offered.to_string()),
                ..base
            },
            ForgeEvent::AdmissionVerified { admission, participant, total_admissions } => {
                RpcEvent {
                    admission_id: Some(admission.to_hex()),
                    participant: Some(participant.to_b58()),
                    total_admissions: Some(*total_admissions),
                    ..base
                }
            }
            ForgeEvent::AdmissionRejected { admission, participant, reason } => RpcEvent {
                admission_id: Some(admission.to_hex()),
                participant: Some(participant.to_b58()),
                reason: Some(reason.clone()),
                ..base
            },
            ForgeEvent::EarlyAdopterRegistered { participant, admission_count, manual } => {
                RpcEvent {
                    participant: Some(participant.to_b58()),
                    total_admissions: Some(*admission_count),
                    manual: Some(*manual),
                    ..base
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcCutoff {
    pub time: i64,
    pub count: u64,
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcCompaction {
    pub previous_cursor: u64,
    pub cursor: u64,
    pub expired: u64,
}

/// Node version and the protocol constants clients price against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcVersionInfo {
    pub node_version: String,
    pub api_version: String,
    pub floor_fee_sats: String,
    pub era_length: u64,
    pub weekly_demand_target: u64,
    pub daily_admission_quota: u32,
    pub velocity_retention_days: i64,
}

impl RpcVersionInfo {
    pub fn current() -> Self {
        Self {
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: "1".to_string(),
            floor_fee_sats: FLOOR_FEE_SATS.to_string(),
            era_length: ERA_LENGTH,
            weekly_demand_target: DEMAND_TARGET_WEEKLY,
            daily_admission_quota: DAILY_ADMISSION_QUOTA,
            velocity_retention_days: VELOCITY_RETENTION_DAYS,
        }
    }
}
