use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use forge_core::constants::{
    COOLDOWN_DAY_SURCHARGE_PCT, COOLDOWN_HOUR_SURCHARGE_PCT, DAILY_ADMISSION_QUOTA,
    MULTIPLIER_BASE_PCT, RECENT_EVENTS_CAPACITY, SECS_PER_DAY, SECS_PER_HOUR,
};
use forge_core::error::ForgeError;
use forge_core::event::ForgeEvent;
use forge_core::params::ForgeParams;
use forge_core::records::{
    AdmissionRecord, FeeOverride, GlobalCounters, MilestoneState, ParticipantActivity,
    ParticipantStatus, Rejection,
};
use forge_core::types::{
    clip_reason, day_index, whole_days_between, AdmissionId, Amount, ParticipantId, PaymentRef,
    Percent, Timestamp,
};
use forge_fee::{demand_multiplier, fee_breakdown, FeeBreakdown, FeeInputs};
use forge_milestone::MilestoneMonitor;
use forge_registry::{AdopterCutoff, EarlyAdopterRegistry};
use forge_velocity::{Compaction, VelocityLedger};
use tracing::{debug, info, warn};

use crate::access::{AccessControl, Role};
use crate::db::StateDb;
use crate::reward::RewardIssuer;

// ── Meta keys ─────────────────────────────────────────────────────────────────

const META_COUNTERS: &str = "counters";
const META_MILESTONES: &str = "milestones";
const META_CUTOFF: &str = "adopter_cutoff";
const META_VELOCITY_CURSOR: &str = "velocity_cursor";
const META_VELOCITY_CALLS: &str = "velocity_record_calls";
const META_REFERENCE_PRICE: &str = "reference_price";

// ── Read models ───────────────────────────────────────────────────────────────

/// A participant-specific quote with every adjustment exposed.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub base: FeeBreakdown,
    pub discount_pct: Percent,
    pub shielded: bool,
    /// Base fee after discount and (unless shielded) the demand multiplier.
    pub protected_fee: Amount,
    pub cooldown_pct: Percent,
    pub fee: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantView {
    pub participant: ParticipantId,
    pub status: Option<ParticipantStatus>,
    pub activity: Option<ParticipantActivity>,
    pub discount_pct: Percent,
    pub shielded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocitySnapshot {
    pub cursor: u64,
    pub length: u64,
    pub valid: u64,
    pub forges_last_week: u64,
    pub rate_pct: Percent,
    pub rate_multiplier_pct: Percent,
    pub demand_multiplier_pct: Percent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForgeStats {
    pub total_submitted: u64,
    pub total_admissions: u64,
    pub total_rejected: u64,
    /// Verified admissions per submission, in basis points.
    pub success_rate_bps: u64,
    pub total_fees: Amount,
    pub launch_time: Timestamp,
    pub early_adopters: u64,
    pub registration_open: bool,
    pub reference_price: Option<Amount>,
    pub fee_override: Option<FeeOverride>,
}

fn cooldown_pct(last_admission_at: Option<Timestamp>, now: Timestamp) -> Percent {
    match last_admission_at {
        Some(last) => {
            let elapsed = now.saturating_sub(last);
            if elapsed < SECS_PER_HOUR {
                COOLDOWN_HOUR_SURCHARGE_PCT
            } else if elapsed < SECS_PER_DAY {
                COOLDOWN_DAY_SURCHARGE_PCT
            } else {
                MULTIPLIER_BASE_PCT
            }
        }
        None => MULTIPLIER_BASE_PCT,
    }
}

// ── ForgeState ────────────────────────────────────────────────────────────────

/// Everything a quote reads, held in memory and passed explicitly.
pub struct ForgeState {
    pub counters: GlobalCounters,
    pub ledger: VelocityLedger,
    pub registry: EarlyAdopterRegistry,
    pub milestones: MilestoneMonitor,
    pub activity: HashMap<ParticipantId, ParticipantActivity>,
    pub reference_price: Option<Amount>,
    pub target_price: Amount,
}

impl ForgeState {
    /// Fresh state at launch.
    pub fn genesis(params: &ForgeParams) -> Self {
        Self {
            counters: GlobalCounters::new(params.launch_time),
            ledger: VelocityLedger::new(),
            registry: EarlyAdopterRegistry::new(AdopterCutoff::new(
                params.early_adopter_cutoff_time,
                params.early_adopter_cutoff_count,
            )),
            milestones: MilestoneMonitor::new(params.launch_time),
            activity: HashMap::new(),
            reference_price: params.initial_reference_price.filter(|p| *p > 0),
            target_price: params.target_reference_price,
        }
    }

    fn load(db: &StateDb, params: &ForgeParams) -> Result<Option<Self>, ForgeError> {
        let Some(counters) = db.get_meta_value::<GlobalCounters>(META_COUNTERS)? else {
            return Ok(None);
        };
        if counters.launch_time != params.launch_time {
            warn!(
                stored = counters.launch_time,
                configured = params.launch_time,
                "launch time differs from parameters; keeping stored value"
            );
        }
        let launch = counters.launch_time;

        let cursor = db.get_meta_value::<u64>(META_VELOCITY_CURSOR)?.unwrap_or(0);
        let record_calls = db.get_meta_value::<u64>(META_VELOCITY_CALLS)?.unwrap_or(0);
        let valid: Vec<Timestamp> = db
            .velocity_entries()?
            .into_iter()
            .filter(|(index, _)| *index >= cursor)
            .map(|(_, at)| at)
            .collect();
        let ledger = VelocityLedger::from_parts(valid, cursor, record_calls);

        let cutoff = db.get_meta_value::<AdopterCutoff>(META_CUTOFF)?.unwrap_or_else(|| {
            AdopterCutoff::new(params.early_adopter_cutoff_time, params.early_adopter_cutoff_count)
        });
        let registry = EarlyAdopterRegistry::from_parts(cutoff, db.iter_participants()?);

        let milestones = db
            .get_meta_value::<MilestoneState>(META_MILESTONES)?
            .unwrap_or_else(|| MilestoneState::new(launch));

        let activity = db
            .iter_activity()?
            .into_iter()
            .map(|a| (a.participant, a))
            .collect();

        let reference_price = db
            .get_meta_value::<Option<Amount>>(META_REFERENCE_PRICE)?
            .unwrap_or(params.initial_reference_price);

        Ok(Some(Self {
            counters,
            ledger,
            registry,
            milestones: MilestoneMonitor::from_state(milestones, launch),
            activity,
            reference_price,
            target_price: params.target_reference_price,
        }))
    }

    pub fn fee_inputs(&self, now: Timestamp) -> FeeInputs {
        FeeInputs {
            forge_count: self.counters.total_admissions,
            forges_last_week: self.ledger.count_since(7, now),
            days_since_launch: whole_days_between(self.counters.launch_time, now),
            reference_price: self.reference_price,
            target_price: self.target_price,
        }
    }

    /// Pure: recomputed from current aggregates on every call.
    pub fn quote(&self, participant: &ParticipantId, now: Timestamp) -> Quote {
        let inputs = self.fee_inputs(now);
        let base = fee_breakdown(&inputs);
        let demand = demand_multiplier(inputs.forges_last_week);
        let protected_fee = self.registry.protected_fee(participant, base.fee, demand);

        let last = self.activity.get(participant).and_then(|a| a.last_admission_at);
        let cooldown = cooldown_pct(last, now);
        let fee = protected_fee.saturating_mul(cooldown as u128) / MULTIPLIER_BASE_PCT as u128;

        Quote {
            base,
            discount_pct: self.registry.discount_for(participant),
            shielded: self.registry.is_shielded(participant),
            protected_fee,
            cooldown_pct: cooldown,
            fee,
        }
    }
}

// ── ForgeEngine ───────────────────────────────────────────────────────────────

/// The forge coordinator.
///
/// Every mutating call validates completely before it writes anything, so a
/// rejected call leaves both memory and storage untouched. Callers that share
/// an engine across tasks serialise mutations behind a write lock.
pub struct ForgeEngine {
    db: Arc<StateDb>,
    state: ForgeState,
    access: Arc<dyn AccessControl>,
    rewards: Arc<dyn RewardIssuer>,
    events: VecDeque<ForgeEvent>,
}

impl ForgeEngine {
    /// Open the engine over `db`, restoring persisted state or initialising
    /// it from `params` on first start.
    pub fn open(
        db: Arc<StateDb>,
        params: &ForgeParams,
        access: Arc<dyn AccessControl>,
        rewards: Arc<dyn RewardIssuer>,
    ) -> Result<Self, ForgeError> {
        let (state, fresh) = match ForgeState::load(&db, params)? {
            Some(state) => (state, false),
            None => (ForgeState::genesis(params), true),
        };
        let engine = Self { db, state, access, rewards, events: VecDeque::new() };
        if fresh {
            engine.persist_counters()?;
            engine.persist_cutoff()?;
            engine.persist_milestones()?;
            engine.persist_ledger_meta()?;
            engine.persist_reference_price()?;
            info!(launch_time = params.launch_time, "forge state initialised");
        } else {
            info!(
                total_admissions = engine.state.counters.total_admissions,
                participants = engine.state.registry.participants().count(),
                velocity_cursor = engine.state.ledger.cursor(),
                "forge state restored"
            );
        }
        Ok(engine)
    }

    pub fn state(&self) -> &ForgeState {
        &self.state
    }

    // ── Persistence helpers ───────────────────────────────────────────────────

    fn persist_counters(&self) -> Result<(), ForgeError> {
        self.db.put_meta_value(META_COUNTERS, &self.state.counters)
    }

    fn persist_cutoff(&self) -> Result<(), ForgeError> {
        self.db.put_meta_value(META_CUTOFF, &self.state.registry.cutoff())
    }

    fn persist_milestones(&self) -> Result<(), ForgeError> {
        self.db.put_meta_value(META_MILESTONES, self.state.milestones.state())
    }

    fn persist_ledger_meta(&self) -> Result<(), ForgeError> {
        self.db.put_meta_value(META_VELOCITY_CURSOR, &self.state.ledger.cursor())?;
        self.db.put_meta_value(META_VELOCITY_CALLS, &self.state.ledger.record_calls())
    }

    fn persist_reference_price(&self) -> Result<(), ForgeError> {
        self.db.put_meta_value(META_REFERENCE_PRICE, &self.state.reference_price)
    }

    fn prune_velocity(&self, pass: Compaction) -> Result<(), ForgeError> {
        if pass.expired() > 0 {
            let removed = self.db.prune_velocity_below(pass.cursor)?;
            debug!(removed, cursor = pass.cursor, "velocity entries pruned from storage");
        }
        Ok(())
    }

    fn activity_of(&self, participant: &ParticipantId) -> ParticipantActivity {
        self.state
            .activity
            .get(participant)
            .cloned()
            .unwrap_or_else(|| ParticipantActivity::new(*participant))
    }

    fn announce(&mut self, event: ForgeEvent) {
        debug!(event = event.name(), "announcement");
        if self.events.len() == RECENT_EVENTS_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn quote(&self, participant: &ParticipantId, now: Timestamp) -> Amount {
        self.state.quote(participant, now).fee
    }

    pub fn quote_breakdown(&self, participant: &ParticipantId, now: Timestamp) -> Quote {
        self.state.quote(participant, now)
    }

    pub fn admission(&self, id: &AdmissionId) -> Result<Option<AdmissionRecord>, ForgeError> {
        self.db.get_admission(id)
    }

    pub fn participant(&self, participant: &ParticipantId) -> ParticipantView {
        ParticipantView {
            participant: *participant,
            status: self.state.registry.status(participant).cloned(),
            activity: self.state.activity.get(participant).cloned(),
            discount_pct: self.state.registry.discount_for(participant),
            shielded: self.state.registry.is_shielded(participant),
        }
    }

    pub fn velocity(&self, now: Timestamp) -> VelocitySnapshot {
        let ledger = &self.state.ledger;
        let forges_last_week = ledger.count_since(7, now);
        VelocitySnapshot {
            cursor: ledger.cursor(),
            length: ledger.len(),
            valid: ledger.valid_len(),
            forges_last_week,
            rate_pct: ledger.rate(),
            rate_multiplier_pct: ledger.rate_multiplier(),
            demand_multiplier_pct: demand_multiplier(forges_last_week),
        }
    }

    pub fn stats(&self, now: Timestamp) -> ForgeStats {
        let c = &self.state.counters;
        let success_rate_bps = if c.total_submitted == 0 {
            0
        } else {
            c.total_admissions.saturating_mul(10_000) / c.total_submitted
        };
        ForgeStats {
            total_submitted: c.total_submitted,
            total_admissions: c.total_admissions,
            total_rejected: c.total_rejected,
            success_rate_bps,
            total_fees: c.total_fees,
            launch_time: c.launch_time,
            early_adopters: self.state.registry.early_adopter_count() as u64,
            registration_open: !self
                .state
                .registry
                .cutoff()
                .has_passed(now, c.total_admissions + 1),
            reference_price: self.state.reference_price,
            fee_override: self.state.milestones.state().fee_override.clone(),
        }
    }

    /// The most recent announcements, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<ForgeEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    // ── Admission lifecycle ───────────────────────────────────────────────────

    /// Validate an offer against the current quote and record it as
    /// Submitted. A quote obtained earlier is advisory; the offer is checked
    /// against the quote at `now`.
    pub fn submit(
        &mut self,
        participant: ParticipantId,
        payment_ref: PaymentRef,
        offered: Amount,
        now: Timestamp,
    ) -> Result<AdmissionRecord, ForgeError> {
        if self.db.consumed_by(&payment_ref)?.is_some() {
            return Err(ForgeError::PaymentReferenceConsumed(payment_ref.to_hex()));
        }

        let used_today = self
            .state
            .activity
            .get(&participant)
            .map(|a| a.rate_limit.used_on(now))
            .unwrap_or(0);
        if used_today >= DAILY_ADMISSION_QUOTA {
            return Err(ForgeError::DailyQuotaExhausted {
                limit: DAILY_ADMISSION_QUOTA,
                day: day_index(now),
            });
        }

        let required = self.quote(&participant, now);
        if offered < required {
            return Err(ForgeError::InsufficientOffer { required, offered });
        }

        let record = AdmissionRecord::submitted(participant, payment_ref, offered, required, now);
        if self.db.admission_exists(&record.id)? {
            return Err(ForgeError::DuplicateAdmission(record.id.to_hex()));
        }

        let mut activity = self.activity_of(&participant);
        activity.rate_limit.reserve(now);
        let mut counters = self.state.counters.clone();
        counters.total_submitted += 1;

        // ── Commit ────────────────────────────────────────────────────────────
        self.db.put_admission(&record)?;
        self.db.put_activity(&activity)?;
        self.db.put_meta_value(META_COUNTERS, &counters)?;
        self.state.activity.insert(participant, activity);
        self.state.counters = counters;

        info!(
            admission = %record.id,
            participant = %participant,
            offered = %offered,
            quoted = %required,
            "admission submitted"
        );
        self.announce(ForgeEvent::AdmissionSubmitted {
            admission: record.id,
            participant,
            offered,
            quoted: required,
        });
        Ok(record)
    }

    /// Oracle callback for a submitted admission.
    ///
    /// Failure attaches the diagnostic reason and leaves the admission
    /// unverified for good. Success consumes the payment reference, issues
    /// exactly one reward, and feeds the new totals into the ledger,
    /// registry and milestone monitor.
    pub fn verify(
        &mut self,
        caller: &ParticipantId,
        participant: &ParticipantId,
        admission_id: &AdmissionId,
        success: bool,
        reason: &str,
        now: Timestamp,
    ) -> Result<AdmissionRecord, ForgeError> {
        self.access.require(caller, Role::Oracle)?;

        let mut record = self
            .db
            .get_admission(admission_id)?
            .ok_or_else(|| ForgeError::UnknownAdmission(admission_id.to_hex()))?;
        if record.participant != *participant {
            return Err(ForgeError::ParticipantMismatch {
                admission: admission_id.to_hex(),
                participant: participant.to_string(),
            });
        }
        if record.verified {
            return Err(ForgeError::AlreadyVerified(admission_id.to_hex()));
        }
        if record.rejection.is_some() {
            return Err(ForgeError::AlreadyRejected(admission_id.to_hex()));
        }

        if !success {
            return self.reject(record, reason, now);
        }

        if let Some(winner) = self.db.consumed_by(&record.payment_ref)? {
            warn!(
                admission = %admission_id,
                consumed_by = %winner,
                "payment reference already consumed"
            );
            return Err(ForgeError::PaymentReferenceConsumed(record.payment_ref.to_hex()));
        }

        let total = self.state.counters.total_admissions + 1;

        // ── Stage ─────────────────────────────────────────────────────────────
        let mut counters = self.state.counters.clone();
        counters.total_admissions = total;
        counters.total_fees = counters.total_fees.saturating_add(record.offered);

        let mut ledger = self.state.ledger.clone();
        let index = ledger.len();
        let compaction = ledger.record(now);

        let registration = self.state.registry.registration_for(participant, total, now);
        let cutoff = self.state.registry.cutoff_after(total, now);

        let mut activity = self.activity_of(participant);
        activity.rate_limit.release(record.submitted_at);
        activity.rate_limit.record(now);
        activity.last_admission_at = Some(now);

        let mut milestones = self.state.milestones.clone();
        let milestone = milestones.update_admission_count(total);

        record.verified = true;
        record.verified_at = Some(now);

        self.rewards.issue(participant, admission_id, total)?;

        // ── Commit ────────────────────────────────────────────────────────────
        // The verified record is written first. If a later write fails, a
        // retried verification stops at AlreadyVerified and the reward is not
        // issued twice; the aggregates below lag until repaired.
        self.db.put_admission(&record)?;
        self.db.consume_ref(&record.payment_ref, &record.id)?;
        self.db.put_velocity_entry(index, now)?;
        self.db.put_participant(&registration.status)?;
        self.db.put_activity(&activity)?;
        self.db.put_meta_value(META_COUNTERS, &counters)?;
        self.db.put_meta_value(META_VELOCITY_CURSOR, &ledger.cursor())?;
        self.db.put_meta_value(META_VELOCITY_CALLS, &ledger.record_calls())?;
        self.db.put_meta_value(META_CUTOFF, &cutoff)?;
        self.db.put_meta_value(META_MILESTONES, milestones.state())?;

        self.state.counters = counters;
        self.state.ledger = ledger;
        self.state.registry.apply(&registration, total, now);
        self.state.activity.insert(*participant, activity);
        self.state.milestones = milestones;

        // Entries below the cursor are ignored on load; a failed prune only
        // costs space.
        if let Some(pass) = compaction {
            if let Err(e) = self.prune_velocity(pass) {
                warn!(error = %e, cursor = pass.cursor, "velocity prune failed");
            }
        }

        info!(
            admission = %admission_id,
            participant = %participant,
            total_admissions = total,
            early_adopter = registration.status.is_early_adopter,
            "admission verified"
        );
        self.announce(ForgeEvent::AdmissionVerified {
            admission: *admission_id,
            participant: *participant,
            total_admissions: total,
        });
        if registration.newly_registered {
            self.announce(ForgeEvent::EarlyAdopterRegistered {
                participant: *participant,
                admission_count: registration.status.admission_count,
                manual: false,
            });
        }
        if let Some(event) = milestone {
            self.announce(event);
        }
        Ok(record)
    }

    fn reject(
        &mut self,
        mut record: AdmissionRecord,
        reason: &str,
        now: Timestamp,
    ) -> Result<AdmissionRecord, ForgeError> {
        let reason = clip_reason(reason);
        record.rejection = Some(Rejection { reason: reason.clone(), rejected_at: now });

        let mut activity = self.activity_of(&record.participant);
        activity.rate_limit.release(record.submitted_at);
        let mut counters = self.state.counters.clone();
        counters.total_rejected += 1;

        // ── Commit ────────────────────────────────────────────────────────────
        self.db.put_admission(&record)?;
        self.db.put_activity(&activity)?;
        self.db.put_meta_value(META_COUNTERS, &counters)?;
        self.state.activity.insert(record.participant, activity);
        self.state.counters = counters;

        warn!(
            admission = %record.id,
            participant = %record.participant,
            reason = %reason,
            "admission rejected by oracle"
        );
        self.announce(ForgeEvent::AdmissionRejected {
            admission: record.id,
            participant: record.participant,
            reason,
        });
        Ok(record)
    }

    // ── Administrative surface ────────────────────────────────────────────────

    /// Inbound reference price, fed by an admin or the oracle. `None` or zero
    /// marks the price unknown.
    pub fn set_reference_price(
        &mut self,
        caller: &ParticipantId,
        price: Option<Amount>,
    ) -> Result<Option<Amount>, ForgeError> {
        if !self.access.has_role(caller, Role::Oracle) {
            self.access.require(caller, Role::Admin)?;
        }
        self.state.reference_price = price.filter(|p| *p > 0);
        self.persist_reference_price()?;
        info!(price = ?self.state.reference_price, "reference price updated");
        Ok(self.state.reference_price)
    }

    pub fn set_cutoff(
        &mut self,
        caller: &ParticipantId,
        time: Timestamp,
        count: u64,
        now: Timestamp,
    ) -> Result<AdopterCutoff, ForgeError> {
        self.access.require(caller, Role::Admin)?;
        let next = self.state.counters.total_admissions + 1;
        let result = self.state.registry.set_cutoff(time, count, now, next);
        // A refusal may still have latched the registry closed.
        self.persist_cutoff()?;
        result
    }

    pub fn manual_register(
        &mut self,
        caller: &ParticipantId,
        participant: &ParticipantId,
        seed_count: u64,
        now: Timestamp,
    ) -> Result<ParticipantStatus, ForgeError> {
        self.access.require(caller, Role::Admin)?;
        let status = self.state.registry.manual_register(participant, seed_count, now)?;
        self.db.put_participant(&status)?;
        self.announce(ForgeEvent::EarlyAdopterRegistered {
            participant: *participant,
            admission_count: status.admission_count,
            manual: true,
        });
        Ok(status)
    }

    pub fn adjust_fee(
        &mut self,
        caller: &ParticipantId,
        new_fee: Amount,
        reason: &str,
        now: Timestamp,
    ) -> Result<ForgeEvent, ForgeError> {
        self.access.require(caller, Role::Admin)?;
        let event = self.state.milestones.adjust_fee(new_fee, reason, now)?;
        self.persist_milestones()?;
        self.announce(event.clone());
        Ok(event)
    }

    pub fn update_treasury_balance(
        &mut self,
        caller: &ParticipantId,
        balance: Amount,
    ) -> Result<Option<ForgeEvent>, ForgeError> {
        self.access.require(caller, Role::Admin)?;
        let event = self.state.milestones.update_treasury_balance(balance);
        if let Some(event) = &event {
            self.persist_milestones()?;
            self.announce(event.clone());
        }
        Ok(event)
    }

    pub fn record_velocity_trigger(
        &mut self,
        caller: &ParticipantId,
        velocity_pct: Percent,
        sustained_days: u64,
        now: Timestamp,
    ) -> Result<Option<ForgeEvent>, ForgeError> {
        self.access.require(caller, Role::Admin)?;
        let event = self
            .state
            .milestones
            .record_velocity_trigger(velocity_pct, sustained_days, now);
        self.persist_milestones()?;
        if let Some(event) = &event {
            self.announce(event.clone());
        }
        Ok(event)
    }

    // ── Maintenance (anyone) ──────────────────────────────────────────────────

    pub fn compact(&mut self, now: Timestamp) -> Result<Compaction, ForgeError> {
        let pass = self.state.ledger.compact(now);
        self.prune_velocity(pass)?;
        self.persist_ledger_meta()?;
        Ok(pass)
    }

    pub fn check_time_milestone(&mut self, now: Timestamp) -> Result<Option<ForgeEvent>, ForgeError> {
        let event = self.state.milestones.check_time_milestone(now);
        if let Some(event) = &event {
            self.persist_milestones()?;
            self.announce(event.clone());
        }
        Ok(event)
    }

    /// Flush pending writes.
    pub fn flush(&self) -> Result<(), ForgeError> {
        self.db.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::StaticRoles;
    use crate::reward::RecordingIssuer;
    use forge_core::constants::{FLOOR_FEE_SATS, SATS_PER_BTC};

    const LAUNCH: Timestamp = 1_800_000_000;
    const ORACLE: ParticipantId = ParticipantId([0xAA; 32]);
    const ADMIN: ParticipantId = ParticipantId([0xBB; 32]);

    fn temp_db(name: &str) -> Arc<StateDb> {
        let dir = std::env::temp_dir().join(format!("forge_engine_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(StateDb::open(&dir).expect("open temp db"))
    }

    fn params() -> ForgeParams {
        ForgeParams::development(LAUNCH)
    }

    fn engine_on(db: Arc<StateDb>, rewards: Arc<RecordingIssuer>) -> ForgeEngine {
        let access = Arc::new(StaticRoles::new([ORACLE], [ADMIN]));
        ForgeEngine::open(db, &params(), access, rewards).expect("open engine")
    }

    fn engine(name: &str) -> (ForgeEngine, Arc<RecordingIssuer>) {
        let rewards = Arc::new(RecordingIssuer::new());
        (engine_on(temp_db(name), rewards.clone()), rewards)
    }

    fn pid(n: u8) -> ParticipantId {
        ParticipantId([n; 32])
    }

    fn pref(n: u8) -> PaymentRef {
        PaymentRef([n; 32])
    }

    fn admit(e: &mut ForgeEngine, p: ParticipantId, r: PaymentRef, now: Timestamp) -> AdmissionRecord {
        let fee = e.quote(&p, now);
        let rec = e.submit(p, r, fee, now).unwrap();
        e.verify(&ORACLE, &p, &rec.id, true, "", now).unwrap()
    }

    #[test]
    fn fresh_engine_quotes_floor() {
        let (e, _) = engine("fresh_quote");
        let q = e.quote_breakdown(&pid(1), LAUNCH + 15 * SECS_PER_DAY);
        assert_eq!(q.base.fee, FLOOR_FEE_SATS);
        assert_eq!(q.cooldown_pct, 100);
        assert_eq!(q.fee, FLOOR_FEE_SATS);
    }

    #[test]
    fn underpayment_is_rejected() {
        let (mut e, _) = engine("underpay");
        let err = e.submit(pid(1), pref(1), FLOOR_FEE_SATS - 1, LAUNCH).unwrap_err();
        assert!(matches!(
            err,
            ForgeError::InsufficientOffer { required: FLOOR_FEE_SATS, offered } if offered == FLOOR_FEE_SATS - 1
        ));
        assert_eq!(e.stats(LAUNCH).total_submitted, 0);
    }

    #[test]
    fn only_the_oracle_verifies() {
        let (mut e, rewards) = engine("oracle_only");
        let rec = e.submit(pid(1), pref(1), FLOOR_FEE_SATS, LAUNCH).unwrap();
        let err = e.verify(&ADMIN, &pid(1), &rec.id, true, "", LAUNCH).unwrap_err();
        assert!(matches!(err, ForgeError::Unauthorized { role: "oracle", .. }));
        assert!(rewards.issued().is_empty());
        assert!(!e.admission(&rec.id).unwrap().unwrap().verified);
    }

    #[test]
    fn verify_rejects_participant_mismatch() {
        let (mut e, _) = engine("mismatch");
        let rec = e.submit(pid(1), pref(1), FLOOR_FEE_SATS, LAUNCH).unwrap();
        let err = e.verify(&ORACLE, &pid(2), &rec.id, true, "", LAUNCH).unwrap_err();
        assert!(matches!(err, ForgeError::ParticipantMismatch { .. }));
    }

    #[test]
    fn oracle_failure_leaves_reference_reusable() {
        let (mut e, rewards) = engine("oracle_failure");
        let p = pid(1);
        let rec = e.submit(p, pref(1), FLOOR_FEE_SATS, LAUNCH).unwrap();
        let rejected = e
            .verify(&ORACLE, &p, &rec.id, false, "insufficient confirmations", LAUNCH + 10)
            .unwrap();
        assert!(!rejected.verified);
        assert_eq!(rejected.status_label(), "rejected");
        assert!(rewards.issued().is_empty());

        // The rejected slot is final.
        assert!(matches!(
            e.verify(&ORACLE, &p, &rec.id, true, "", LAUNCH + 20),
            Err(ForgeError::AlreadyRejected(_))
        ));

        // A fresh submission may reuse the same payment reference.
        let retry = admit(&mut e, p, pref(1), LAUNCH + 30);
        assert!(retry.verified);
        let stats = e.stats(LAUNCH + 30);
        assert_eq!((stats.total_submitted, stats.total_admissions, stats.total_rejected), (2, 1, 1));
        assert_eq!(stats.success_rate_bps, 5_000);
    }

    #[test]
    fn failed_reward_issuance_changes_nothing() {
        let (mut e, rewards) = engine("reward_failure");
        let p = pid(1);
        let rec = e.submit(p, pref(1), FLOOR_FEE_SATS, LAUNCH).unwrap();
        rewards.set_failing(true);
        assert!(matches!(
            e.verify(&ORACLE, &p, &rec.id, true, "", LAUNCH),
            Err(ForgeError::RewardIssuance(_))
        ));
        assert_eq!(e.stats(LAUNCH).total_admissions, 0);
        assert!(e.participant(&p).status.is_none());
        assert_eq!(e.velocity(LAUNCH).length, 0);
        let quota = e.participant(&p).activity.unwrap().rate_limit;
        assert_eq!((quota.pending_on(LAUNCH), quota.admissions_on(LAUNCH)), (1, 0));
        assert!(e.recent_events(10).iter().all(|ev| ev.name() == "admission_submitted"));

        rewards.set_failing(false);
        assert!(e.verify(&ORACLE, &p, &rec.id, true, "", LAUNCH).unwrap().verified);
        assert_eq!(rewards.issued(), vec![(p, rec.id)]);
    }

    #[test]
    fn first_admission_registers_early_adopter() {
        let (mut e, _) = engine("early_adopter");
        let p = pid(1);
        admit(&mut e, p, pref(1), LAUNCH);
        let view = e.participant(&p);
        assert!(view.status.as_ref().unwrap().is_early_adopter);
        assert_eq!(view.discount_pct, 25);
        assert!(view.shielded);

        // A day later the cooldown has lapsed and only the discount applies.
        assert_eq!(e.quote(&p, LAUNCH + SECS_PER_DAY), FLOOR_FEE_SATS * 75 / 100);
        assert!(e
            .recent_events(10)
            .iter()
            .any(|ev| matches!(ev, ForgeEvent::EarlyAdopterRegistered { manual: false, .. })));
    }

    #[test]
    fn admin_surface_requires_admin() {
        let (mut e, _) = engine("admin_surface");
        assert!(matches!(
            e.adjust_fee(&pid(9), SATS_PER_BTC, "x", LAUNCH),
            Err(ForgeError::Unauthorized { role: "admin", .. })
        ));
        assert!(matches!(
            e.adjust_fee(&ADMIN, 0, "x", LAUNCH),
            Err(ForgeError::ZeroFeeOverride)
        ));
        e.adjust_fee(&ADMIN, 3 * SATS_PER_BTC, "manual", LAUNCH).unwrap();
        // Recorded, never applied to quotes.
        assert_eq!(e.quote(&pid(1), LAUNCH), FLOOR_FEE_SATS);
        assert_eq!(e.stats(LAUNCH).fee_override.unwrap().fee, 3 * SATS_PER_BTC);

        assert_eq!(e.record_velocity_trigger(&ADMIN, 120, 5, LAUNCH).unwrap(), None);
        assert!(e.record_velocity_trigger(&ADMIN, 160, 5, LAUNCH).unwrap().is_some());
        assert_eq!(e.record_velocity_trigger(&ADMIN, 160, 5, LAUNCH + 60).unwrap(), None);
        assert!(e.state().milestones.state().velocity_trigger_active);
    }

    #[test]
    fn reference_price_feeds_layer_four() {
        let (mut e, _) = engine("reference_price");
        let target = params().target_reference_price;
        e.set_reference_price(&ORACLE, Some(target / 2)).unwrap();
        assert_eq!(e.quote_breakdown(&pid(1), LAUNCH).base.price_pct, 200);
        assert_eq!(e.quote(&pid(1), LAUNCH), 2 * FLOOR_FEE_SATS);

        assert_eq!(e.set_reference_price(&ADMIN, Some(0)).unwrap(), None);
        assert_eq!(e.quote(&pid(1), LAUNCH), FLOOR_FEE_SATS);
        assert!(e.set_reference_price(&pid(5), Some(1)).is_err());
    }

    #[test]
    fn state_survives_restart() {
        let dir = std::env::temp_dir().join("forge_engine_test_restart");
        let _ = std::fs::remove_dir_all(&dir);
        let rewards = Arc::new(RecordingIssuer::new());
        let p = pid(1);
        {
            let db = Arc::new(StateDb::open(&dir).unwrap());
            let mut e = engine_on(db, rewards.clone());
            admit(&mut e, p, pref(1), LAUNCH);
            admit(&mut e, p, pref(2), LAUNCH + 2 * SECS_PER_DAY);
            e.set_reference_price(&ADMIN, Some(42 * SATS_PER_BTC)).unwrap();
            e.flush().unwrap();
        }
        let db = Arc::new(StateDb::open(&dir).unwrap());
        let mut e = engine_on(db, rewards);
        let now = LAUNCH + 2 * SECS_PER_DAY + 10;
        assert_eq!(e.stats(now).total_admissions, 2);
        assert_eq!(e.stats(now).reference_price, Some(42 * SATS_PER_BTC));
        assert_eq!(e.participant(&p).status.unwrap().admission_count, 2);
        assert_eq!(e.velocity(now).length, 2);
        // Cooldown state came back too.
        assert_eq!(e.quote_breakdown(&p, now).cooldown_pct, 150);
        // Consumed references stay consumed.
        assert!(matches!(
            e.submit(p, pref(1), 10 * SATS_PER_BTC, now + SECS_PER_DAY),
            Err(ForgeError::PaymentReferenceConsumed(_))
        ));
    }

    #[test]
    fn compaction_prunes_storage() {
        let (mut e, _) = engine("compaction");
        for d in 0..4u8 {
            admit(&mut e, pid(d), pref(d), LAUNCH + d as i64 * SECS_PER_DAY);
        }
        let pass = e.compact(LAUNCH + 16 * SECS_PER_DAY + 1).unwrap();
        // Days 0, 1 and 2 are outside the 14-day window.
        assert_eq!(pass.cursor, 3);
        assert_eq!(e.db.velocity_entries().unwrap().len(), 1);
        assert_eq!(e.compact(LAUNCH + 16 * SECS_PER_DAY + 1).unwrap().expired(), 0);
        let v = e.velocity(LAUNCH + 16 * SECS_PER_DAY + 1);
        assert_eq!((v.cursor, v.length, v.valid), (3, 4, 1));
    }

    #[test]
    fn recent_events_are_bounded() {
        let (mut e, _) = engine("events_ring");
        for i in 0..(RECENT_EVENTS_CAPACITY + 10) {
            e.announce(ForgeEvent::TimeMilestone { months_since_launch: i as u64, at: LAUNCH });
        }
        let all = e.recent_events(usize::MAX);
        assert_eq!(all.len(), RECENT_EVENTS_CAPACITY);
        assert_eq!(
            e.recent_events(1),
            vec![ForgeEvent::TimeMilestone {
                months_since_launch: (RECENT_EVENTS_CAPACITY + 9) as u64,
                at: LAUNCH
            }]
        );
    }
}
