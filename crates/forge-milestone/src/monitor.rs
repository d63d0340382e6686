use forge_core::constants::{
    COUNT_MILESTONE_INTERVAL, TIME_MILESTONE_INTERVAL_SECS, TREASURY_MILESTONE_INTERVAL_SATS,
    VELOCITY_TRIGGER_MIN_DAYS, VELOCITY_TRIGGER_MIN_PCT,
};
use forge_core::error::ForgeError;
use forge_core::event::ForgeEvent;
use forge_core::records::{FeeOverride, MilestoneState};
use forge_core::types::{clip_reason, Amount, Percent, Timestamp};
use tracing::{info, warn};

/// Sustained-demand predicate: at least 150% velocity held for at least
/// three days.
pub fn evaluate_velocity_condition(velocity_pct: Percent, sustained_days: u64) -> bool {
    velocity_pct >= VELOCITY_TRIGGER_MIN_PCT && sustained_days >= VELOCITY_TRIGGER_MIN_DAYS
}

#[derive(Clone, Debug)]
pub struct MilestoneMonitor {
    state: MilestoneState,
    launch_time: Timestamp,
}

impl MilestoneMonitor {
    pub fn new(launch_time: Timestamp) -> Self {
        Self { state: MilestoneState::new(launch_time), launch_time }
    }

    pub fn from_state(state: MilestoneState, launch_time: Timestamp) -> Self {
        Self { state, launch_time }
    }

    pub fn state(&self) -> &MilestoneState {
        &self.state
    }

    pub fn launch_time(&self) -> Timestamp {
        self.launch_time
    }

    /// Whole 30-day months elapsed since launch; 0 before launch.
    pub fn months_since_launch(&self, now: Timestamp) -> u64 {
        if now <= self.launch_time {
            return 0;
        }
        ((now - self.launch_time) / TIME_MILESTONE_INTERVAL_SECS) as u64
    }

    /// Announce the era milestone for `new_total` if it is past the last one
    /// announced.
    pub fn update_admission_count(&mut self, new_total: u64) -> Option<ForgeEvent> {
        let milestone = new_total / COUNT_MILESTONE_INTERVAL;
        if milestone <= self.state.last_count_milestone {
            return None;
        }
        self.state.last_count_milestone = milestone;
        info!(milestone, total_admissions = new_total, "admission-count milestone");
        Some(ForgeEvent::CountMilestone { milestone, total_admissions: new_total })
    }

    pub fn update_treasury_balance(&mut self, balance: Amount) -> Option<ForgeEvent> {
        let milestone = balance / TREASURY_MILESTONE_INTERVAL_SATS;
        if milestone <= self.state.last_treasury_milestone {
            return None;
        }
        self.state.last_treasury_milestone = milestone;
        info!(milestone = milestone as u64, balance = balance as u64, "treasury milestone");
        Some(ForgeEvent::TreasuryMilestone { milestone, balance })
    }

    /// Anyone may call this. Fires at most once per elapsed interval; the
    /// marker snaps to `launch + months × 30 days` so missed checks do not
    /// drift the schedule.
    pub fn check_time_milestone(&mut self, now: Timestamp) -> Option<ForgeEvent> {
        let due = self
            .state
            .last_time_milestone_at
            .saturating_add(TIME_MILESTONE_INTERVAL_SECS);
        if now < due {
            return None;
        }
        let months = self.months_since_launch(now);
        self.state.last_time_milestone_at =
            self.launch_time + months as i64 * TIME_MILESTONE_INTERVAL_SECS;
        info!(months_since_launch = months, "time milestone");
        Some(ForgeEvent::TimeMilestone { months_since_launch: months, at: now })
    }

    /// Privileged assertion over caller-supplied figures. A false predicate
    /// is not an error; it announces nothing and ends the current episode.
    /// Repeating a true assertion within one episode is a no-op.
    pub fn record_velocity_trigger(
        &mut self,
        velocity_pct: Percent,
        sustained_days: u64,
        now: Timestamp,
    ) -> Option<ForgeEvent> {
        if !evaluate_velocity_condition(velocity_pct, sustained_days) {
            self.state.velocity_trigger_active = false;
            return None;
        }
        if self.state.velocity_trigger_active {
            return None;
        }
        self.state.velocity_trigger_active = true;
        info!(velocity_pct, sustained_days, "velocity milestone asserted");
        Some(ForgeEvent::VelocityMilestone { velocity_pct, sustained_days, at: now })
    }

    /// Record an administrative fee override. The stored value is
    /// informational only.
    pub fn adjust_fee(
        &mut self,
        new_fee: Amount,
        reason: &str,
        now: Timestamp,
    ) -> Result<ForgeEvent, ForgeError> {
        if new_fee == 0 {
            return Err(ForgeError::ZeroFeeOverride);
        }
        let reason = clip_reason(reason);
        warn!(new_fee = new_fee as u64, reason = %reason, "fee override recorded");
        self.state.fee_override = Some(FeeOverride { fee: new_fee, reason: reason.clone(), set_at: now });
        Ok(ForgeEvent::FeeAdjusted { new_fee, reason, at: now })
    }
}
