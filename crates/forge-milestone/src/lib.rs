//! forge-milestone
//!
//! Milestone monitor. Watches the admission count, treasury balance and
//! protocol age, and emits a one-time `ForgeEvent` whenever one of them
//! crosses the next fixed-size threshold. Also carries the two privileged
//! announcements: caller-asserted velocity triggers and fee overrides.
//!
//! Every announcement is advisory. Nothing emitted here feeds back into the
//! fee quote.

pub mod monitor;

pub use monitor::{evaluate_velocity_condition, MilestoneMonitor};
