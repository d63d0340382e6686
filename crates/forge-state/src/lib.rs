//! forge-state
//!
//! Persistent forge state and the coordinator that ties the velocity ledger,
//! early-adopter registry, milestone monitor and fee engine together into a
//! single quote and a single admission decision.

pub mod access;
pub mod db;
pub mod engine;
pub mod reward;

pub use access::{AccessControl, Role, StaticRoles};
pub use db::StateDb;
pub use engine::{ForgeEngine, ForgeState, ForgeStats, ParticipantView, Quote, VelocitySnapshot};
pub use reward::{LoggingIssuer, RecordingIssuer, RewardIssuer};
