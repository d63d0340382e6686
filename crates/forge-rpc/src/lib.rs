//! forge-rpc
//!
//! JSON-RPC 2.0 server for the forge coordinator.
//!
//! Namespace: "forge"
//! Methods:
//!   forge_getQuote              required fee for a participant right now
//!   forge_getFeeBreakdown       the same quote with every layer exposed
//!   forge_projectFee            stateless fee projection for hypothetical metrics
//!   forge_submitAdmission       submit an offer backed by a payment reference
//!   forge_verifyAdmission       oracle callback (success / failure + reason)
//!   forge_getAdmission          admission record by id hex
//!   forge_getParticipant        loyalty status, discount and activity
//!   forge_getVelocity           velocity ledger snapshot
//!   forge_getStats              protocol-wide counters
//!   forge_getRecentEvents       latest announcements
//!   forge_setReferencePrice     inbound reference price (admin / oracle)
//!   forge_setCutoff             move the early-adopter cutoff (admin)
//!   forge_manualRegister        backfill an early adopter (admin)
//!   forge_adjustFee             record a fee override (admin)
//!   forge_updateTreasuryBalance feed the treasury milestone (admin)
//!   forge_recordVelocityTrigger assert a sustained-demand milestone (admin)
//!   forge_compact               expire old velocity entries (anyone)
//!   forge_checkTimeMilestone    fire the monthly milestone if due (anyone)
//!   forge_getVersion            node version and protocol constants
//!
//! Amounts are satoshi strings (u128); participants are base-58; payment
//! references and admission ids are hex.

pub mod api;
pub mod server;
pub mod types;

pub use api::{ForgeApiClient, ForgeApiServer};
pub use server::{wall_clock, RpcServer, RpcServerState};
pub use types::{
    RpcAdmission, RpcCompaction, RpcCutoff, RpcEvent, RpcFeeBreakdown, RpcParticipant, RpcStats,
    RpcVelocity, RpcVersionInfo,
};
