use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tokio::sync::RwLock;
use tracing::{info, warn};

use forge_core::error::{ErrorKind, ForgeError};
use forge_core::types::{AdmissionId, Amount, ParticipantId, PaymentRef, Timestamp};
use forge_fee::project_future_fee;
use forge_state::ForgeEngine;

use crate::api::ForgeApiServer;
use crate::types::{
    RpcAdmission, RpcCompaction, RpcCutoff, RpcEvent, RpcFeeBreakdown, RpcParticipant, RpcStats,
    RpcVelocity, RpcVersionInfo,
};

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const CONFLICT: i32 = -32010;
pub const ADMISSION_REFUSED: i32 = -32011;
pub const UNAUTHORIZED: i32 = -32012;

const DEFAULT_EVENT_LIMIT: usize = 50;

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn forge_err(e: ForgeError) -> ErrorObject<'static> {
    let code = match e.kind() {
        ErrorKind::Validation => INVALID_PARAMS,
        ErrorKind::Conflict => CONFLICT,
        ErrorKind::Admission => ADMISSION_REFUSED,
        ErrorKind::Unauthorized => UNAUTHORIZED,
        ErrorKind::Storage | ErrorKind::External => {
            warn!(error = %e, "RPC: internal failure");
            INTERNAL_ERROR
        }
    };
    rpc_err(code, e.to_string())
}

fn participant(s: &str) -> Result<ParticipantId, ErrorObject<'static>> {
    ParticipantId::from_b58(s).map_err(forge_err)
}

fn amount(field: &str, s: &str) -> Result<Amount, ErrorObject<'static>> {
    s.parse::<Amount>()
        .map_err(|e| rpc_err(INVALID_PARAMS, format!("invalid {field} amount {s:?}: {e}")))
}

/// Current Unix time in seconds.
pub fn wall_clock() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub engine: Arc<RwLock<ForgeEngine>>,
    /// Time source for every call. The node passes `wall_clock`.
    pub clock: fn() -> Timestamp,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    fn now(&self) -> Timestamp {
        (self.state.clock)()
    }

    /// Start the JSON-RPC server on `addr`. Returns the bound address and a
    /// handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, ServerHandle)> {
        let server = Server::builder().build(addr).await?;
        let local = server.local_addr()?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(addr = %local, "RPC server started");
        Ok((local, handle))
    }
}

#[async_trait]
impl ForgeApiServer for RpcServer {
    async fn get_quote(&self, participant_id: String) -> RpcResult<String> {
        let p = participant(&participant_id)?;
        let engine = self.state.engine.read().await;
        Ok(engine.quote(&p, self.now()).to_string())
    }

    async fn get_fee_breakdown(&self, participant_id: String) -> RpcResult<RpcFeeBreakdown> {
        let p = participant(&participant_id)?;
        let now = self.now();
        let engine = self.state.engine.read().await;
        let quote = engine.quote_breakdown(&p, now);
        Ok(RpcFeeBreakdown::new(p.to_b58(), now, &quote))
    }

    async fn project_fee(
        &self,
        forge_count: u64,
        forges_last_week: u64,
        days_since_launch: u64,
        reference_price: Option<String>,
    ) -> RpcResult<String> {
        let reference = reference_price
            .as_deref()
            .map(|s| amount("reference price", s))
            .transpose()?;
        let target = self.state.engine.read().await.state().target_price;
        let fee = project_future_fee(forge_count, forges_last_week, days_since_launch, reference, target);
        Ok(fee.to_string())
    }

    async fn submit_admission(
        &self,
        participant_id: String,
        payment_ref: String,
        offered: String,
    ) -> RpcResult<RpcAdmission> {
        let p = participant(&participant_id)?;
        let r = PaymentRef::from_hex(&payment_ref).map_err(forge_err)?;
        let offered = amount("offered", &offered)?;

        let mut engine = self.state.engine.write().await;
        let record = engine.submit(p, r, offered, self.now()).map_err(forge_err)?;
        Ok(RpcAdmission::from(&record))
    }

    async fn verify_admission(
        &self,
        caller: String,
        participant_id: String,
        admission_id: String,
        success: bool,
        reason: Option<String>,
    ) -> RpcResult<RpcAdmission> {
        let caller = participant(&caller)?;
        let p = participant(&participant_id)?;
        let id = AdmissionId::from_hex(&admission_id).map_err(forge_err)?;

        let mut engine = self.state.engine.write().await;
        let record = engine
            .verify(&caller, &p, &id, success, reason.as_deref().unwrap_or(""), self.now())
            .map_err(forge_err)?;
        Ok(RpcAdmission::from(&record))
    }

    async fn get_admission(&self, admission_id: String) -> RpcResult<Option<RpcAdmission>> {
        let id = AdmissionId::from_hex(&admission_id).map_err(forge_err)?;
        let engine = self.state.engine.read().await;
        let record = engine.admission(&id).map_err(forge_err)?;
        Ok(record.as_ref().map(RpcAdmission::from))
    }

    async fn get_participant(&self, participant_id: String) -> RpcResult<RpcParticipant> {
        let p = participant(&participant_id)?;
        let engine = self.state.engine.read().await;
        Ok(RpcParticipant::new(&engine.participant(&p), self.now()))
    }

    async fn get_velocity(&self) -> RpcResult<RpcVelocity> {
        let engine = self.state.engine.read().await;
        Ok(engine.velocity(self.now()).into())
    }

    async fn get_stats(&self) -> RpcResult<RpcStats> {
        let engine = self.state.engine.read().await;
        Ok(engine.stats(self.now()).into())
    }

    async fn get_recent_events(&self, limit: Option<usize>) -> RpcResult<Vec<RpcEvent>> {
        let engine = self.state.engine.read().await;
        let events = engine.recent_events(limit.unwrap_or(DEFAULT_EVENT_LIMIT));
        Ok(events.iter().map(RpcEvent::from).collect())
    }

    // ── Administrative ────────────────────────────────────────────────────────

    async fn set_reference_price(
        &self,
        caller: String,
        price: Option<String>,
    ) -> RpcResult<Option<String>> {
        let caller = participant(&caller)?;
        let price = price.as_deref().map(|s| amount("reference price", s)).transpose()?;
        let mut engine = self.state.engine.write().await;
        let stored = engine.set_reference_price(&caller, price).map_err(forge_err)?;
        Ok(stored.map(|p| p.to_string()))
    }

    async fn set_cutoff(&self, caller: String, time: i64, count: u64) -> RpcResult<RpcCutoff> {
        let caller = participant(&caller)?;
        let mut engine = self.state.engine.write().await;
        let cutoff = engine
            .set_cutoff(&caller, time, count, self.now())
            .map_err(forge_err)?;
        Ok(RpcCutoff { time: cutoff.time, count: cutoff.count, closed: cutoff.closed })
    }

    async fn manual_register(
        &self,
        caller: String,
        participant_id: String,
        seed_count: u64,
    ) -> RpcResult<RpcParticipant> {
        let caller = participant(&caller)?;
        let p = participant(&participant_id)?;
        let now = self.now();
        let mut engine = self.state.engine.write().await;
        engine.manual_register(&caller, &p, seed_count, now).map_err(forge_err)?;
        Ok(RpcParticipant::new(&engine.participant(&p), now))
    }

    async fn adjust_fee(
        &self,
        caller: String,
        new_fee: String,
        reason: String,
    ) -> RpcResult<RpcEvent> {
        let caller = participant(&caller)?;
        let fee = amount("fee", &new_fee)?;
        let mut engine = self.state.engine.write().await;
        let event = engine
            .adjust_fee(&caller, fee, &reason, self.now())
            .map_err(forge_err)?;
        Ok(RpcEvent::from(&event))
    }

    async fn update_treasury_balance(
        &self,
        caller: String,
        balance: String,
    ) -> RpcResult<Option<RpcEvent>> {
        let caller = participant(&caller)?;
        let balance = amount("balance", &balance)?;
        let mut engine = self.state.engine.write().await;
        let event = engine
            .update_treasury_balance(&caller, balance)
            .map_err(forge_err)?;
        Ok(event.as_ref().map(RpcEvent::from))
    }

    async fn record_velocity_trigger(
        &self,
        caller: String,
        velocity_pct: u64,
        sustained_days: u64,
    ) -> RpcResult<Option<RpcEvent>> {
        let caller = participant(&caller)?;
        let mut engine = self.state.engine.write().await;
        let event = engine
            .record_velocity_trigger(&caller, velocity_pct, sustained_days, self.now())
            .map_err(forge_err)?;
        Ok(event.as_ref().map(RpcEvent::from))
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    async fn compact(&self) -> RpcResult<RpcCompaction> {
        let mut engine = self.state.engine.write().await;
        let pass = engine.compact(self.now()).map_err(forge_err)?;
        Ok(RpcCompaction {
            previous_cursor: pass.previous_cursor,
            cursor: pass.cursor,
            expired: pass.expired(),
        })
    }

    async fn check_time_milestone(&self) -> RpcResult<Option<RpcEvent>> {
        let mut engine = self.state.engine.write().await;
        let event = engine.check_time_milestone(self.now()).map_err(forge_err)?;
        Ok(event.as_ref().map(RpcEvent::from))
    }

    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo::current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_distinct_codes() {
        assert_eq!(forge_err(ForgeError::ZeroCutoffCount).code(), INVALID_PARAMS);
        assert_eq!(forge_err(ForgeError::AlreadyVerified("x".into())).code(), CONFLICT);
        assert_eq!(
            forge_err(ForgeError::InsufficientOffer { required: 2, offered: 1 }).code(),
            ADMISSION_REFUSED
        );
        assert_eq!(
            forge_err(ForgeError::Unauthorized { caller: "c".into(), role: "oracle" }).code(),
            UNAUTHORIZED
        );
        assert_eq!(forge_err(ForgeError::Storage("disk".into())).code(), INTERNAL_ERROR);
    }

    #[test]
    fn amounts_parse_as_decimal_sats() {
        assert_eq!(amount("offered", "100000000").unwrap(), 100_000_000);
        assert_eq!(amount("offered", "-1").unwrap_err().code(), INVALID_PARAMS);
    }
}
