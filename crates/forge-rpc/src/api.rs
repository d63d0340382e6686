use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcAdmission, RpcCompaction, RpcCutoff, RpcEvent, RpcFeeBreakdown, RpcParticipant, RpcStats,
    RpcVelocity, RpcVersionInfo,
};

/// Forge JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "forge_" via `namespace = "forge"`.
/// Privileged methods take the caller's base-58 identity as their first
/// argument; the transport is expected to have authenticated it.
#[rpc(server, client, namespace = "forge")]
pub trait ForgeApi {
    /// Required fee in sats for `participant` at the current time.
    #[method(name = "getQuote")]
    async fn get_quote(&self, participant: String) -> RpcResult<String>;

    #[method(name = "getFeeBreakdown")]
    async fn get_fee_breakdown(&self, participant: String) -> RpcResult<RpcFeeBreakdown>;

    /// Stateless projection of the base fee. `reference_price` null means
    /// unknown.
    #[method(name = "projectFee")]
    async fn project_fee(
        &self,
        forge_count: u64,
        forges_last_week: u64,
        days_since_launch: u64,
        reference_price: Option<String>,
    ) -> RpcResult<String>;

    /// Submit an offer. `payment_ref` is the 32-byte hex payment reference,
    /// `offered` a sats string.
    #[method(name = "submitAdmission")]
    async fn submit_admission(
        &self,
        participant: String,
        payment_ref: String,
        offered: String,
    ) -> RpcResult<RpcAdmission>;

    /// Oracle callback. `reason` is diagnostic only.
    #[method(name = "verifyAdmission")]
    async fn verify_admission(
        &self,
        caller: String,
        participant: String,
        admission_id: String,
        success: bool,
        reason: Option<String>,
    ) -> RpcResult<RpcAdmission>;

    #[method(name = "getAdmission")]
    async fn get_admission(&self, admission_id: String) -> RpcResult<Option<RpcAdmission>>;

    #[method(name = "getParticipant")]
    async fn get_participant(&self, participant: String) -> RpcResult<RpcParticipant>;

    #[method(name = "getVelocity")]
    async fn get_velocity(&self) -> RpcResult<RpcVelocity>;

    #[method(name = "getStats")]
    async fn get_stats(&self) -> RpcResult<RpcStats>;

    /// Latest announcements, oldest first. Defaults to 50.
    #[method(name = "getRecentEvents")]
    async fn get_recent_events(&self, limit: Option<usize>) -> RpcResult<Vec<RpcEvent>>;

    // ── Administrative ────────────────────────────────────────────────────────

    #[method(name = "setReferencePrice")]
    async fn set_reference_price(
        &self,
        caller: String,
        price: Option<String>,
    ) -> RpcResult<Option<String>>;

    #[method(name = "setCutoff")]
    async fn set_cutoff(&self, caller: String, time: i64, count: u64) -> RpcResult<RpcCutoff>;

    #[method(name = "manualRegister")]
    async fn manual_register(
        &self,
        caller: String,
        participant: String,
        seed_count: u64,
    ) -> RpcResult<RpcParticipant>;

    #[method(name = "adjustFee")]
    async fn adjust_fee(&self, caller: String, new_fee: String, reason: String)
        -> RpcResult<RpcEvent>;

    #[method(name = "updateTreasuryBalance")]
    async fn update_treasury_balance(
        &self,
        caller: String,
        balance: String,
    ) -> RpcResult<Option<RpcEvent>>;

    #[method(name = "recordVelocityTrigger")]
    async fn record_velocity_trigger(
        &self,
        caller: String,
        velocity_pct: u64,
        sustained_days: u64,
    ) -> RpcResult<Option<RpcEvent>>;

    // ── Maintenance ───────────────────────────────────────────────────────────

    #[method(name = "compact")]
    async fn compact(&self) -> RpcResult<RpcCompaction>;

    #[method(name = "checkTimeMilestone")]
    async fn check_time_milestone(&self) -> RpcResult<Option<RpcEvent>>;

    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;
}
