//! JSON-RPC round trips against an in-process server.
//!
//! Run with:
//!   cargo test -p forge-rpc --test rpc

use std::net::SocketAddr;
use std::sync::Arc;

use forge_core::constants::{BAND_1_CAP_SATS, FLOOR_FEE_SATS, SECS_PER_DAY};
use forge_core::{ForgeParams, ParticipantId, PaymentRef, Timestamp};
use forge_rpc::server::{ADMISSION_REFUSED, CONFLICT, INVALID_PARAMS, UNAUTHORIZED};
use forge_rpc::{ForgeApiClient, RpcServer, RpcServerState};
use forge_state::{ForgeEngine, RecordingIssuer, StateDb, StaticRoles};
use jsonrpsee::core::client::Error as ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::server::ServerHandle;
use tokio::sync::RwLock;

const LAUNCH: Timestamp = 1_800_000_000;
const ORACLE: ParticipantId = ParticipantId([0xAA; 32]);
const ADMIN: ParticipantId = ParticipantId([0xBB; 32]);

fn fixed_now() -> Timestamp {
    LAUNCH + 45 * SECS_PER_DAY
}

// ── Harness ───────────────────────────────────────────────────────────────────

struct Node {
    client: HttpClient,
    rewards: Arc<RecordingIssuer>,
    handle: ServerHandle,
}

impl Drop for Node {
    fn drop(&mut self) {
        let _ = self.handle.stop();
    }
}

async fn start(name: &str) -> Node {
    let dir = std::env::temp_dir().join(format!("forge_rpc_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    let db = Arc::new(StateDb::open(&dir).expect("open temp db"));

    let mut params = ForgeParams::development(LAUNCH);
    params.oracles.push(ORACLE.to_b58());
    params.admins.push(ADMIN.to_b58());
    let access = Arc::new(StaticRoles::from_params(&params).expect("roles"));
    let rewards = Arc::new(RecordingIssuer::new());
    let engine = ForgeEngine::open(db, &params, access, rewards.clone()).expect("open engine");

    let state = Arc::new(RpcServerState {
        engine: Arc::new(RwLock::new(engine)),
        clock: fixed_now,
    });
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let (local, handle) = RpcServer::new(state).start(addr).await.expect("start rpc");
    let client = HttpClientBuilder::default()
        .build(format!("http://{local}"))
        .expect("build client");
    Node { client, rewards, handle }
}

fn error_code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("expected call error, got {other:?}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admission_round_trip() {
    let node = start("round_trip").await;
    let p = ParticipantId([1; 32]).to_b58();
    let r = PaymentRef([2; 32]).to_hex();

    let quote = node.client.get_quote(p.clone()).await.unwrap();
    // 45 days in: one age step.
    assert_eq!(quote, (FLOOR_FEE_SATS * 101 / 100).to_string());

    let submitted = node
        .client
        .submit_admission(p.clone(), r.clone(), quote.clone())
        .await
        .unwrap();
    assert_eq!(submitted.status, "submitted");
    assert_eq!(submitted.quoted_sats, quote);

    let verified = node
        .client
        .verify_admission(ORACLE.to_b58(), p.clone(), submitted.admission_id.clone(), true, None)
        .await
        .unwrap();
    assert_eq!(verified.status, "verified");
    assert_eq!(verified.verified_at, Some(fixed_now()));
    assert_eq!(node.rewards.issued().len(), 1);

    let fetched = node.client.get_admission(submitted.admission_id).await.unwrap();
    assert_eq!(fetched, Some(verified));

    let participant = node.client.get_participant(p.clone()).await.unwrap();
    assert!(participant.is_early_adopter);
    assert_eq!(participant.discount_pct, 25);
    assert_eq!(participant.admissions_today, 1);

    let stats = node.client.get_stats().await.unwrap();
    assert_eq!(stats.total_admissions, 1);
    assert_eq!(stats.total_fees_sats, quote);
    assert_eq!(stats.success_rate_bps, 10_000);

    let velocity = node.client.get_velocity().await.unwrap();
    assert_eq!((velocity.length, velocity.forges_last_week), (1, 1));

    let kinds: Vec<String> = node
        .client
        .get_recent_events(None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec!["admission_submitted", "admission_verified", "early_adopter_registered"]
    );
}

#[tokio::test]
async fn errors_carry_their_kind() {
    let node = start("errors").await;
    let p = ParticipantId([1; 32]).to_b58();
    let r = PaymentRef([2; 32]).to_hex();

    let err = node.client.get_quote("not-base58-0OIl".into()).await.unwrap_err();
    assert_eq!(error_code(err), INVALID_PARAMS);

    let err = node
        .client
        .submit_admission(p.clone(), r.clone(), "1".into())
        .await
        .unwrap_err();
    assert_eq!(error_code(err), ADMISSION_REFUSED);

    let quote = node.client.get_quote(p.clone()).await.unwrap();
    let rec = node.client.submit_admission(p.clone(), r.clone(), quote.clone()).await.unwrap();
    let err = node
        .client
        .submit_admission(p.clone(), r.clone(), quote)
        .await
        .unwrap_err();
    assert_eq!(error_code(err), CONFLICT);

    let err = node
        .client
        .verify_admission(ADMIN.to_b58(), p, rec.admission_id, true, None)
        .await
        .unwrap_err();
    assert_eq!(error_code(err), UNAUTHORIZED);
}

#[tokio::test]
async fn administrative_surface() {
    let node = start("admin").await;
    let admin = ADMIN.to_b58();

    let cutoff = node
        .client
        .set_cutoff(admin.clone(), fixed_now() + 10 * SECS_PER_DAY, 500)
        .await
        .unwrap();
    assert_eq!((cutoff.count, cutoff.closed), (500, false));

    let err = node.client.set_cutoff(admin.clone(), fixed_now(), 500).await.unwrap_err();
    assert_eq!(error_code(err), INVALID_PARAMS);

    let event = node
        .client
        .adjust_fee(admin.clone(), "300000000".into(), "manual review".into())
        .await
        .unwrap();
    assert_eq!(event.kind, "fee_adjusted");
    assert_eq!(event.amount_sats.as_deref(), Some("300000000"));
    let stats = node.client.get_stats().await.unwrap();
    assert_eq!(stats.fee_override_sats.as_deref(), Some("300000000"));

    let backfilled = node
        .client
        .manual_register(admin.clone(), ParticipantId([5; 32]).to_b58(), 12)
        .await
        .unwrap();
    assert_eq!((backfilled.admission_count, backfilled.discount_pct), (12, 10));

    assert!(node
        .client
        .record_velocity_trigger(admin.clone(), 100, 10)
        .await
        .unwrap()
        .is_none());
    assert!(node
        .client
        .update_treasury_balance(admin.clone(), (100 * FLOOR_FEE_SATS).to_string())
        .await
        .unwrap()
        .is_some());

    // Reference price at half the target doubles layers 1-3, then the band cap bites.
    let target = ForgeParams::development(LAUNCH).target_reference_price;
    node.client
        .set_reference_price(ORACLE.to_b58(), Some((target / 2).to_string()))
        .await
        .unwrap();
    let breakdown = node
        .client
        .get_fee_breakdown(ParticipantId([9; 32]).to_b58())
        .await
        .unwrap();
    assert_eq!(breakdown.price_pct, 200);
    assert_eq!(breakdown.combined_sats, (FLOOR_FEE_SATS * 101 / 100 * 2).to_string());
    assert_eq!(breakdown.base_fee_sats, BAND_1_CAP_SATS.to_string());
}

#[tokio::test]
async fn maintenance_and_projection() {
    let node = start("maintenance").await;

    // 45 days after launch: the first monthly milestone is due exactly once.
    let first = node.client.check_time_milestone().await.unwrap().unwrap();
    assert_eq!(first.milestone.as_deref(), Some("1"));
    assert!(node.client.check_time_milestone().await.unwrap().is_none());

    let pass = node.client.compact().await.unwrap();
    assert_eq!(pass.expired, 0);

    let projected = node.client.project_fee(2_016, 600, 60, None).await.unwrap();
    assert_eq!(projected, "116688000");

    let version = node.client.get_version().await.unwrap();
    assert_eq!(version.floor_fee_sats, FLOOR_FEE_SATS.to_string());
    assert_eq!(version.era_length, 2_016);
}
