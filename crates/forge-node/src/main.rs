//! forge-node: the forge fee & admission daemon.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Load launch parameters (or generate development defaults)
//!   3. Restore the coordinator from storage
//!   4. Start the JSON-RPC 2.0 server
//!   5. Run the maintenance loop: velocity compaction + time milestones

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use forge_core::ForgeParams;
use forge_rpc::{wall_clock, RpcServer, RpcServerState};
use forge_state::{ForgeEngine, LoggingIssuer, StateDb, StaticRoles};

const GENERATED_PARAMS_FILE: &str = "forge-params.json";

#[derive(Parser, Debug)]
#[command(
    name = "forge-node",
    version,
    about = "Forge node: admission pricing, loyalty and milestone tracking"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.forge/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Path to launch params JSON.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Seconds between maintenance passes.
    #[arg(long, default_value_t = 300)]
    maintenance_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,forge=debug")),
        )
        .init();

    let args = Args::parse();
    info!("forge node starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Arc::new(StateDb::open(data_dir.join("state")).context("opening state database")?);

    // ── Launch parameters ─────────────────────────────────────────────────────
    let params = load_or_generate_params(args.params.as_deref(), &data_dir)?;
    let access = Arc::new(StaticRoles::from_params(&params).context("loading role identities")?);
    if params.oracles.is_empty() {
        warn!("no oracle identities configured; verifications will be refused");
    }

    // ── Coordinator ───────────────────────────────────────────────────────────
    let engine = ForgeEngine::open(Arc::clone(&db), &params, access, Arc::new(LoggingIssuer))
        .context("opening forge state")?;
    let engine = Arc::new(RwLock::new(engine));

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState { engine: Arc::clone(&engine), clock: wall_clock });
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Maintenance loop ──────────────────────────────────────────────────────
    let mut ticker = tokio::time::interval(Duration::from_secs(args.maintenance_interval_secs.max(1)));
    info!(%rpc_addr, "node ready");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = wall_clock();
                let mut engine = engine.write().await;
                match engine.compact(now) {
                    Ok(pass) => debug!(expired = pass.expired(), cursor = pass.cursor, "maintenance compaction"),
                    Err(e) => warn!(error = %e, "velocity compaction failed"),
                }
                match engine.check_time_milestone(now) {
                    Ok(Some(event)) => info!(event = event.name(), "milestone announced"),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "time milestone check failed"),
                }
                if let Err(e) = engine.flush() {
                    warn!(error = %e, "flush failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    let _ = rpc_handle.stop();
    engine.read().await.flush().context("flushing state on shutdown")?;
    Ok(())
}

/// Load launch parameters from a JSON file, or fall back to development
/// defaults anchored at the current time.
///
/// # Warning
/// Generated parameters carry no oracle or admin identities. They are written
/// next to the database so restarts keep the same launch time. Only use this
/// for local development and testing.
fn load_or_generate_params(path: Option<&Path>, data_dir: &Path) -> anyhow::Result<ForgeParams> {
    let generated = data_dir.join(GENERATED_PARAMS_FILE);
    let source = match path {
        Some(p) => Some(p.to_path_buf()),
        None if generated.exists() => Some(generated.clone()),
        None => None,
    };
    if let Some(p) = source {
        let json = std::fs::read_to_string(&p)
            .with_context(|| format!("reading launch params from {}", p.display()))?;
        return ForgeParams::from_json(&json)
            .with_context(|| format!("parsing launch params from {}", p.display()));
    }

    warn!("No --params provided. Generating development launch params. DO NOT USE IN PRODUCTION.");
    let params = ForgeParams::development(wall_clock());
    let json = serde_json::to_string_pretty(&params).context("encoding launch params")?;
    std::fs::write(&generated, json)
        .with_context(|| format!("writing launch params to {}", generated.display()))?;
    Ok(params)
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
