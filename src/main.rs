//! Wharf - state-reconciliation engine for a device marketplace

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wharf::{
    config::Args,
    content::IpfsGateway,
    engine::Engine,
    ledger::{spawn_event_feed, EventBridge, EventHub, LedgerRpc},
    session::SessionContext,
    types::Address,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wharf={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wharf - marketplace reconciliation");
    info!("======================================");
    info!("Account: {}", args.account);
    info!("Gateway: {}", args.gateway_url);
    info!("Ledger RPC: {}", args.rpc_url);
    info!("Ledger events: {}", args.ws_url);
    info!("======================================");

    let timeout = Duration::from_secs(args.request_timeout_secs);
    let account = Address::from(args.account.as_str());

    // Session context: created on connect, passed into every read.
    let ctx = Arc::new(SessionContext::new(
        account.clone(),
        Arc::new(LedgerRpc::new(&args.rpc_url, timeout)),
        Arc::new(IpfsGateway::new(&args.gateway_url, timeout)),
    ));

    let (engine, refresh, mut snapshots) = Engine::new(Arc::clone(&ctx));

    // Event bridge: the four watched topics all bump the same refresh
    // generation the engine runs on.
    let hub = Arc::new(EventHub::new());
    let _feed = spawn_event_feed(args.ws_url.clone(), Arc::clone(&hub));
    let mut bridge = EventBridge::new(Arc::clone(&hub), account);
    bridge.subscribe(&refresh)?;

    // Log each published snapshot; a rendering layer would watch the same
    // receiver.
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow().clone();
            info!(
                generation = snapshot.generation,
                algorithms = snapshot.algorithms.len(),
                daos = snapshot.daos.len(),
                devices = snapshot.devices.len(),
                available = snapshot.available_devices().len(),
                links = snapshot.graph.links.len(),
                "Snapshot updated"
            );
        }
    });

    engine.run().await;
    bridge.teardown();
    Ok(())
}
