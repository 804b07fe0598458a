//! Reconciliation engine integration tests
//!
//! Exercises full refresh passes against in-memory ledger and gateway
//! doubles: decoding of both DAO variants, per-record fault isolation,
//! collection-level failure keeping the prior collection, membership
//! resolution after the DAO barrier, and supersession of stale passes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wharf::content::ContentFetch;
use wharf::engine::Engine;
use wharf::ledger::records::{RawAlgorithmRecord, RawDaoRecord, RawDeviceRecord};
use wharf::ledger::LedgerReader;
use wharf::session::SessionContext;
use wharf::types::{Address, Result, WharfError};

// =============================================================================
// In-memory doubles
// =============================================================================

#[derive(Default)]
struct MockLedger {
    nfts: Vec<Vec<Value>>,
    daos: Vec<Vec<Value>>,
    devices: Vec<Vec<Value>>,
    members: HashMap<u64, Vec<Address>>,
    token_uris: HashMap<u64, String>,
    fail_nfts: AtomicBool,
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn get_my_nfts(&self, _account: &Address) -> Result<Vec<RawAlgorithmRecord>> {
        if self.fail_nfts.load(Ordering::SeqCst) {
            return Err(WharfError::Rpc("mock ledger outage".to_string()));
        }
        self.nfts
            .iter()
            .map(|fields| RawAlgorithmRecord::from_fields(fields))
            .collect()
    }

    async fn get_joined_daos(&self, _account: &Address) -> Result<Vec<RawDaoRecord>> {
        self.daos
            .iter()
            .map(|fields| RawDaoRecord::from_fields(fields))
            .collect()
    }

    async fn get_dao_members(&self, dao_ref: u64) -> Result<Vec<Address>> {
        Ok(self.members.get(&dao_ref).cloned().unwrap_or_default())
    }

    async fn get_my_devices(&self, _account: &Address) -> Result<Vec<RawDeviceRecord>> {
        self.devices
            .iter()
            .map(|fields| RawDeviceRecord::from_fields(fields))
            .collect()
    }

    async fn token_uri(&self, token_id: u64) -> Result<String> {
        self.token_uris
            .get(&token_id)
            .cloned()
            .ok_or_else(|| WharfError::Rpc(format!("no token URI for {token_id}")))
    }
}

struct MockGateway {
    docs: HashMap<String, String>,
}

#[async_trait]
impl ContentFetch for MockGateway {
    async fn fetch(&self, hash: &str) -> Result<String> {
        self.docs
            .get(hash)
            .cloned()
            .ok_or_else(|| WharfError::Gateway {
                status: 404,
                message: format!("no document for {hash}"),
            })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn account() -> Address {
    Address::from("0xsession")
}

/// NFT/device record layout: [_, token_id, _, _, price, meta_hash].
fn nft_record(token_id: u64, price_wei: &str, meta_hash: &str) -> Vec<Value> {
    vec![
        json!(0),
        json!(token_id),
        json!(""),
        json!(0),
        json!(price_wei),
        json!(meta_hash),
    ]
}

/// DAO record layout: [_, token_id, content_hash, _, dao_id, cluster_token_id].
fn dao_record(token_id: u64, content_hash: &str, dao_id: u64) -> Vec<Value> {
    vec![
        json!(0),
        json!(token_id),
        json!(content_hash),
        json!(0),
        json!(dao_id),
        json!(0),
    ]
}

/// A ledger with one purchased NFT, one cluster DAO, one logic DAO, and
/// three devices (members of Alpha, Beta, and nobody).
fn populated_fixture() -> (MockLedger, MockGateway) {
    let mut ledger = MockLedger::default();
    let mut docs = HashMap::new();

    ledger.nfts = vec![nft_record(1, "1500000000000000000", "algo-meta")];
    docs.insert("algo-meta".to_string(), json!({"title": "Detector"}).to_string());

    // Alpha: cluster-backed, hash embedded in the record.
    ledger.daos.push(dao_record(0, "dao-alpha", 10));
    ledger.members.insert(10, vec![Address::from("0xd1")]);
    docs.insert(
        "dao-alpha".to_string(),
        json!({"dao_name": "Alpha", "description": "edge cluster"}).to_string(),
    );

    // Beta: logic-contract-backed, hash behind the token URI.
    ledger.daos.push(dao_record(42, "", 11));
    ledger.token_uris.insert(42, "dao-beta".to_string());
    ledger.members.insert(11, vec![Address::from("0xd2")]);
    docs.insert("dao-beta".to_string(), json!({"dao_name": "Beta"}).to_string());

    for (n, owner) in [(1u64, "0xd1"), (2, "0xd2"), (3, "0xd3")] {
        let token_id = 100 + n;
        ledger.devices.push(nft_record(token_id, "0", &format!("dev{n}-meta")));
        ledger
            .token_uris
            .insert(token_id, format!("dev{n}-content"));
        docs.insert(
            format!("dev{n}-content"),
            json!({"account": owner, "device_endpoint": format!("http://10.0.0.{n}")}).to_string(),
        );
        docs.insert(
            format!("dev{n}-meta"),
            json!({"title": format!("Sensor {n}")}).to_string(),
        );
    }

    (ledger, MockGateway { docs })
}

fn session(ledger: MockLedger, gateway: MockGateway) -> Arc<SessionContext> {
    Arc::new(SessionContext::new(
        account(),
        Arc::new(ledger),
        Arc::new(gateway),
    ))
}

// =============================================================================
// Full pass
// =============================================================================

#[tokio::test]
async fn test_full_pass_publishes_consistent_snapshot() {
    let (ledger, gateway) = populated_fixture();
    let (mut engine, _refresh, snapshots) = Engine::new(session(ledger, gateway));

    engine.refresh_pass(0).await;
    let snapshot = snapshots.borrow().clone();

    assert_eq!(snapshot.algorithms.len(), 1);
    assert_eq!(snapshot.algorithms[0].title, "Detector");
    assert_eq!(snapshot.algorithms[0].price_eth, "1.5");
    assert_eq!(snapshot.algorithms[0].status, "--");

    assert_eq!(snapshot.daos.len(), 2);
    assert_eq!(snapshot.daos[0].dao_name, "Alpha");
    assert!(snapshot.daos[0].has_cluster());
    assert!(!snapshot.daos[0].has_dao_logic());
    assert_eq!(
        snapshot.daos[0].metadata.get("description"),
        Some(&json!("edge cluster"))
    );
    assert_eq!(snapshot.daos[1].dao_name, "Beta");
    assert!(snapshot.daos[1].has_dao_logic());
    assert!(!snapshot.daos[1].has_cluster());

    // Devices carry stripped endpoints, 1-based ids, and resolved DAOs.
    assert_eq!(snapshot.devices.len(), 3);
    assert_eq!(snapshot.devices[0].id, 1);
    assert_eq!(snapshot.devices[0].ip_address, "10.0.0.1");
    assert_eq!(snapshot.devices[0].name, "Sensor 1");
    assert_eq!(snapshot.devices[0].dao.as_deref(), Some("Alpha"));
    assert_eq!(snapshot.devices[1].dao.as_deref(), Some("Beta"));
    assert_eq!(snapshot.devices[2].dao, None);

    // One node per DAO and device, one link per bound device.
    assert_eq!(snapshot.graph.nodes.len(), 5);
    assert_eq!(snapshot.graph.links.len(), 2);
    assert_eq!(snapshot.graph.links[0].source, "10.0.0.1");
    assert_eq!(snapshot.graph.links[0].target, "Alpha");

    // Selector views over the published snapshot.
    assert_eq!(snapshot.available_devices().len(), 1);
    assert_eq!(snapshot.devices_in_dao("Alpha").len(), 1);
}

// =============================================================================
// Fault isolation
// =============================================================================

#[tokio::test]
async fn test_failed_record_dropped_siblings_survive() {
    let (ledger, mut gateway) = populated_fixture();
    // Device 2's content document is unreachable; its siblings must survive.
    gateway.docs.remove("dev2-content");

    let (mut engine, _refresh, snapshots) = Engine::new(session(ledger, gateway));
    engine.refresh_pass(0).await;
    let snapshot = snapshots.borrow().clone();

    assert_eq!(snapshot.devices.len(), 2);
    assert_eq!(snapshot.devices[0].ip_address, "10.0.0.1");
    assert_eq!(snapshot.devices[1].ip_address, "10.0.0.3");
    // Survivors renumber to consecutive session-local positions.
    assert_eq!(snapshot.devices[1].id, 2);

    // The other entity kinds are untouched by the device record failure.
    assert_eq!(snapshot.algorithms.len(), 1);
    assert_eq!(snapshot.daos.len(), 2);
}

#[tokio::test]
async fn test_failed_dao_record_dropped_from_pass() {
    let (ledger, mut gateway) = populated_fixture();
    gateway.docs.remove("dao-alpha");

    let (mut engine, _refresh, snapshots) = Engine::new(session(ledger, gateway));
    engine.refresh_pass(0).await;
    let snapshot = snapshots.borrow().clone();

    assert_eq!(snapshot.daos.len(), 1);
    assert_eq!(snapshot.daos[0].dao_name, "Beta");
    // Device 1's DAO no longer exists this pass, so it becomes available.
    assert_eq!(snapshot.devices[0].dao, None);
    assert_eq!(snapshot.devices[1].dao.as_deref(), Some("Beta"));
}

#[tokio::test]
async fn test_failed_collection_keeps_prior_collection() {
    let (ledger, gateway) = populated_fixture();
    let ledger = Arc::new(ledger);
    let ctx = Arc::new(SessionContext::new(
        account(),
        Arc::clone(&ledger) as Arc<dyn LedgerReader>,
        Arc::new(gateway),
    ));
    let (mut engine, refresh, snapshots) = Engine::new(ctx);

    engine.refresh_pass(0).await;
    assert_eq!(snapshots.borrow().algorithms.len(), 1);

    // The NFT read starts failing; the next pass keeps the prior
    // algorithm collection while the other kinds still refresh.
    ledger.fail_nfts.store(true, Ordering::SeqCst);

    refresh.trigger();
    engine.refresh_pass(1).await;
    let snapshot = snapshots.borrow().clone();

    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.algorithms.len(), 1);
    assert_eq!(snapshot.daos.len(), 2);
    assert_eq!(snapshot.devices.len(), 3);
}

// =============================================================================
// Supersession
// =============================================================================

#[tokio::test]
async fn test_stale_pass_result_is_discarded() {
    let (ledger, gateway) = populated_fixture();
    let (mut engine, refresh, snapshots) = Engine::new(session(ledger, gateway));

    engine.refresh_pass(0).await;
    assert_eq!(snapshots.borrow().generation, 0);

    // Two triggers arrive while a pass for generation 1 is in flight: its
    // result must not be published.
    refresh.trigger();
    refresh.trigger();
    engine.refresh_pass(1).await;
    assert_eq!(snapshots.borrow().generation, 0);

    // The pass for the latest generation publishes normally.
    engine.refresh_pass(2).await;
    assert_eq!(snapshots.borrow().generation, 2);
}

// =============================================================================
// Run loop
// =============================================================================

#[tokio::test]
async fn test_trigger_drives_run_loop() {
    let (ledger, gateway) = populated_fixture();
    let (engine, refresh, mut snapshots) = Engine::new(session(ledger, gateway));

    let handle = tokio::spawn(engine.run());

    // Initial mount pass.
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("initial pass timed out")
        .expect("engine dropped");
    assert_eq!(snapshots.borrow_and_update().devices.len(), 3);

    // An event-driven bump publishes a fresh snapshot.
    refresh.trigger();
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("event-driven pass timed out")
        .expect("engine dropped");
    assert_eq!(snapshots.borrow_and_update().generation, 1);

    handle.abort();
}
