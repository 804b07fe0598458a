//! Refresh engine
//!
//! Owns the generation token and the published snapshot. Every watched
//! ledger event, and the explicit device-updated signal raised after a
//! membership-changing action, bumps the generation; each bump drives one
//! full re-derivation of algorithms, DAOs, devices, and the graph. There
//! is no incremental patching: a pass either publishes a complete snapshot
//! or leaves the previous one untouched.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::decode::{populate_algorithms, populate_daos, populate_devices};
use crate::graph::{self, Graph};
use crate::membership;
use crate::model::{Algorithm, Dao, Device};
use crate::session::SessionContext;

/// Monotonic generation token used purely as a re-run trigger.
///
/// The value is never inspected for meaning; it only orders passes so a
/// superseded pass can discard its result. Bursts of triggers coalesce
/// into whatever generation the engine observes next.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: Arc<watch::Sender<u64>>,
}

impl RefreshHandle {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Bump the generation and wake the engine.
    pub fn trigger(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    /// Latest generation captured so far.
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }
}

/// One fully derived view of the session's marketplace state.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Generation of the pass that produced this snapshot.
    pub generation: u64,
    pub algorithms: Vec<Algorithm>,
    pub daos: Vec<Dao>,
    pub devices: Vec<Device>,
    pub graph: Graph,
}

impl Snapshot {
    /// Devices not yet bound to any DAO.
    pub fn available_devices(&self) -> Vec<&Device> {
        self.devices.iter().filter(|d| d.dao.is_none()).collect()
    }

    /// Devices bound to the named DAO.
    pub fn devices_in_dao(&self, dao_name: &str) -> Vec<&Device> {
        self.devices
            .iter()
            .filter(|d| d.dao.as_deref() == Some(dao_name))
            .collect()
    }
}

/// Reconciliation engine: re-derives the snapshot on every generation
/// bump and publishes it to watchers.
pub struct Engine {
    ctx: Arc<SessionContext>,
    refresh: RefreshHandle,
    refresh_rx: watch::Receiver<u64>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl Engine {
    /// Create the engine along with its trigger handle and the snapshot
    /// receiver consumers watch.
    pub fn new(ctx: Arc<SessionContext>) -> (Self, RefreshHandle, watch::Receiver<Snapshot>) {
        let (refresh, refresh_rx) = RefreshHandle::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let engine = Self {
            ctx,
            refresh: refresh.clone(),
            refresh_rx,
            snapshot_tx,
        };
        (engine, refresh, snapshot_rx)
    }

    /// Run the reconcile loop: an initial pass, then one pass per
    /// generation bump. Never returns an error; a failed pass leaves the
    /// previous snapshot in place and waits for the next trigger.
    pub async fn run(mut self) {
        loop {
            let generation = *self.refresh_rx.borrow_and_update();
            self.refresh_pass(generation).await;

            if self.refresh_rx.changed().await.is_err() {
                info!("All refresh handles dropped, engine stopping");
                return;
            }
        }
    }

    /// Execute one full re-derivation for the given generation.
    ///
    /// The three collection reads run concurrently; membership resolution
    /// waits until the DAO collection has fully settled. The result is
    /// published only if no newer generation was captured while the pass
    /// ran, which keeps the displayed snapshot on the last triggered pass.
    pub async fn refresh_pass(&mut self, generation: u64) {
        debug!(generation, "Refresh pass started");
        let prior = self.snapshot_tx.borrow().clone();

        let (algorithms, daos, devices) = tokio::join!(
            populate_algorithms(&self.ctx),
            populate_daos(&self.ctx),
            populate_devices(&self.ctx),
        );

        // A collection-level failure fails that entity kind only; the
        // kind keeps its previous collection for this pass.
        let algorithms = match algorithms {
            Ok(algorithms) => algorithms,
            Err(e) => {
                warn!("Algorithm refresh failed, keeping previous: {}", e);
                prior.algorithms.clone()
            }
        };
        let daos = match daos {
            Ok(daos) => daos,
            Err(e) => {
                warn!("DAO refresh failed, keeping previous: {}", e);
                prior.daos.clone()
            }
        };
        let devices = match devices {
            Ok(devices) => membership::resolve(&daos, devices),
            Err(e) => {
                warn!("Device refresh failed, keeping previous: {}", e);
                prior.devices.clone()
            }
        };

        let graph = graph::build(&daos, &devices);

        let latest = self.refresh.generation();
        if latest != generation {
            debug!(generation, latest, "Refresh pass superseded, result discarded");
            return;
        }

        info!(
            generation,
            algorithms = algorithms.len(),
            daos = daos.len(),
            devices = devices.len(),
            links = graph.links.len(),
            "Snapshot published"
        );
        self.snapshot_tx.send_replace(Snapshot {
            generation,
            algorithms,
            daos,
            devices,
            graph,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn test_refresh_handle_is_monotonic() {
        let (handle, _rx) = RefreshHandle::new();
        assert_eq!(handle.generation(), 0);
        handle.trigger();
        handle.trigger();
        assert_eq!(handle.generation(), 2);
    }

    #[test]
    fn test_snapshot_device_subsets() {
        let device = |id: u32, dao: Option<&str>| Device {
            id,
            name: format!("device-{id}"),
            ip_address: format!("10.0.0.{id}"),
            account: Address::from("0xd"),
            dao: dao.map(str::to_string),
        };

        let snapshot = Snapshot {
            devices: vec![
                device(1, Some("Alpha")),
                device(2, None),
                device(3, Some("Alpha")),
            ],
            ..Snapshot::default()
        };

        let available = snapshot.available_devices();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, 2);

        let in_alpha = snapshot.devices_in_dao("Alpha");
        assert_eq!(in_alpha.len(), 2);
        assert!(snapshot.devices_in_dao("Beta").is_empty());
    }
}
