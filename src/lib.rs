//! Wharf - state-reconciliation engine for a device marketplace
//!
//! Translates three asynchronous, eventually-consistent sources (typed
//! marketplace ledger reads, content-address document fetches, and live
//! ledger event subscriptions) into one consistent in-memory snapshot of
//! purchased algorithms, DAOs, devices, and their membership graph. The
//! snapshot is rebuilt in full on every watched event; consumers observe
//! it through a watch channel and never see a partial state.
//!
//! ## Components
//!
//! - **Content fetcher**: resolves content addresses via the storage gateway
//! - **Ledger reader**: typed read calls against the marketplace contract
//! - **Record decoder**: raw records + documents -> typed entities
//! - **Membership resolver**: binds each device to at most one DAO
//! - **Graph builder**: deterministic node/edge seed for the layout renderer
//! - **Event bridge**: four watched topics driving full re-derivation

pub mod config;
pub mod content;
pub mod decode;
pub mod engine;
pub mod graph;
pub mod ledger;
pub mod membership;
pub mod model;
pub mod session;
pub mod types;

pub use config::Args;
pub use content::{ContentFetch, IpfsGateway};
pub use engine::{Engine, RefreshHandle, Snapshot};
pub use graph::{Graph, GraphLink, GraphNode, NodeKind};
pub use ledger::{
    spawn_event_feed, EventBridge, EventHub, EventTopic, LedgerEvent, LedgerReader, LedgerRpc,
};
pub use model::{Algorithm, Dao, DaoKind, Device};
pub use session::SessionContext;
pub use types::{Address, Result, WharfError};
