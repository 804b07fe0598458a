//! Read-only marketplace ledger surface
//!
//! Five typed read calls plus the four event topics that drive refresh.
//! Reads are eventually consistent with the latest confirmed ledger state
//! at call time; there is no atomicity across calls. A DAO list that is
//! momentarily stale relative to the device list is resolved again by the
//! next refresh pass.

pub mod events;
pub mod records;
pub mod rpc;

pub use events::{spawn_event_feed, EventBridge, EventHub, EventTopic, HandlerId, LedgerEvent};
pub use records::{RawAlgorithmRecord, RawDaoRecord, RawDeviceRecord};
pub use rpc::LedgerRpc;

use async_trait::async_trait;

use crate::types::{Address, Result};

/// Read operations against the marketplace ledger contract, scoped to the
/// session account.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// NFT ownership records for purchased algorithms.
    async fn get_my_nfts(&self, account: &Address) -> Result<Vec<RawAlgorithmRecord>>;

    /// Records of every DAO the account has joined, in ledger order.
    async fn get_joined_daos(&self, account: &Address) -> Result<Vec<RawDaoRecord>>;

    /// Member list for a DAO, referenced by its marketplace DAO id.
    async fn get_dao_members(&self, dao_ref: u64) -> Result<Vec<Address>>;

    /// Records of every device the account owns.
    async fn get_my_devices(&self, account: &Address) -> Result<Vec<RawDeviceRecord>>;

    /// Content address behind a membership or device token.
    async fn token_uri(&self, token_id: u64) -> Result<String>;
}
