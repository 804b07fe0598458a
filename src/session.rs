//! Session context
//!
//! Explicit session object passed by reference into every ledger read and
//! content fetch. Created when a wallet connects, dropped on disconnect;
//! nothing about the session lives in globals.

use std::sync::Arc;

use crate::content::ContentFetch;
use crate::ledger::LedgerReader;
use crate::types::Address;

/// Everything a refresh pass needs: the account the session is scoped to
/// and the clients for the two external sources.
pub struct SessionContext {
    pub account: Address,
    pub ledger: Arc<dyn LedgerReader>,
    pub fetcher: Arc<dyn ContentFetch>,
}

impl SessionContext {
    pub fn new(
        account: Address,
        ledger: Arc<dyn LedgerReader>,
        fetcher: Arc<dyn ContentFetch>,
    ) -> Self {
        Self {
            account,
            ledger,
            fetcher,
        }
    }
}
