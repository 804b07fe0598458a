//! JSON-RPC implementation of the ledger reader
//!
//! Each marketplace read method is one JSON-RPC 2.0 call over HTTP. The
//! wire returns records as positional arrays; conversion to named fields
//! happens immediately at this boundary via [`records`](super::records).

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::ledger::records::{RawAlgorithmRecord, RawDaoRecord, RawDeviceRecord};
use crate::ledger::LedgerReader;
use crate::types::{Address, Result, WharfError};

/// JSON-RPC 2.0 client for marketplace read methods.
pub struct LedgerRpc {
    endpoint: String,
    client: Client,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl LedgerRpc {
    /// Create a new read client against the ledger RPC endpoint.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: endpoint.into(),
            client,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WharfError::Rpc(format!(
                "{method} returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response.json().await?;
        if let Some(err) = parsed.error {
            return Err(WharfError::Rpc(format!(
                "{method} failed: {} (code {})",
                err.message, err.code
            )));
        }

        parsed
            .result
            .ok_or_else(|| WharfError::Rpc(format!("{method} returned no result")))
    }

    /// Fetch a collection of positional records for an account-scoped read.
    async fn call_records(&self, method: &str, account: &Address) -> Result<Vec<Vec<Value>>> {
        let result = self.call(method, json!([account])).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl LedgerReader for LedgerRpc {
    async fn get_my_nfts(&self, account: &Address) -> Result<Vec<RawAlgorithmRecord>> {
        self.call_records("marketplace_getMyNfts", account)
            .await?
            .iter()
            .map(|fields| RawAlgorithmRecord::from_fields(fields))
            .collect()
    }

    async fn get_joined_daos(&self, account: &Address) -> Result<Vec<RawDaoRecord>> {
        self.call_records("marketplace_getJoinedDaos", account)
            .await?
            .iter()
            .map(|fields| RawDaoRecord::from_fields(fields))
            .collect()
    }

    async fn get_dao_members(&self, dao_ref: u64) -> Result<Vec<Address>> {
        let result = self
            .call("marketplace_getDaoMembers", json!([dao_ref]))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn get_my_devices(&self, account: &Address) -> Result<Vec<RawDeviceRecord>> {
        self.call_records("marketplace_getMyDevices", account)
            .await?
            .iter()
            .map(|fields| RawDeviceRecord::from_fields(fields))
            .collect()
    }

    async fn token_uri(&self, token_id: u64) -> Result<String> {
        let result = self.call("marketplace_tokenURI", json!([token_id])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WharfError::Rpc("tokenURI returned a non-string result".to_string()))
    }
}
