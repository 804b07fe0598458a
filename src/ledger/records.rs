//! Typed views over raw positional ledger records
//!
//! Marketplace read calls return each record as a positional array of
//! fields. The index meanings are fixed by the contract and documented
//! here once, so the rest of the crate only ever sees named fields:
//!
//! - NFT / device records: `[1]` token id, `[4]` price in the ledger's
//!   smallest unit, `[5]` content address of the display metadata.
//! - DAO records: `[1]` membership token id (0 means no logic contract),
//!   `[2]` embedded metadata content address, `[4]` marketplace DAO id
//!   (also the reference passed to the member-list read), `[5]` cluster
//!   token id.

use serde_json::Value;

use crate::types::{Result, WharfError};

const FIELD_TOKEN_ID: usize = 1;
const FIELD_PRICE: usize = 4;
const FIELD_META_HASH: usize = 5;

const FIELD_DAO_CONTENT_HASH: usize = 2;
const FIELD_DAO_ID: usize = 4;
const FIELD_CLUSTER_TOKEN_ID: usize = 5;

/// One NFT ownership record from `getMyNfts`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAlgorithmRecord {
    pub token_id: u64,
    /// Price in the ledger's smallest unit, kept as a digit string since
    /// it can exceed u64.
    pub price_wei: String,
    pub meta_hash: String,
}

impl RawAlgorithmRecord {
    pub fn from_fields(fields: &[Value]) -> Result<Self> {
        Ok(Self {
            token_id: u64_field(fields, FIELD_TOKEN_ID)?,
            price_wei: amount_field(fields, FIELD_PRICE)?,
            meta_hash: string_field(fields, FIELD_META_HASH)?,
        })
    }
}

/// One joined-DAO record from `getJoinedDaos`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDaoRecord {
    /// Membership token id; 0 means the DAO has no logic contract and is
    /// cluster-backed instead.
    pub token_id: u64,
    /// Metadata content address embedded in the record. Only meaningful
    /// for cluster DAOs; logic DAOs resolve theirs via the token URI.
    pub content_hash: String,
    pub marketplace_dao_id: u64,
    pub cluster_token_id: u64,
}

impl RawDaoRecord {
    pub fn from_fields(fields: &[Value]) -> Result<Self> {
        Ok(Self {
            token_id: u64_field(fields, FIELD_TOKEN_ID)?,
            content_hash: string_field(fields, FIELD_DAO_CONTENT_HASH)?,
            marketplace_dao_id: u64_field(fields, FIELD_DAO_ID)?,
            cluster_token_id: u64_field(fields, FIELD_CLUSTER_TOKEN_ID)?,
        })
    }

    pub fn has_dao_logic(&self) -> bool {
        self.token_id != 0
    }
}

/// One owned-device record from `getMyDevices`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDeviceRecord {
    pub token_id: u64,
    pub price_wei: String,
    pub meta_hash: String,
}

impl RawDeviceRecord {
    pub fn from_fields(fields: &[Value]) -> Result<Self> {
        Ok(Self {
            token_id: u64_field(fields, FIELD_TOKEN_ID)?,
            price_wei: amount_field(fields, FIELD_PRICE)?,
            meta_hash: string_field(fields, FIELD_META_HASH)?,
        })
    }
}

fn field<'a>(fields: &'a [Value], index: usize) -> Result<&'a Value> {
    fields.get(index).ok_or_else(|| {
        WharfError::MalformedRecord(format!(
            "missing field {index} (record has {} fields)",
            fields.len()
        ))
    })
}

fn u64_field(fields: &[Value], index: usize) -> Result<u64> {
    match field(fields, index)? {
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            WharfError::MalformedRecord(format!("field {index} is not an unsigned integer: {n}"))
        }),
        Value::String(s) => s.parse().map_err(|_| {
            WharfError::MalformedRecord(format!("field {index} is not an unsigned integer: {s:?}"))
        }),
        other => Err(WharfError::MalformedRecord(format!(
            "field {index} has unexpected type: {other}"
        ))),
    }
}

fn string_field(fields: &[Value], index: usize) -> Result<String> {
    field(fields, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| WharfError::MalformedRecord(format!("field {index} is not a string")))
}

/// Amounts can exceed u64, so the wire carries them as either numbers or
/// decimal strings; both are normalized to a digit string.
fn amount_field(fields: &[Value], index: usize) -> Result<String> {
    match field(fields, index)? {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(WharfError::MalformedRecord(format!(
            "field {index} is not an amount: {other}"
        ))),
    }
}
