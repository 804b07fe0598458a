//! Domain entities produced by the record decoder
//!
//! Every entity here is rebuilt from scratch on each refresh pass; nothing
//! is patched in place after decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Address;

/// Placeholder status column for purchased algorithms.
pub const ALGORITHM_STATUS_PLACEHOLDER: &str = "--";

/// Purchased marketplace artifact, derived from one NFT ownership record
/// plus one content-address fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    pub title: String,
    /// Price formatted as a decimal display string (e.g. "1.5").
    pub price_eth: String,
    /// Currently always [`ALGORITHM_STATUS_PLACEHOLDER`].
    pub status: String,
}

/// Provenance of a DAO's metadata content-address.
///
/// The two variants are mutually exclusive by construction, which is what
/// makes [`Dao::has_cluster`] and [`Dao::has_dao_logic`] exact complements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaoKind {
    /// Governed by a logic contract; the metadata address comes from a
    /// token-URI lookup on the membership token.
    Logic { token_id: u64 },
    /// Backed by a compute cluster; the metadata address is embedded
    /// directly in the ledger record.
    Cluster { content_hash: String },
}

/// A membership group the session account has joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dao {
    pub dao_name: String,
    /// Member accounts in ledger order.
    pub members: Vec<Address>,
    pub marketplace_dao_id: u64,
    pub kind: DaoKind,
    /// Remaining fields of the DAO's content document, carried verbatim.
    pub metadata: Map<String, Value>,
}

impl Dao {
    pub fn has_dao_logic(&self) -> bool {
        matches!(self.kind, DaoKind::Logic { .. })
    }

    pub fn has_cluster(&self) -> bool {
        !self.has_dao_logic()
    }

    pub fn is_member(&self, account: &Address) -> bool {
        self.members.contains(account)
    }
}

/// A device owned by the session account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// 1-based position in this pass's enumeration. Session-local only;
    /// not stable across refreshes.
    pub id: u32,
    pub name: String,
    /// Device endpoint with the transport-scheme prefix stripped.
    pub ip_address: String,
    pub account: Address,
    /// Name of the DAO this device is bound to, assigned by the
    /// membership resolver. `None` until resolution runs.
    pub dao: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dao_with_kind(kind: DaoKind) -> Dao {
        Dao {
            dao_name: "Alpha".to_string(),
            members: vec![Address::from("0xaa")],
            marketplace_dao_id: 10,
            kind,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_logic_dao_flags_are_complements() {
        let dao = dao_with_kind(DaoKind::Logic { token_id: 42 });
        assert!(dao.has_dao_logic());
        assert!(!dao.has_cluster());
        assert_eq!(dao.has_cluster(), !dao.has_dao_logic());
    }

    #[test]
    fn test_cluster_dao_flags_are_complements() {
        let dao = dao_with_kind(DaoKind::Cluster {
            content_hash: "Qmabc".to_string(),
        });
        assert!(dao.has_cluster());
        assert!(!dao.has_dao_logic());
        assert_eq!(dao.has_cluster(), !dao.has_dao_logic());
    }

    #[test]
    fn test_membership_is_exact_match() {
        let dao = dao_with_kind(DaoKind::Cluster {
            content_hash: "Qmabc".to_string(),
        });
        assert!(dao.is_member(&Address::from("0xaa")));
        // No case folding: addresses compare byte-exactly.
        assert!(!dao.is_member(&Address::from("0xAA")));
    }
}
