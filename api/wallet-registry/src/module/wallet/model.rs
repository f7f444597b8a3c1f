use serde::{Deserialize, Serialize};

/// Persisted metadata about a blockchain address, distinct from the
/// address's on-chain state. `address` is stored lowercase and is the
/// store key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub address: String,
    pub label: String,
    pub has_licenses: bool,
    pub verified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
