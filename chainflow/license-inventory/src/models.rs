use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Available,
    Delegated,
    Expired,
}

/// A license token as materialised from the ownership enumeration. The
/// expiry date is client-synthesized, not read from chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseToken {
    pub token_id: String,
    pub status: LicenseStatus,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchProgress {
    /// Indices scanned so far, including dropped ones.
    pub scanned: u64,
    pub total: u64,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub owner_address: String,
    pub total: u64,
    pub loaded: u64,
    pub dropped: u64,
    pub from_cache: bool,
    pub licenses: Vec<LicenseToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchLicensesRequest {
    #[serde(alias = "ownerAddress")]
    pub owner_address: String,
    #[serde(default, alias = "batchSize")]
    pub batch_size: Option<usize>,
    /// When present the binary runs against an in-memory fixture source
    /// instead of the chain.
    #[serde(default, alias = "fixtureTokens")]
    pub fixture_tokens: Option<Vec<String>>,
    #[serde(default, alias = "fixtureMissingIndices")]
    pub fixture_missing_indices: Option<Vec<u64>>,
}
