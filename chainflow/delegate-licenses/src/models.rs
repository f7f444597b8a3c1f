use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStrategy {
    Aggregated,
    Sequential,
}

/// Outcome for one token in one delegation run. `hash` is shared across
/// tokens in the aggregated path and per-token in the sequential path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationResult {
    pub token_id: String,
    pub success: bool,
    pub hash: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DelegationProgress {
    pub completed: u64,
    pub total: u64,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationOutcome {
    pub delegatee: String,
    pub strategy: DelegationStrategy,
    pub results: Vec<DelegationResult>,
    pub succeeded: u64,
    pub failed: u64,
}

/// Fixture block for the offline binary mode and tests; mirrors the
/// failure modes the chain backend can produce.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationFixture {
    #[serde(default, alias = "alreadyDelegated")]
    pub already_delegated: Vec<String>,
    #[serde(default = "default_true", alias = "aggregateSupported")]
    pub aggregate_supported: bool,
    #[serde(default, alias = "failAggregateSubmit")]
    pub fail_aggregate_submit: bool,
    #[serde(default, alias = "revertAggregate")]
    pub revert_aggregate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SimulationFixture {
    fn default() -> Self {
        Self {
            already_delegated: Vec::new(),
            aggregate_supported: true,
            fail_aggregate_submit: false,
            revert_aggregate: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateLicensesRequest {
    #[serde(alias = "ownerAddress")]
    pub owner_address: String,
    pub delegatee: String,
    #[serde(alias = "tokenIds")]
    pub token_ids: Vec<String>,
    #[serde(default, alias = "targetChainId")]
    pub target_chain_id: Option<u64>,
    #[serde(default)]
    pub simulation: Option<SimulationFixture>,
}
