use crate::errors::DelegationError;
use crate::models::{
    DelegateLicensesRequest, DelegationOutcome, DelegationProgress, DelegationResult,
    DelegationStrategy, SimulationFixture,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{info, warn};

/// Revert reason the license contract emits for a repeated delegation.
pub const ALREADY_DELEGATED_MARKER: &str = "Delegation exists";
/// What a node reports when the aggregate entry point is absent.
pub const AGGREGATE_UNSUPPORTED_MARKER: &str = "function selector was not recognized";

/// Gas ceiling used when estimation itself fails.
pub const FALLBACK_AGGREGATE_GAS: u64 = 5_000_000;

#[derive(Debug, Clone)]
pub struct SubmittedTx {
    pub hash: String,
    /// False when the transaction confirmed with a revert status.
    pub confirmed: bool,
}

/// Seam over the signing wallet and the two contract entry points. The
/// ethers implementation lives in `chain.rs`; tests and the offline
/// binary use `SimulatedBackend`.
#[async_trait]
pub trait DelegationBackend: Send + Sync {
    /// Aligns the signer with the target chain, failing when the
    /// connected node is on a different network.
    async fn ensure_chain(&self, target_chain_id: u64) -> Result<(), DelegationError>;
    fn sender_address(&self) -> String;
    async fn estimate_aggregate_gas(
        &self,
        token_ids: &[String],
        delegatee: &str,
    ) -> Result<u64, DelegationError>;
    async fn simulate_aggregate(
        &self,
        token_ids: &[String],
        delegatee: &str,
    ) -> Result<(), DelegationError>;
    async fn submit_aggregate(
        &self,
        token_ids: &[String],
        delegatee: &str,
        gas_limit: u64,
    ) -> Result<SubmittedTx, DelegationError>;
    async fn simulate_delegate(
        &self,
        token_id: &str,
        delegatee: &str,
    ) -> Result<(), DelegationError>;
    async fn submit_delegate(
        &self,
        token_id: &str,
        delegatee: &str,
    ) -> Result<SubmittedTx, DelegationError>;
}

pub fn is_already_delegated(err: &DelegationError) -> bool {
    err.to_string().contains(ALREADY_DELEGATED_MARKER)
}

pub fn is_aggregate_unsupported(err: &DelegationError) -> bool {
    err.to_string().contains(AGGREGATE_UNSUPPORTED_MARKER)
}

fn is_valid_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Delegates every token to the delegatee, aggregated-first with a
/// sequential per-token fallback. Results are rebuilt from scratch on
/// every call; `on_progress` fires whenever the completed count moves.
pub async fn delegate_licenses<B, F>(
    backend: &B,
    owner_address: &str,
    delegatee: &str,
    token_ids: &[String],
    target_chain_id: u64,
    mut on_progress: F,
) -> Result<DelegationOutcome, DelegationError>
where
    B: DelegationBackend + ?Sized,
    F: FnMut(DelegationProgress, &[DelegationResult]),
{
    if token_ids.is_empty() {
        return Err(DelegationError::InvalidRequest(
            "at least one token id is required".to_string(),
        ));
    }
    if !is_valid_address(delegatee) {
        return Err(DelegationError::InvalidRequest(
            "delegatee must be 0x followed by 40 hex characters".to_string(),
        ));
    }

    backend.ensure_chain(target_chain_id).await?;

    let sender = backend.sender_address();
    if sender.to_lowercase() != owner_address.trim().to_lowercase() {
        return Err(DelegationError::WrongWallet {
            expected: owner_address.trim().to_lowercase(),
            connected: sender.to_lowercase(),
        });
    }

    let total = token_ids.len() as u64;
    info!(delegatee = %delegatee, total, "delegation started");

    match try_aggregated(backend, token_ids, delegatee).await {
        AggregatedAttempt::Completed(results) => {
            let succeeded = results.iter().filter(|r| r.success).count() as u64;
            on_progress(
                DelegationProgress {
                    completed: total,
                    total,
                    percent: 100,
                },
                &results,
            );
            Ok(DelegationOutcome {
                delegatee: delegatee.to_string(),
                strategy: DelegationStrategy::Aggregated,
                succeeded,
                failed: total - succeeded,
                results,
            })
        }
        AggregatedAttempt::FallBack(reason) => {
            warn!(reason = %reason, "aggregated delegation unavailable, falling back to sequential");
            let results = run_sequential(backend, token_ids, delegatee, &mut on_progress).await;
            let succeeded = results.iter().filter(|r| r.success).count() as u64;
            Ok(DelegationOutcome {
                delegatee: delegatee.to_string(),
                strategy: DelegationStrategy::Sequential,
                succeeded,
                failed: total - succeeded,
                results,
            })
        }
    }
}

enum AggregatedAttempt {
    Completed(Vec<DelegationResult>),
    FallBack(String),
}

async fn try_aggregated<B: DelegationBackend + ?Sized>(
    backend: &B,
    token_ids: &[String],
    delegatee: &str,
) -> AggregatedAttempt {
    let gas_limit = match backend.estimate_aggregate_gas(token_ids, delegatee).await {
        // Fixed 1.5x safety margin over the estimate.
        Ok(estimate) => estimate.saturating_add(estimate / 2),
        Err(e) => {
            warn!(error = %e, "gas estimation failed, using fallback ceiling");
            FALLBACK_AGGREGATE_GAS
        }
    };

    if let Err(e) = backend.simulate_aggregate(token_ids, delegatee).await {
        return AggregatedAttempt::FallBack(if is_aggregate_unsupported(&e) {
            format!("aggregate entry point not available: {e}")
        } else {
            format!("aggregate simulation failed: {e}")
        });
    }

    match backend.submit_aggregate(token_ids, delegatee, gas_limit).await {
        Ok(tx) if tx.confirmed => {
            info!(hash = %tx.hash, tokens = token_ids.len(), "aggregated delegation confirmed");
            AggregatedAttempt::Completed(
                token_ids
                    .iter()
                    .map(|token_id| DelegationResult {
                        token_id: token_id.clone(),
                        success: true,
                        hash: Some(tx.hash.clone()),
                        error: None,
                    })
                    .collect(),
            )
        }
        // One transaction: a confirmed revert fails every token together.
        Ok(tx) => {
            warn!(hash = %tx.hash, "aggregated delegation reverted");
            AggregatedAttempt::Completed(
                token_ids
                    .iter()
                    .map(|token_id| DelegationResult {
                        token_id: token_id.clone(),
                        success: false,
                        hash: Some(tx.hash.clone()),
                        error: Some("aggregated delegation reverted onchain".to_string()),
                    })
                    .collect(),
            )
        }
        Err(e) => AggregatedAttempt::FallBack(format!("aggregate submission failed: {e}")),
    }
}

/// Tokens go strictly one at a time so nonces and confirmations never
/// race. Individual failures do not halt the run.
async fn run_sequential<B, F>(
    backend: &B,
    token_ids: &[String],
    delegatee: &str,
    on_progress: &mut F,
) -> Vec<DelegationResult>
where
    B: DelegationBackend + ?Sized,
    F: FnMut(DelegationProgress, &[DelegationResult]),
{
    let total = token_ids.len() as u64;
    let mut results: Vec<DelegationResult> = Vec::with_capacity(token_ids.len());

    for token_id in token_ids {
        let result = delegate_one(backend, token_id, delegatee).await;
        if let Some(error) = &result.error {
            warn!(token_id = %token_id, error = %error, "token delegation failed");
        }
        results.push(result);
        on_progress(
            DelegationProgress {
                completed: results.len() as u64,
                total,
                percent: ((results.len() as u64 * 100) / total) as u32,
            },
            &results,
        );
    }
    results
}

async fn delegate_one<B: DelegationBackend + ?Sized>(
    backend: &B,
    token_id: &str,
    delegatee: &str,
) -> DelegationResult {
    if let Err(e) = backend.simulate_delegate(token_id, delegatee).await {
        let message = if is_already_delegated(&e) {
            format!("License {token_id} is already delegated")
        } else {
            e.to_string()
        };
        return DelegationResult {
            token_id: token_id.to_string(),
            success: false,
            hash: None,
            error: Some(message),
        };
    }

    match backend.submit_delegate(token_id, delegatee).await {
        Ok(tx) if tx.confirmed => DelegationResult {
            token_id: token_id.to_string(),
            success: true,
            hash: Some(tx.hash),
            error: None,
        },
        Ok(tx) => DelegationResult {
            token_id: token_id.to_string(),
            success: false,
            hash: Some(tx.hash),
            error: Some("delegation reverted onchain".to_string()),
        },
        Err(e) => DelegationResult {
            token_id: token_id.to_string(),
            success: false,
            hash: None,
            error: Some(e.to_string()),
        },
    }
}

/// Deterministic backend for the offline binary mode and tests;
/// transaction hashes are derived from the call parameters.
pub struct SimulatedBackend {
    sender: String,
    chain_id: u64,
    already_delegated: HashSet<String>,
    aggregate_supported: bool,
    fail_aggregate_submit: bool,
    revert_aggregate: bool,
}

impl SimulatedBackend {
    pub fn new(sender: &str, chain_id: u64, fixture: SimulationFixture) -> Self {
        Self {
            sender: sender.trim().to_lowercase(),
            chain_id,
            already_delegated: fixture.already_delegated.into_iter().collect(),
            aggregate_supported: fixture.aggregate_supported,
            fail_aggregate_submit: fixture.fail_aggregate_submit,
            revert_aggregate: fixture.revert_aggregate,
        }
    }

    fn hash_for(&self, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"tx");
        for part in parts {
            hasher.update(part.as_bytes());
        }
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl DelegationBackend for SimulatedBackend {
    async fn ensure_chain(&self, target_chain_id: u64) -> Result<(), DelegationError> {
        if self.chain_id != target_chain_id {
            return Err(DelegationError::WrongNetwork(format!(
                "connected to chain {} but chain {} is required",
                self.chain_id, target_chain_id
            )));
        }
        Ok(())
    }

    fn sender_address(&self) -> String {
        self.sender.clone()
    }

    async fn estimate_aggregate_gas(
        &self,
        token_ids: &[String],
        _delegatee: &str,
    ) -> Result<u64, DelegationError> {
        Ok(60_000 * token_ids.len() as u64)
    }

    async fn simulate_aggregate(
        &self,
        token_ids: &[String],
        _delegatee: &str,
    ) -> Result<(), DelegationError> {
        if !self.aggregate_supported {
            return Err(DelegationError::Onchain(format!(
                "execution failed: {AGGREGATE_UNSUPPORTED_MARKER}"
            )));
        }
        for token_id in token_ids {
            if self.already_delegated.contains(token_id) {
                return Err(DelegationError::Onchain(format!(
                    "execution reverted: {ALREADY_DELEGATED_MARKER}"
                )));
            }
        }
        Ok(())
    }

    async fn submit_aggregate(
        &self,
        token_ids: &[String],
        delegatee: &str,
        _gas_limit: u64,
    ) -> Result<SubmittedTx, DelegationError> {
        if self.fail_aggregate_submit {
            return Err(DelegationError::Onchain(
                "aggregate submission rejected by node".to_string(),
            ));
        }
        let joined = token_ids.join(",");
        Ok(SubmittedTx {
            hash: self.hash_for(&["aggregate", &self.sender, delegatee, &joined]),
            confirmed: !self.revert_aggregate,
        })
    }

    async fn simulate_delegate(
        &self,
        token_id: &str,
        _delegatee: &str,
    ) -> Result<(), DelegationError> {
        if self.already_delegated.contains(token_id) {
            return Err(DelegationError::Onchain(format!(
                "execution reverted: {ALREADY_DELEGATED_MARKER}"
            )));
        }
        Ok(())
    }

    async fn submit_delegate(
        &self,
        token_id: &str,
        delegatee: &str,
    ) -> Result<SubmittedTx, DelegationError> {
        Ok(SubmittedTx {
            hash: self.hash_for(&["delegate", &self.sender, delegatee, token_id]),
            confirmed: true,
        })
    }
}

/// Offline entry point used by the binary when no chain env is set.
pub async fn process_delegate_licenses(
    req: DelegateLicensesRequest,
    target_chain_id: u64,
    mut on_progress: impl FnMut(DelegationProgress, &[DelegationResult]),
) -> Result<DelegationOutcome, DelegationError> {
    let backend = SimulatedBackend::new(
        &req.owner_address,
        target_chain_id,
        req.simulation.clone().unwrap_or_default(),
    );
    delegate_licenses(
        &backend,
        &req.owner_address,
        &req.delegatee,
        &req.token_ids,
        target_chain_id,
        &mut on_progress,
    )
    .await
}
