use crate::cache::LicenseCache;
use crate::errors::InventoryError;
use crate::models::{FetchOutcome, FetchProgress, LicenseStatus, LicenseToken};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// The ownership enumeration the license contract exposes:
/// count-of-tokens-by-owner plus token-id-by-owner-and-index.
#[async_trait]
pub trait OwnershipSource: Send + Sync {
    async fn token_count(&self, owner: &str) -> Result<u64, InventoryError>;
    async fn token_by_index(&self, owner: &str, index: u64) -> Result<String, InventoryError>;
}

/// Deterministic in-memory source used by the offline binary mode and
/// tests.
#[derive(Debug, Default)]
pub struct FixtureOwnershipSource {
    tokens: Vec<String>,
    missing_indices: HashSet<u64>,
}

impl FixtureOwnershipSource {
    pub fn new(tokens: Vec<String>, missing_indices: Vec<u64>) -> Self {
        Self {
            tokens,
            missing_indices: missing_indices.into_iter().collect(),
        }
    }
}

#[async_trait]
impl OwnershipSource for FixtureOwnershipSource {
    async fn token_count(&self, _owner: &str) -> Result<u64, InventoryError> {
        Ok(self.tokens.len() as u64)
    }

    async fn token_by_index(&self, _owner: &str, index: u64) -> Result<String, InventoryError> {
        if self.missing_indices.contains(&index) {
            return Err(InventoryError::Onchain(format!(
                "tokenOfOwnerByIndex reverted at index {index}"
            )));
        }
        self.tokens
            .get(index as usize)
            .cloned()
            .ok_or_else(|| InventoryError::Onchain(format!("index {index} out of range")))
    }
}

pub struct InventoryFetcher<S> {
    source: S,
    cache: LicenseCache,
    batch_size: usize,
}

impl<S: OwnershipSource> InventoryFetcher<S> {
    pub fn new(source: S, batch_size: usize) -> Self {
        Self {
            source,
            cache: LicenseCache::default(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn cache(&self) -> &LicenseCache {
        &self.cache
    }

    /// Enumerates the owner's tokens in sequential batches, issuing the
    /// per-index queries concurrently within each batch. Individual
    /// index failures are dropped and counted; only a failing count
    /// query aborts the fetch. `on_progress` fires after the cache
    /// short-circuit, the empty case, and every completed batch, with
    /// the list loaded so far, so callers can render partial results.
    pub async fn fetch_licenses<F>(
        &self,
        owner: &str,
        mut on_progress: F,
    ) -> Result<FetchOutcome, InventoryError>
    where
        F: FnMut(FetchProgress, &[LicenseToken]),
    {
        let owner = owner.trim().to_lowercase();
        if owner.is_empty() {
            return Err(InventoryError::InvalidRequest(
                "owner address is required".to_string(),
            ));
        }

        if let Some(cached) = self.cache.get(&owner) {
            if !cached.is_empty() {
                let total = cached.len() as u64;
                debug!(owner = %owner, total, "license inventory served from cache");
                on_progress(
                    FetchProgress {
                        scanned: total,
                        total,
                        percent: 100,
                    },
                    &cached,
                );
                return Ok(FetchOutcome {
                    owner_address: owner,
                    total,
                    loaded: total,
                    dropped: 0,
                    from_cache: true,
                    licenses: cached,
                });
            }
        }

        let total = self
            .source
            .token_count(&owner)
            .await
            .map_err(|e| InventoryError::CountQuery(e.to_string()))?;
        info!(owner = %owner, total, "license inventory fetch started");

        if total == 0 {
            on_progress(
                FetchProgress {
                    scanned: 0,
                    total: 0,
                    percent: 100,
                },
                &[],
            );
            return Ok(FetchOutcome {
                owner_address: owner,
                total: 0,
                loaded: 0,
                dropped: 0,
                from_cache: false,
                licenses: Vec::new(),
            });
        }

        let expiry_date = (Utc::now() + Duration::days(365)).to_rfc3339();
        let mut licenses: Vec<LicenseToken> = Vec::with_capacity(total as usize);
        let mut dropped: u64 = 0;
        let mut batch_start: u64 = 0;

        while batch_start < total {
            let batch_end = (batch_start + self.batch_size as u64).min(total);
            let queries = (batch_start..batch_end)
                .map(|index| self.source.token_by_index(&owner, index));
            for result in join_all(queries).await {
                match result {
                    Ok(token_id) => licenses.push(LicenseToken {
                        token_id,
                        status: LicenseStatus::Available,
                        expiry_date: Some(expiry_date.clone()),
                    }),
                    Err(e) => {
                        dropped += 1;
                        warn!(owner = %owner, error = %e, "dropping token during enumeration");
                    }
                }
            }
            batch_start = batch_end;
            on_progress(
                FetchProgress {
                    scanned: batch_end,
                    total,
                    percent: ((batch_end * 100) / total) as u32,
                },
                &licenses,
            );
        }

        self.cache.put(&owner, licenses.clone());
        info!(
            owner = %owner,
            loaded = licenses.len(),
            dropped,
            "license inventory fetch complete"
        );

        Ok(FetchOutcome {
            owner_address: owner,
            total,
            loaded: licenses.len() as u64,
            dropped,
            from_cache: false,
            licenses,
        })
    }
}
