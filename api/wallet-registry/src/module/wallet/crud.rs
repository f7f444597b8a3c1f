use super::error::AppError;
use super::model::WalletRecord;
use super::schema::{CreateWalletRequest, UpdateWalletRequest, WalletView};
use crate::app::AppState;
use crate::infra::{WALLETS_COLLECTION, WALLETS_INDEX_KEY};
use crate::service::validation_service::{normalize_address, validate_create_request};
use chrono::Utc;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct WalletStore {
    inner: Mutex<WalletStoreInner>,
}

#[derive(Debug, Default)]
struct WalletStoreInner {
    wallets_by_address: HashMap<String, WalletRecord>,
}

pub async fn list_wallets(state: &AppState) -> Result<Vec<WalletView>, AppError> {
    let mut by_address: HashMap<String, WalletRecord> = HashMap::new();
    {
        let inner = lock_store(&state.store)?;
        for record in inner.wallets_by_address.values() {
            by_address.insert(record.address.clone(), record.clone());
        }
    }

    if let Some(infra) = &state.infra {
        let mut conn = infra
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
        let addresses: Vec<String> = conn
            .smembers(WALLETS_INDEX_KEY)
            .await
            .map_err(|e| AppError::internal("REDIS_QUERY_FAILED", e.to_string()))?;
        for address in addresses {
            if let Some(record) = load_wallet_from_redis(state, &address).await? {
                by_address.insert(record.address.clone(), record);
            }
        }
    }

    let mut wallets = by_address.into_values().map(|r| to_view(&r)).collect::<Vec<_>>();
    wallets.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.address.cmp(&b.address))
    });
    Ok(wallets)
}

pub async fn get_wallet(state: &AppState, address: &str) -> Result<WalletView, AppError> {
    let record = get_wallet_record(state, address).await?;
    Ok(to_view(&record))
}

pub async fn create_wallet(
    state: &AppState,
    req: CreateWalletRequest,
) -> Result<WalletView, AppError> {
    let (address, label) = validate_create_request(&req)?;
    let address = normalize_address(&address);

    if load_wallet_from_redis(state, &address).await?.is_some() {
        return Err(AppError::bad_request(
            "DUPLICATE_ADDRESS",
            "wallet address is already registered",
        ));
    }

    let now = Utc::now().timestamp();
    let record = WalletRecord {
        address: address.clone(),
        label,
        has_licenses: req.has_licenses.unwrap_or(false),
        verified: req.verified.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };

    // Check and insert under one lock so racing creates cannot both win.
    {
        let mut inner = lock_store(&state.store)?;
        if inner.wallets_by_address.contains_key(&address) {
            return Err(AppError::bad_request(
                "DUPLICATE_ADDRESS",
                "wallet address is already registered",
            ));
        }
        inner.wallets_by_address.insert(address, record.clone());
    }
    persist_wallet(state, &record).await?;
    Ok(to_view(&record))
}

pub async fn update_wallet(
    state: &AppState,
    address: &str,
    req: UpdateWalletRequest,
) -> Result<WalletView, AppError> {
    if req.label.is_none() && req.has_licenses.is_none() && req.verified.is_none() {
        return Err(AppError::bad_request(
            "NO_UPDATE_FIELDS",
            "no valid update parameters provided",
        ));
    }

    // Warm from the mirror first so the mutation sees a persisted record.
    let _ = get_wallet_record(state, address).await?;

    let key = normalize_address(address);
    let record = {
        let mut inner = lock_store(&state.store)?;
        let record = inner
            .wallets_by_address
            .get_mut(&key)
            .ok_or_else(|| AppError::not_found("WALLET_NOT_FOUND", "wallet not found"))?;
        if let Some(label) = req.label {
            record.label = label.trim().to_string();
        }
        if let Some(has_licenses) = req.has_licenses {
            record.has_licenses = has_licenses;
        }
        if let Some(verified) = req.verified {
            record.verified = verified;
        }
        record.updated_at = Utc::now().timestamp();
        record.clone()
    };
    persist_wallet(state, &record).await?;
    Ok(to_view(&record))
}

pub async fn wallet_count(state: &AppState) -> Result<usize, AppError> {
    let inner = lock_store(&state.store)?;
    Ok(inner.wallets_by_address.len())
}

/// Idempotently checks that the backing storage is reachable. In-memory
/// mode has nothing to set up; the Redis index set materialises on first
/// write, so a round-trip is all that is needed here.
pub async fn init_db(state: &AppState) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    let mut conn = infra
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .map_err(|e| AppError::internal("REDIS_PING_FAILED", e.to_string()))?;
    Ok(())
}

async fn get_wallet_record(state: &AppState, address: &str) -> Result<WalletRecord, AppError> {
    let key = normalize_address(address);
    {
        let inner = lock_store(&state.store)?;
        if let Some(record) = inner.wallets_by_address.get(&key) {
            return Ok(record.clone());
        }
    }
    if let Some(record) = load_wallet_from_redis(state, &key).await? {
        warm_wallet_in_memory(state, &record)?;
        return Ok(record);
    }
    Err(AppError::not_found("WALLET_NOT_FOUND", "wallet not found"))
}

fn to_view(record: &WalletRecord) -> WalletView {
    WalletView {
        address: record.address.clone(),
        label: record.label.clone(),
        has_licenses: record.has_licenses,
        verified: record.verified,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn lock_store(store: &WalletStore) -> Result<MutexGuard<'_, WalletStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_POISONED", "wallet store lock poisoned"))
}

fn warm_wallet_in_memory(state: &AppState, record: &WalletRecord) -> Result<(), AppError> {
    let mut inner = lock_store(&state.store)?;
    inner
        .wallets_by_address
        .entry(record.address.clone())
        .or_insert_with(|| record.clone());
    Ok(())
}

async fn persist_wallet(state: &AppState, record: &WalletRecord) -> Result<(), AppError> {
    let Some(infra) = &state.infra else {
        return Ok(());
    };
    let mut conn = infra
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    let payload = serde_json::to_string(record)
        .map_err(|e| AppError::internal("WALLET_ENCODE_FAILED", e.to_string()))?;
    let wallet_key = format!("{WALLETS_COLLECTION}:{}", record.address);
    conn.set::<_, _, ()>(wallet_key, payload)
        .await
        .map_err(|e| AppError::internal("REDIS_WRITE_FAILED", e.to_string()))?;
    conn.sadd::<_, _, ()>(WALLETS_INDEX_KEY, record.address.clone())
        .await
        .map_err(|e| AppError::internal("REDIS_WRITE_FAILED", e.to_string()))?;
    Ok(())
}

async fn load_wallet_from_redis(
    state: &AppState,
    address: &str,
) -> Result<Option<WalletRecord>, AppError> {
    let Some(infra) = &state.infra else {
        return Ok(None);
    };
    let mut conn = infra
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::internal("REDIS_CONNECT_FAILED", e.to_string()))?;
    let wallet_key = format!("{WALLETS_COLLECTION}:{}", normalize_address(address));
    let payload: Option<String> = conn
        .get(wallet_key)
        .await
        .map_err(|e| AppError::internal("REDIS_QUERY_FAILED", e.to_string()))?;
    let Some(payload) = payload else {
        return Ok(None);
    };
    let record = serde_json::from_str::<WalletRecord>(&payload)
        .map_err(|e| AppError::internal("WALLET_DECODE_FAILED", e.to_string()))?;
    Ok(Some(record))
}
