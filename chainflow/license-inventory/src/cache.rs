use crate::models::LicenseToken;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct CachedInventory {
    licenses: Vec<LicenseToken>,
    cached_at: i64,
}

/// Per-owner inventory cache. No TTL; entries live until `clear` is
/// called for the owner. Keys are lowercase addresses, single writer in
/// practice, last write wins.
#[derive(Debug, Default)]
pub struct LicenseCache {
    inner: Mutex<HashMap<String, CachedInventory>>,
}

impl LicenseCache {
    pub fn get(&self, owner: &str) -> Option<Vec<LicenseToken>> {
        let inner = self.inner.lock().ok()?;
        inner
            .get(&owner.to_lowercase())
            .map(|entry| entry.licenses.clone())
    }

    pub fn put(&self, owner: &str, licenses: Vec<LicenseToken>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.insert(
                owner.to_lowercase(),
                CachedInventory {
                    licenses,
                    cached_at: Utc::now().timestamp(),
                },
            );
        }
    }

    pub fn clear(&self, owner: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.remove(&owner.to_lowercase());
        }
    }

    pub fn cached_at(&self, owner: &str) -> Option<i64> {
        let inner = self.inner.lock().ok()?;
        inner.get(&owner.to_lowercase()).map(|entry| entry.cached_at)
    }
}
