//! A memory-based notification cache.

use notisync_api::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A memory-based notification cache factory.
///
/// One cache instance is created per [NotificationClient](crate::NotificationClient)
/// and shared by every session it mounts.
#[derive(Debug)]
pub struct MemCacheFactory {}

impl MemCacheFactory {
    /// Construct a new MemCacheFactory.
    pub fn create() -> DynCacheFactory {
        let out: DynCacheFactory = Arc::new(Self {});
        out
    }
}

impl CacheFactory for MemCacheFactory {
    fn default_config(&self, _config: &mut Config) -> NsResult<()> {
        Ok(())
    }

    fn validate_config(&self, _config: &Config) -> NsResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynCache>> {
        Box::pin(async move {
            let out: DynCache = Arc::new(MemCache::default());
            Ok(out)
        })
    }
}

/// Per-user entries in a hash map. Last write wins.
#[derive(Default)]
pub struct MemCache(Mutex<HashMap<UserId, CacheEntry>>);

impl std::fmt::Debug for MemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCache").finish()
    }
}

impl MemCache {
    /// Store an entry with an explicit timestamp.
    pub fn set_entry(&self, user: &UserId, entry: CacheEntry) {
        self.0.lock().unwrap().insert(user.clone(), entry);
    }
}

impl Cache for MemCache {
    fn get(&self, user: &UserId) -> Option<CacheEntry> {
        self.0.lock().unwrap().get(user).cloned()
    }

    fn set(&self, user: &UserId, data: Arc<[Notification]>) {
        self.set_entry(
            user,
            CacheEntry {
                data,
                timestamp: Timestamp::now(),
            },
        );
    }

    fn invalidate(&self, user: &UserId) {
        self.0.lock().unwrap().remove(user);
    }
}
