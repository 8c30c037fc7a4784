//! Notification cache related types.

use crate::*;
use std::sync::Arc;

/// A cached notification list along with the time it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The cached list, newest first.
    pub data: Arc<[Notification]>,

    /// When the list was stored.
    pub timestamp: Timestamp,
}

/// A per-user store of the last known notification list.
///
/// This is a dumb store. It does not judge staleness and does not evict
/// anything beyond overwriting an entry for the same user. Freshness is
/// decided by the reader.
pub trait Cache: 'static + Send + Sync + std::fmt::Debug {
    /// Get the entry for `user`, if any.
    fn get(&self, user: &UserId) -> Option<CacheEntry>;

    /// Store `data` for `user` stamped with the current time.
    fn set(&self, user: &UserId, data: Arc<[Notification]>);

    /// Remove the entry for `user`.
    fn invalidate(&self, user: &UserId);
}

/// Trait-object [Cache].
pub type DynCache = Arc<dyn Cache>;

/// A factory for constructing [Cache] instances.
pub trait CacheFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> NsResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> NsResult<()>;

    /// Construct a cache instance.
    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynCache>>;
}

/// Trait-object [CacheFactory].
pub type DynCacheFactory = Arc<dyn CacheFactory>;
