//! The retrying notification list loader.
//!
//! A fetch first consults the shared [Cache]. A fresh entry is returned
//! without touching the network. Otherwise the backend is asked for the
//! list, and failed attempts are retried on an exponential backoff
//! schedule before the last error is surfaced. A successful result is
//! written back to the cache.

use backon::BackoffBuilder;
use notisync_api::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetcher configuration types.
pub mod config {
    use std::time::Duration;

    /// Configuration parameters for the [Fetcher](super::Fetcher).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreFetcherConfig {
        /// Cache entries younger than this are served without a network
        /// call. Default: 5 minutes.
        pub cache_ttl_ms: u64,

        /// How many times a failed fetch is retried after the first
        /// attempt. Default: 3.
        pub max_retries: usize,

        /// The delay before the first retry. Each further retry doubles
        /// it. Default: 1 second.
        pub backoff_base_ms: u64,

        /// How many notifications to request. Default: 20.
        pub list_limit: usize,
    }

    impl Default for CoreFetcherConfig {
        // Worst case a failing fetch gives up after 1 + 2 + 4 = 7s of backoff.
        fn default() -> Self {
            Self {
                cache_ttl_ms: 1000 * 60 * 5,
                max_retries: 3,
                backoff_base_ms: 1000,
                list_limit: notisync_api::MAX_LIST_LEN,
            }
        }
    }

    impl CoreFetcherConfig {
        /// Get the cache freshness window.
        pub fn cache_ttl(&self) -> Duration {
            Duration::from_millis(self.cache_ttl_ms)
        }

        /// Get the first backoff delay.
        pub fn backoff_base(&self) -> Duration {
            Duration::from_millis(self.backoff_base_ms)
        }

        /// Get the longest backoff delay the schedule can produce.
        pub fn backoff_max(&self) -> Duration {
            let factor = 1_u32
                .checked_shl(self.max_retries.saturating_sub(1) as u32)
                .unwrap_or(u32::MAX);
            self.backoff_base().saturating_mul(factor)
        }
    }

    /// Module-level configuration for the Fetcher.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreFetcherModConfig {
        /// Fetcher configuration.
        pub core_fetcher: CoreFetcherConfig,
    }
}

pub use config::*;

/// Loads a user's notification list through the cache, retrying
/// failed network attempts.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: CoreFetcherConfig,
    backend: DynBackend,
    cache: DynCache,
}

impl Fetcher {
    /// Construct a new fetcher over a backend and a shared cache.
    pub fn new(
        config: CoreFetcherConfig,
        backend: DynBackend,
        cache: DynCache,
    ) -> Self {
        Self {
            config,
            backend,
            cache,
        }
    }

    /// The cache this fetcher reads and writes.
    pub fn cache(&self) -> &DynCache {
        &self.cache
    }

    /// The cached list for `user`, if present and still fresh.
    pub fn cached(&self, user: &UserId) -> Option<Arc<[Notification]>> {
        let entry = self.cache.get(user)?;
        if entry.timestamp.elapsed() < self.config.cache_ttl() {
            Some(entry.data)
        } else {
            None
        }
    }

    /// Get the notification list of `user`.
    ///
    /// Fails with [NsError::InvalidArgument] without a user, with
    /// [NsError::Cancelled] if `cancel` fires first, and with
    /// [NsError::Fetch] once every retry has failed.
    pub async fn fetch(
        &self,
        user: Option<&UserId>,
        cancel: &CancellationToken,
    ) -> NsResult<Arc<[Notification]>> {
        let user = user.ok_or_else(|| {
            NsError::invalid_argument("fetching notifications requires a user")
        })?;

        if let Some(data) = self.cached(user) {
            tracing::trace!(%user, "serving notifications from cache");
            return Ok(data);
        }

        let mut back_off = backon::ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.config.backoff_base())
            .with_max_delay(self.config.backoff_max())
            .with_max_times(self.config.max_retries)
            .build();

        let mut attempt = 0_usize;

        loop {
            attempt += 1;

            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NsError::Cancelled),
                res = self.backend.list(user.clone(), self.config.list_limit) => res,
            };

            let err = match res {
                Ok(list) => {
                    if cancel.is_cancelled() {
                        return Err(NsError::Cancelled);
                    }
                    let data: Arc<[Notification]> = list.into();
                    self.cache.set(user, data.clone());
                    return Ok(data);
                }
                Err(err) => err,
            };

            let delay: Duration = match back_off.next() {
                Some(delay) => delay,
                None => {
                    tracing::warn!(?err, %user, attempt, "giving up on notification fetch");
                    return Err(NsError::fetch(
                        format!("gave up after {attempt} attempts"),
                        err,
                    ));
                }
            };

            tracing::debug!(?err, %user, attempt, ?delay, "notification fetch failed, backing off");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NsError::Cancelled),
                _ = tokio::time::sleep(delay) => (),
            }
        }
    }
}
