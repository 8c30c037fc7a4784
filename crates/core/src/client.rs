use notisync_api::*;
use std::sync::Arc;

/// The process-level owner of the notisync modules.
///
/// The backend, live channel and cache are created once, and every
/// session mounted through this client shares them. In particular all
/// sessions see the same cache, so a second mount for a user inside the
/// cache freshness window does not hit the network.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    builder: Arc<Builder>,
    backend: DynBackend,
    live: DynLive,
    cache: DynCache,
}

impl NotificationClient {
    /// Create the shared module instances from a frozen builder.
    pub async fn create(builder: Arc<Builder>) -> NsResult<Self> {
        builder.validate_config()?;

        let backend = builder.backend.create(builder.clone()).await?;
        let live = builder.live.create(builder.clone()).await?;
        let cache = builder.cache.create(builder.clone()).await?;

        tracing::debug!(config = ?builder.config, "notification client ready");

        Ok(Self {
            builder,
            backend,
            live,
            cache,
        })
    }

    /// The builder this client was created from.
    pub fn builder(&self) -> &Arc<Builder> {
        &self.builder
    }

    /// The cache shared by every session of this client.
    pub fn cache(&self) -> &DynCache {
        &self.cache
    }

    /// Mount a session for `user`. With `None` the session starts idle
    /// until [Session::set_user] provides a user.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn mount(&self, user: Option<UserId>) -> NsResult<DynSession> {
        self.builder
            .session
            .create(
                self.builder.clone(),
                self.backend.clone(),
                self.live.clone(),
                self.cache.clone(),
                user,
            )
            .await
    }
}
