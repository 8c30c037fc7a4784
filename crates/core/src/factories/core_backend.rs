//! The core backend implementation provided by notisync.
//!
//! Talks to the notification REST api through
//! [notisync_backend_client]. Requests are blocking, so each one runs on
//! the tokio blocking pool.

use notisync_api::*;
use std::sync::Arc;

/// CoreBackend configuration types.
pub mod config {
    /// Configuration parameters for [CoreBackendFactory](super::CoreBackendFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreBackendConfig {
        /// The base url of the notification backend.
        /// E.g. `https://api.example.com/v1`.
        pub server_url: String,
    }

    impl Default for CoreBackendConfig {
        fn default() -> Self {
            Self {
                server_url: "<https://your.backend.url>".into(),
            }
        }
    }

    /// Module-level configuration for CoreBackend.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoreBackendModConfig {
        /// CoreBackend configuration.
        pub core_backend: CoreBackendConfig,
    }
}

pub use config::*;

/// The core backend implementation provided by notisync.
#[derive(Debug)]
pub struct CoreBackendFactory {}

impl CoreBackendFactory {
    /// Construct a new CoreBackendFactory.
    pub fn create() -> DynBackendFactory {
        let out: DynBackendFactory = Arc::new(CoreBackendFactory {});
        out
    }
}

fn parse_server_url(config: &Config) -> NsResult<url::Url> {
    const ERR: &str = "invalid backend server_url";

    let config: CoreBackendModConfig = config.get_module_config()?;

    let url = url::Url::parse(&config.core_backend.server_url)
        .map_err(|e| NsError::other_src(ERR, e))?;

    if url.cannot_be_a_base() {
        return Err(NsError::invalid_argument(ERR));
    }

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(NsError::invalid_argument(ERR)),
    }
}

impl BackendFactory for CoreBackendFactory {
    fn default_config(&self, config: &mut Config) -> NsResult<()> {
        config.add_default_module_config(&CoreBackendModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> NsResult<()> {
        parse_server_url(config).map(|_| ())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynBackend>> {
        Box::pin(async move {
            let server_url = parse_server_url(&builder.config)?;
            let out: DynBackend = Arc::new(CoreBackend { server_url });
            Ok(out)
        })
    }
}

#[derive(Debug)]
struct CoreBackend {
    server_url: url::Url,
}

async fn blocking<T, F>(f: F) -> NsResult<T>
where
    T: 'static + Send,
    F: FnOnce() -> NsResult<T> + 'static + Send,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NsError::other_src("task join error", e))?
}

impl Backend for CoreBackend {
    fn list(
        &self,
        user: UserId,
        limit: usize,
    ) -> BoxFut<'_, NsResult<Vec<Notification>>> {
        let server_url = self.server_url.clone();
        Box::pin(async move {
            blocking(move || {
                notisync_backend_client::blocking_list(server_url, &user, limit)
            })
            .await
        })
    }

    fn mark_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> BoxFut<'_, NsResult<()>> {
        let server_url = self.server_url.clone();
        Box::pin(async move {
            blocking(move || {
                notisync_backend_client::blocking_mark_read(server_url, &user, id)
            })
            .await
        })
    }

    fn mark_all_read(&self, user: UserId) -> BoxFut<'_, NsResult<()>> {
        let server_url = self.server_url.clone();
        Box::pin(async move {
            blocking(move || {
                notisync_backend_client::blocking_mark_all_read(
                    server_url, &user,
                )
            })
            .await
        })
    }
}
