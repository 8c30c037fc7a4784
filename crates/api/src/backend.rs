//! Notisync backend related types.

use crate::*;
use std::sync::Arc;

/// The query and mutation interface of the notification backend.
///
/// The backend owns notification records. This client only reads them
/// and flips their read flag.
pub trait Backend: 'static + Send + Sync + std::fmt::Debug {
    /// List the notifications of `user`, newest first, at most `limit`.
    fn list(
        &self,
        user: UserId,
        limit: usize,
    ) -> BoxFut<'_, NsResult<Vec<Notification>>>;

    /// Set `is_read` on a single notification of `user`.
    fn mark_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> BoxFut<'_, NsResult<()>>;

    /// Set `is_read` on every unread notification of `user`.
    fn mark_all_read(&self, user: UserId) -> BoxFut<'_, NsResult<()>>;
}

/// Trait-object [Backend].
pub type DynBackend = Arc<dyn Backend>;

/// A factory for constructing [Backend] instances.
pub trait BackendFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> NsResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> NsResult<()>;

    /// Construct a backend instance.
    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynBackend>>;
}

/// Trait-object [BackendFactory].
pub type DynBackendFactory = Arc<dyn BackendFactory>;
