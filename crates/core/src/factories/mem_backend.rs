//! The mem backend and live channel implementations provided by notisync.
//!
//! These are NOT production modules. They keep notifications in process
//! memory, so that sessions can be exercised end to end in tests and
//! demos. Backend writes are replicated to live subscribers as `update`
//! events, and [MemBackend::push] plays the role of the server creating
//! a notification.

use notisync_api::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// MemBackend configuration types.
mod config {
    /// Configuration parameters for [MemBackendFactory](super::MemBackendFactory)
    /// and [MemLiveFactory](super::MemLiveFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemBackendConfig {
        /// Since rust test runs multiple tests in the same process,
        /// we cannot just have a single global backend store.
        /// This defaults to the current thread id when this config instance
        /// is constructed. This should be sufficient for most needs.
        /// However, if you are creating sessions in tests from
        /// different tasks, you may need to pick an explicit id for this value.
        pub test_id: String,

        /// How many live payloads may queue up per subscriber before
        /// further ones are dropped.
        ///
        /// Default: 1024.
        pub channel_len: usize,
    }

    impl Default for MemBackendConfig {
        fn default() -> Self {
            Self {
                test_id: format!("{:?}", std::thread::current().id()),
                channel_len: 1024,
            }
        }
    }

    /// Module-level configuration for MemBackend and MemLive.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemBackendModConfig {
        /// MemBackend configuration.
        pub mem_backend: MemBackendConfig,
    }
}

pub use config::*;

/// The mem backend factory provided by notisync.
#[derive(Debug)]
pub struct MemBackendFactory {}

impl MemBackendFactory {
    /// Construct a new MemBackendFactory.
    pub fn create() -> DynBackendFactory {
        let out: DynBackendFactory = Arc::new(MemBackendFactory {});
        out
    }
}

impl BackendFactory for MemBackendFactory {
    fn default_config(&self, config: &mut Config) -> NsResult<()> {
        config.add_default_module_config(&MemBackendModConfig::default())
    }

    fn validate_config(&self, _config: &Config) -> NsResult<()> {
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynBackend>> {
        Box::pin(async move {
            let out: DynBackend =
                Arc::new(MemBackend::from_config(&builder.config)?);
            Ok(out)
        })
    }
}

/// The mem live channel factory provided by notisync.
/// Subscribers see the writes of the [MemBackend] with the same test id.
#[derive(Debug)]
pub struct MemLiveFactory {}

impl MemLiveFactory {
    /// Construct a new MemLiveFactory.
    pub fn create() -> DynLiveFactory {
        let out: DynLiveFactory = Arc::new(MemLiveFactory {});
        out
    }
}

impl LiveFactory for MemLiveFactory {
    fn default_config(&self, config: &mut Config) -> NsResult<()> {
        // shares its section with the mem backend
        config.add_default_module_config(&MemBackendModConfig::default())
    }

    fn validate_config(&self, _config: &Config) -> NsResult<()> {
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, NsResult<DynLive>> {
        Box::pin(async move {
            let out: DynLive =
                Arc::new(MemBackend::from_config(&builder.config)?);
            Ok(out)
        })
    }
}

type LiveSend = tokio::sync::mpsc::Sender<bytes::Bytes>;

#[derive(Default)]
struct Hub {
    data: Vec<Notification>,
    subs: HashMap<UserId, Vec<LiveSend>>,
    fail_count: usize,
    list_delay: std::time::Duration,
    list_calls: usize,
}

impl Hub {
    fn take_failure(&mut self) -> NsResult<()> {
        if self.fail_count > 0 {
            self.fail_count -= 1;
            return Err(NsError::other("mem backend induced failure"));
        }
        Ok(())
    }

    fn send(&mut self, user: &UserId, data: bytes::Bytes) {
        let Some(subs) = self.subs.get_mut(user) else {
            return;
        };
        subs.retain(|s| match s.try_send(data.clone()) {
            Ok(()) => true,
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%user, "live subscriber lagging, dropping event");
                true
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn emit(&mut self, event: LiveEvent) {
        match event.encode() {
            Ok(data) => {
                let user = event.record.user_id.clone();
                self.send(&user, data);
            }
            Err(err) => {
                tracing::error!(?err, "could not encode live event, dropping");
            }
        }
    }

    fn select(&self, user: &UserId, limit: usize) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .data
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        out
    }
}

type TestId = Arc<str>;

fn get_stat(test_id: &str) -> Arc<Mutex<Hub>> {
    static STAT: OnceLock<Mutex<HashMap<TestId, Arc<Mutex<Hub>>>>> =
        OnceLock::new();
    STAT.get_or_init(Default::default)
        .lock()
        .unwrap()
        .entry(test_id.into())
        .or_default()
        .clone()
}

/// A handle to the in-process backend store of one test id.
///
/// Handles with the same test id share their store, so a test can hold
/// one to drive the backend while sessions use another.
#[derive(Clone)]
pub struct MemBackend {
    hub: Arc<Mutex<Hub>>,
    channel_len: usize,
}

impl std::fmt::Debug for MemBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemBackend").finish()
    }
}

impl MemBackend {
    /// Get the store configured in `config` (see [MemBackendConfig]).
    pub fn from_config(config: &Config) -> NsResult<Self> {
        let config: MemBackendModConfig = config.get_module_config()?;
        Ok(Self {
            hub: get_stat(&config.mem_backend.test_id),
            channel_len: config.mem_backend.channel_len.max(1),
        })
    }

    /// Create a notification server-side, and announce it to the live
    /// subscribers of its user.
    pub fn push(&self, notification: Notification) {
        let mut lock = self.hub.lock().unwrap();
        lock.data.push(notification.clone());
        lock.emit(LiveEvent::insert(notification));
    }

    /// Store notifications server-side without announcing them.
    pub fn seed(&self, list: impl IntoIterator<Item = Notification>) {
        self.hub.lock().unwrap().data.extend(list);
    }

    /// Deliver a raw payload to the live subscribers of `user`.
    pub fn send_raw(&self, user: &UserId, data: bytes::Bytes) {
        self.hub.lock().unwrap().send(user, data);
    }

    /// Make the next `count` backend calls fail.
    pub fn set_fail(&self, count: usize) {
        self.hub.lock().unwrap().fail_count = count;
    }

    /// Delay every list response by `delay`.
    pub fn set_list_delay(&self, delay: std::time::Duration) {
        self.hub.lock().unwrap().list_delay = delay;
    }

    /// How many list calls were received, including failed ones.
    pub fn list_calls(&self) -> usize {
        self.hub.lock().unwrap().list_calls
    }

    /// Everything stored for `user`, newest first.
    pub fn stored(&self, user: &UserId) -> Vec<Notification> {
        self.hub.lock().unwrap().select(user, usize::MAX)
    }

    /// How many live channels are currently open for `user`.
    pub fn subscriber_count(&self, user: &UserId) -> usize {
        self.hub
            .lock()
            .unwrap()
            .subs
            .get(user)
            .map(|s| s.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Backend for MemBackend {
    fn list(
        &self,
        user: UserId,
        limit: usize,
    ) -> BoxFut<'_, NsResult<Vec<Notification>>> {
        Box::pin(async move {
            let delay = {
                let mut lock = self.hub.lock().unwrap();
                lock.list_calls += 1;
                lock.take_failure()?;
                lock.list_delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(self.hub.lock().unwrap().select(&user, limit))
        })
    }

    fn mark_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> BoxFut<'_, NsResult<()>> {
        Box::pin(async move {
            let mut lock = self.hub.lock().unwrap();
            lock.take_failure()?;
            let Some(n) = lock
                .data
                .iter_mut()
                .find(|n| n.user_id == user && n.id == id)
            else {
                return Err(NsError::other(format!(
                    "no notification {id} for user {user}"
                )));
            };
            if n.is_read {
                return Ok(());
            }
            n.is_read = true;
            let record = n.clone();
            lock.emit(LiveEvent::update(record));
            Ok(())
        })
    }

    fn mark_all_read(&self, user: UserId) -> BoxFut<'_, NsResult<()>> {
        Box::pin(async move {
            let mut lock = self.hub.lock().unwrap();
            lock.take_failure()?;
            let mut changed = Vec::new();
            for n in lock.data.iter_mut() {
                if n.user_id == user && !n.is_read {
                    n.is_read = true;
                    changed.push(n.clone());
                }
            }
            for record in changed {
                lock.emit(LiveEvent::update(record));
            }
            Ok(())
        })
    }
}

impl Live for MemBackend {
    fn subscribe(
        &self,
        user: UserId,
    ) -> BoxFut<'_, NsResult<LiveSubscription>> {
        Box::pin(async move {
            let (send, recv) = tokio::sync::mpsc::channel(self.channel_len);
            self.hub
                .lock()
                .unwrap()
                .subs
                .entry(user.clone())
                .or_default()
                .push(send);
            Ok(LiveSubscription::new(user, recv))
        })
    }
}

#[cfg(test)]
mod test;
