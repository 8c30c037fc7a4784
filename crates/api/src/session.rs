//! Session related types.
//!
//! A session is one mounted view of a user's notifications. It owns its
//! own in-memory list, keeps it in sync through the live channel, and
//! exposes the read-flag mutations.

use crate::*;
use std::sync::Arc;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No user is available. Nothing is loaded or subscribed.
    Idle,

    /// A fetch is in flight for the current user.
    Loading,

    /// Data is present and the live channel is attached.
    Ready,

    /// The fetch gave up after exhausting its retries.
    Errored,
}

/// A point-in-time view of a session, cheap to clone.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The lifecycle phase.
    pub phase: Phase,

    /// The current list, newest first.
    pub notifications: Arc<[Notification]>,

    /// The last fetch error. Cleared by a successful fetch.
    pub error: Option<NsError>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            notifications: Arc::new([]),
            error: None,
        }
    }
}

impl Snapshot {
    /// Count of notifications with `is_read == false`.
    ///
    /// Recomputed on every call.
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// True while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

/// The surface a UI consumes for one mounted notification view.
pub trait Session: 'static + Send + Sync + std::fmt::Debug {
    /// The user this session is currently mounted for.
    fn user(&self) -> Option<UserId>;

    /// Get the current state.
    fn snapshot(&self) -> Snapshot;

    /// Get a receiver that is notified whenever the state changes.
    fn watch(&self) -> tokio::sync::watch::Receiver<Snapshot>;

    /// Mark a single notification as read.
    ///
    /// Local state only changes after the backend confirms the write.
    fn mark_as_read(&self, id: NotificationId) -> BoxFut<'_, NsResult<()>>;

    /// Mark every notification of the current user as read.
    ///
    /// Local state only changes after the backend confirms the write.
    fn mark_all_as_read(&self) -> BoxFut<'_, NsResult<()>>;

    /// Drop the cached list and fetch again.
    fn retry(&self);

    /// Switch to a different user, or to none. Equivalent to unmounting
    /// and mounting again.
    fn set_user(&self, user: Option<UserId>);

    /// Tear down the live channel and cancel any in-flight fetch.
    /// Nothing will mutate this session's state afterwards.
    fn unmount(&self);

    /// The current list, newest first.
    fn notifications(&self) -> Arc<[Notification]> {
        self.snapshot().notifications
    }

    /// Count of unread notifications.
    fn unread_count(&self) -> usize {
        self.snapshot().unread_count()
    }

    /// True while a fetch is in flight.
    fn is_loading(&self) -> bool {
        self.snapshot().is_loading()
    }

    /// The last fetch error, if any.
    fn error(&self) -> Option<NsError> {
        self.snapshot().error
    }

    /// The lifecycle phase.
    fn phase(&self) -> Phase {
        self.snapshot().phase
    }
}

/// Trait-object [Session].
pub type DynSession = Arc<dyn Session>;

/// A factory for constructing [Session] instances.
pub trait SessionFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut Config) -> NsResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &Config) -> NsResult<()>;

    /// Mount a session for `user`. A `None` user starts it idle.
    fn create(
        &self,
        builder: Arc<Builder>,
        backend: DynBackend,
        live: DynLive,
        cache: DynCache,
        user: Option<UserId>,
    ) -> BoxFut<'static, NsResult<DynSession>>;
}

/// Trait-object [SessionFactory].
pub type DynSessionFactory = Arc<dyn SessionFactory>;
