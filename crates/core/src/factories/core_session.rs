//! The core session implementation provided by notisync.
//!
//! A session is one mounted notification view. Every mount (and every
//! [Session::retry] or user change) starts a new generation, which owns
//! a [CancellationToken] and a single task:
//!
//! - Subscribe to the live channel of the user. Failure to subscribe is
//!   logged and the session carries on without live updates.
//! - Run the [Fetcher]. Live events arriving meanwhile are buffered.
//! - Apply the fetched list, then replay the buffered events over it.
//! - Apply further live events as they arrive, in order.
//!
//! All state changes happen under the session lock, and only after
//! checking that the generation's token has not been cancelled. Ending a
//! generation cancels its token under that same lock, so a fetch result
//! or live event that arrives late can never touch the state.
//!
//! Mutations are confirmed by the backend before local state changes.

use crate::fetcher::*;
use notisync_api::*;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

mod list;

/// CoreSession configuration types.
pub mod config {
    /// Configuration parameters for [CoreSessionFactory](super::CoreSessionFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreSessionConfig {
        /// The most notifications a session keeps. Older entries are
        /// dropped as newer ones arrive. Default: 20.
        pub max_list_len: usize,

        /// How many live events may be buffered while the initial fetch
        /// is in flight. Events beyond this are dropped. Default: 1024.
        pub live_buffer_len: usize,
    }

    impl Default for CoreSessionConfig {
        fn default() -> Self {
            Self {
                max_list_len: notisync_api::MAX_LIST_LEN,
                live_buffer_len: 1024,
            }
        }
    }

    /// Module-level configuration for CoreSession.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreSessionModConfig {
        /// CoreSession configuration.
        pub core_session: CoreSessionConfig,
    }
}

pub use config::*;

/// The core session implementation provided by notisync.
#[derive(Debug)]
pub struct CoreSessionFactory {}

impl CoreSessionFactory {
    /// Construct a new CoreSessionFactory.
    pub fn create() -> DynSessionFactory {
        let out: DynSessionFactory = Arc::new(CoreSessionFactory {});
        out
    }
}

impl SessionFactory for CoreSessionFactory {
    fn default_config(&self, config: &mut Config) -> NsResult<()> {
        config.add_default_module_config(&CoreSessionModConfig::default())?;
        config.add_default_module_config(&CoreFetcherModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> NsResult<()> {
        let session: CoreSessionModConfig = config.get_module_config()?;
        if session.core_session.max_list_len == 0 {
            return Err(NsError::invalid_argument(
                "coreSession.maxListLen must be at least 1",
            ));
        }

        let fetcher: CoreFetcherModConfig = config.get_module_config()?;
        if fetcher.core_fetcher.list_limit == 0 {
            return Err(NsError::invalid_argument(
                "coreFetcher.listLimit must be at least 1",
            ));
        }

        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        backend: DynBackend,
        live: DynLive,
        cache: DynCache,
        user: Option<UserId>,
    ) -> BoxFut<'static, NsResult<DynSession>> {
        Box::pin(async move {
            let session: CoreSessionModConfig =
                builder.config.get_module_config()?;
            let fetcher: CoreFetcherModConfig =
                builder.config.get_module_config()?;
            let fetcher =
                Fetcher::new(fetcher.core_fetcher, backend.clone(), cache);
            let out: DynSession = Arc::new(CoreSession::new(
                session.core_session,
                fetcher,
                backend,
                live,
                user,
            ));
            Ok(out)
        })
    }
}

#[derive(Debug)]
struct Generation {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Generation {
    fn end(self) {
        self.token.cancel();
        self.task.abort();
    }
}

#[derive(Debug)]
struct State {
    user: Option<UserId>,
    generation: Option<Generation>,
    phase: Phase,
    list: Vec<Notification>,
    error: Option<NsError>,
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            notifications: self.list.as_slice().into(),
            error: self.error.clone(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: CoreSessionConfig,
    fetcher: Fetcher,
    backend: DynBackend,
    live: DynLive,
    runtime: tokio::runtime::Handle,
    state: Mutex<State>,
    watch_send: tokio::sync::watch::Sender<Snapshot>,
}

impl Inner {
    fn publish(&self, state: &State) {
        self.watch_send.send_replace(state.snapshot());
    }

    fn write_cache(&self, state: &State) {
        if let Some(user) = &state.user {
            self.fetcher.cache().set(user, state.list.as_slice().into());
        }
    }

    /// Run `f` against the state, unless the generation owning `token`
    /// has ended. Returns false if it had.
    fn apply<F>(&self, token: &CancellationToken, f: F) -> bool
    where
        F: FnOnce(&Self, &mut State),
    {
        let mut lock = self.state.lock().unwrap();
        if token.is_cancelled() {
            return false;
        }
        f(self, &mut *lock);
        self.publish(&lock);
        true
    }

    fn apply_event(&self, state: &mut State, event: LiveEvent) {
        tracing::debug!(kind = ?event.kind, id = %event.record.id, "applying live event");
        let changed = match event.kind {
            LiveEventKind::Insert => {
                list::insert(&mut state.list, event.record, self.config.max_list_len);
                true
            }
            LiveEventKind::Update => list::update(&mut state.list, event.record),
        };
        if changed {
            self.write_cache(state);
        }
    }

    /// End the current generation (if any) and, if there is a user,
    /// start a new one. Must be called with the state lock held.
    fn restart(self: &Arc<Self>, state: &mut State) {
        if let Some(generation) = state.generation.take() {
            generation.end();
        }

        let Some(user) = state.user.clone() else {
            state.phase = Phase::Idle;
            return;
        };

        state.phase = Phase::Loading;

        let token = CancellationToken::new();
        let task = self.runtime.spawn(generation_task(
            self.clone(),
            user,
            token.clone(),
        ));
        state.generation = Some(Generation { token, task });
    }

    fn current_token(&self) -> (Option<UserId>, Option<CancellationToken>) {
        let lock = self.state.lock().unwrap();
        (
            lock.user.clone(),
            lock.generation.as_ref().map(|g| g.token.clone()),
        )
    }
}

async fn next_event(sub: &mut Option<LiveSubscription>) -> Option<LiveEvent> {
    match sub {
        Some(sub) => sub.recv_event().await,
        None => std::future::pending().await,
    }
}

enum Step {
    Fetched(NsResult<Arc<[Notification]>>),
    Event(Option<LiveEvent>),
}

async fn generation_task(
    inner: Arc<Inner>,
    user: UserId,
    token: CancellationToken,
) {
    let mut sub = match inner.live.subscribe(user.clone()).await {
        Ok(sub) => Some(sub),
        Err(err) => {
            tracing::warn!(?err, %user, "live subscribe failed, continuing without live updates");
            None
        }
    };

    let mut buffered = Vec::new();
    let fetch = inner.fetcher.fetch(Some(&user), &token);
    tokio::pin!(fetch);

    let res = loop {
        let step = tokio::select! {
            res = &mut fetch => Step::Fetched(res),
            event = next_event(&mut sub) => Step::Event(event),
        };
        match step {
            Step::Fetched(res) => break res,
            Step::Event(Some(event)) => {
                if buffered.len() < inner.config.live_buffer_len {
                    buffered.push(event);
                } else {
                    tracing::warn!(%user, "live buffer full while loading, dropping event");
                }
            }
            Step::Event(None) => {
                tracing::warn!(%user, "live channel closed while loading");
                sub = None;
            }
        }
    };

    let data = match res {
        Ok(data) => data,
        Err(NsError::Cancelled) => return,
        Err(err) => {
            tracing::warn!(?err, %user, "could not load notifications");
            inner.apply(&token, |_, state| {
                state.phase = Phase::Errored;
                state.error = Some(err);
            });
            return;
        }
    };

    let applied = inner.apply(&token, |inner, state| {
        list::replace(&mut state.list, &data, inner.config.max_list_len);
        state.phase = Phase::Ready;
        state.error = None;
        for event in buffered.drain(..) {
            inner.apply_event(state, event);
        }
        inner.write_cache(state);
    });
    if !applied {
        return;
    }

    let Some(mut sub) = sub else {
        return;
    };

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            event = sub.recv_event() => match event {
                Some(event) => {
                    if !inner.apply(&token, |inner, state| inner.apply_event(state, event)) {
                        return;
                    }
                }
                None => {
                    tracing::warn!(%user, "live channel closed, updates paused until retry");
                    return;
                }
            },
        }
    }
}

#[derive(Debug)]
struct CoreSession {
    inner: Arc<Inner>,
}

impl Drop for CoreSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl CoreSession {
    fn new(
        config: CoreSessionConfig,
        fetcher: Fetcher,
        backend: DynBackend,
        live: DynLive,
        user: Option<UserId>,
    ) -> Self {
        let (watch_send, _) = tokio::sync::watch::channel(Snapshot::default());
        let inner = Arc::new(Inner {
            config,
            fetcher,
            backend,
            live,
            runtime: tokio::runtime::Handle::current(),
            state: Mutex::new(State {
                user: None,
                generation: None,
                phase: Phase::Idle,
                list: Vec::new(),
                error: None,
            }),
            watch_send,
        });
        let this = Self { inner };
        this.set_user(user);
        this
    }
}

impl Session for CoreSession {
    fn user(&self) -> Option<UserId> {
        self.inner.state.lock().unwrap().user.clone()
    }

    fn snapshot(&self) -> Snapshot {
        self.inner.watch_send.borrow().clone()
    }

    fn watch(&self) -> tokio::sync::watch::Receiver<Snapshot> {
        self.inner.watch_send.subscribe()
    }

    fn mark_as_read(&self, id: NotificationId) -> BoxFut<'_, NsResult<()>> {
        Box::pin(async move {
            let (user, token) = self.inner.current_token();
            let (Some(user), Some(token)) = (user, token) else {
                return Err(NsError::MissingUser);
            };

            self.inner
                .backend
                .mark_read(user.clone(), id)
                .await
                .map_err(|err| {
                    tracing::debug!(?err, %user, %id, "mark read rejected");
                    NsError::mutation(format!("mark notification {id} read"), err)
                })?;

            self.inner.apply(&token, |inner, state| {
                if list::mark_read(&mut state.list, id) {
                    inner.write_cache(state);
                }
            });

            Ok(())
        })
    }

    fn mark_all_as_read(&self) -> BoxFut<'_, NsResult<()>> {
        Box::pin(async move {
            let (user, token) = self.inner.current_token();
            let (Some(user), Some(token)) = (user, token) else {
                return Err(NsError::MissingUser);
            };

            self.inner
                .backend
                .mark_all_read(user.clone())
                .await
                .map_err(|err| {
                    tracing::debug!(?err, %user, "mark all read rejected");
                    NsError::mutation("mark all notifications read", err)
                })?;

            self.inner.apply(&token, |inner, state| {
                if list::mark_all_read(&mut state.list) {
                    inner.write_cache(state);
                }
            });

            Ok(())
        })
    }

    fn retry(&self) {
        let mut lock = self.inner.state.lock().unwrap();
        let Some(user) = lock.user.clone() else {
            return;
        };
        tracing::info!(%user, "retrying notification load");
        self.inner.fetcher.cache().invalidate(&user);
        self.inner.restart(&mut lock);
        self.inner.publish(&lock);
    }

    fn set_user(&self, user: Option<UserId>) {
        let mut lock = self.inner.state.lock().unwrap();
        if lock.user == user && (user.is_none() || lock.generation.is_some()) {
            return;
        }
        match &user {
            Some(user) => tracing::info!(%user, "mounting notification session"),
            None => tracing::info!("notification session has no user"),
        }
        lock.user = user;
        lock.list.clear();
        lock.error = None;
        self.inner.restart(&mut lock);
        self.inner.publish(&lock);
    }

    fn unmount(&self) {
        let mut lock = self.inner.state.lock().unwrap();
        if lock.user.is_none() && lock.generation.is_none() {
            return;
        }
        tracing::info!(user = ?lock.user, "unmounting notification session");
        lock.user = None;
        lock.list.clear();
        lock.error = None;
        self.inner.restart(&mut lock);
        self.inner.publish(&lock);
    }
}

#[cfg(test)]
mod test;
