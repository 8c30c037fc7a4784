//! An in-process http server speaking the backend REST api.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use notisync_api::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SrvState {
    halt: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
    data: Arc<Mutex<Vec<Notification>>>,
}

#[derive(serde::Deserialize)]
struct ListQuery {
    limit: usize,
}

/// A backend test server. Shuts down on drop.
pub struct TestBackendSrv {
    kill: Option<tokio::sync::oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
    state: SrvState,
    addr: String,
}

impl Drop for TestBackendSrv {
    fn drop(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        self.task.abort();
    }
}

impl TestBackendSrv {
    /// Bind to an ephemeral localhost port and start serving.
    pub async fn new() -> Self {
        let (kill, kill_r) = tokio::sync::oneshot::channel();
        let kill_r = async move {
            let _ = kill_r.await;
        };

        let l = tokio::net::TcpListener::bind(std::net::SocketAddr::from((
            [127, 0, 0, 1],
            0,
        )))
        .await
        .unwrap();
        let addr = format!("http://{:?}", l.local_addr().unwrap());

        let state = SrvState::default();

        let app: Router = Router::new()
            .route("/users/:user/notifications", get(list))
            .route("/users/:user/notifications/read-all", post(mark_all_read))
            .route("/users/:user/notifications/:id/read", post(mark_read))
            .with_state(state.clone());

        let task = tokio::task::spawn(std::future::IntoFuture::into_future(
            axum::serve(l, app).with_graceful_shutdown(kill_r),
        ));

        Self {
            kill: Some(kill),
            task,
            state,
            addr,
        }
    }

    /// The base url, e.g. `http://127.0.0.1:1234`.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// While halted, every request fails with a 500.
    pub fn set_halt(&self, halt: bool) {
        self.state.halt.store(halt, Ordering::SeqCst);
    }

    /// Store a notification server-side.
    pub fn insert(&self, notification: Notification) {
        self.state.data.lock().unwrap().push(notification);
    }

    /// Everything stored for `user`, newest first.
    pub fn stored(&self, user: &str) -> Vec<Notification> {
        select(&self.state.data.lock().unwrap(), user, usize::MAX)
    }

    /// How many list requests have been received, including failed ones.
    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }
}

fn select(data: &[Notification], user: &str, limit: usize) -> Vec<Notification> {
    let mut out: Vec<Notification> = data
        .iter()
        .filter(|n| &*n.user_id == user)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out.truncate(limit);
    out
}

fn check_halt(state: &SrvState) -> Result<(), StatusCode> {
    if state.halt.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(())
}

async fn list(
    State(state): State<SrvState>,
    Path(user): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, StatusCode> {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    check_halt(&state)?;
    let out = select(&state.data.lock().unwrap(), &user, query.limit);
    Ok(Json(out))
}

async fn mark_read(
    State(state): State<SrvState>,
    Path((user, id)): Path<(String, i64)>,
) -> Result<(), StatusCode> {
    check_halt(&state)?;
    let mut lock = state.data.lock().unwrap();
    match lock
        .iter_mut()
        .find(|n| &*n.user_id == user && n.id == NotificationId(id))
    {
        Some(n) => {
            n.is_read = true;
            Ok(())
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn mark_all_read(
    State(state): State<SrvState>,
    Path(user): Path<String>,
) -> Result<(), StatusCode> {
    check_halt(&state)?;
    for n in state.data.lock().unwrap().iter_mut() {
        if &*n.user_id == user {
            n.is_read = true;
        }
    }
    Ok(())
}
