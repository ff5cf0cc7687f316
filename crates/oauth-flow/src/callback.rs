//! Local authorization-callback receiver
//!
//! Binds a short-lived listener on the configured redirect address and
//! captures exactly one redirect from the authorization server. The accept
//! loop and a deadline watcher run as separate tasks; whichever reaches an
//! outcome first wins a single-slot result channel, the listener is shut
//! down, and the port is released before the caller sees the result.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, oneshot};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::state::state_matches;

/// Query parameters the authorization server may send on the redirect.
/// Anything else in the query string is ignored.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Single-slot result channel. The sender is taken out before use, so at
/// most one outcome is ever delivered per listener run.
type ResultSlot = Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>;

#[derive(Clone)]
struct ListenerState {
    expected_state: String,
    slot: ResultSlot,
    completed: Arc<Notify>,
}

/// Wait for the authorization server to redirect back with a code.
///
/// The listener binds the host and port named in `redirect_addr` and serves
/// until the first terminal outcome: a result derived from a callback
/// request, [`Error::Timeout`] once `deadline` elapses, or [`Error::Server`]
/// if the accept loop aborts. The port is released on every exit path
/// before this returns.
pub async fn await_code(
    expected_state: &str,
    redirect_addr: &str,
    deadline: Duration,
) -> Result<String> {
    let url = Url::parse(redirect_addr)
        .map_err(|e| Error::Config(format!("invalid redirect address {redirect_addr}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config(format!("redirect address {redirect_addr} has no host")))?;
    let port = url.port().ok_or_else(|| {
        Error::Config(format!("redirect address {redirect_addr} has no explicit port"))
    })?;

    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| Error::Bind(format!("{host}:{port}: {e}")))?;
    debug!(host, port, "callback listener bound");

    run_listener(listener, expected_state, deadline).await
}

/// Serve an already-bound listener until the first terminal outcome.
async fn run_listener(
    listener: TcpListener,
    expected_state: &str,
    deadline: Duration,
) -> Result<String> {
    let (result_tx, result_rx) = oneshot::channel::<Result<String>>();
    let slot: ResultSlot = Arc::new(Mutex::new(Some(result_tx)));
    let completed = Arc::new(Notify::new());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .fallback(handle_callback)
        .with_state(ListenerState {
            expected_state: expected_state.to_string(),
            slot: slot.clone(),
            completed: completed.clone(),
        });

    // Accept loop. An accept failure is itself a terminal outcome; a
    // graceful shutdown is not.
    let server = tokio::spawn({
        let slot = slot.clone();
        let completed = completed.clone();
        async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                deliver(&slot, Err(Error::Server(format!("accept loop failed: {e}")))).await;
                completed.notify_one();
            }
        }
    });

    // Deadline watcher. Tears the accept loop down once an outcome exists
    // or the deadline passes, whichever comes first.
    let watcher = tokio::spawn(async move {
        tokio::select! {
            _ = completed.notified() => {}
            _ = tokio::time::sleep(deadline) => {
                debug!("callback deadline elapsed");
                deliver(&slot, Err(Error::Timeout)).await;
            }
        }
        let _ = shutdown_tx.send(());
    });

    let outcome = match result_rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::Server(
            "listener exited without delivering an outcome".to_string(),
        )),
    };

    // Join both tasks so the port is free before the caller proceeds.
    let _ = watcher.await;
    let _ = server.await;

    outcome
}

/// Put an outcome in the slot unless one is already delivered.
async fn deliver(slot: &ResultSlot, outcome: Result<String>) {
    if let Some(tx) = slot.lock().await.take() {
        let _ = tx.send(outcome);
    }
}

/// Evaluate one redirect request.
///
/// The order is part of the contract: the state check runs first, then an
/// explicit provider error, then the code; a request with neither is
/// malformed. The body is for the human in the browser tab; the outcome
/// goes into the slot.
async fn handle_callback(
    State(listener): State<ListenerState>,
    Query(params): Query<CallbackParams>,
) -> String {
    let Some(tx) = listener.slot.lock().await.take() else {
        // A request racing the teardown. The first outcome stands and this
        // one is not evaluated at all.
        return "callback already received".to_string();
    };

    let received = params.state.as_deref().unwrap_or_default();
    let (outcome, body) = if !state_matches(&listener.expected_state, received) {
        (Err(Error::StateMismatch), "invalid state".to_string())
    } else if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        (
            Err(Error::Authorization {
                code: error,
                description: description.clone(),
            }),
            description,
        )
    } else if let Some(code) = params.code {
        debug!("authorization code received on callback");
        (Ok(code), "Code retrieved. You can close this window.".to_string())
    } else {
        (
            Err(Error::MalformedCallback),
            "no error or code returned".to_string(),
        )
    };

    let _ = tx.send(outcome);
    listener.completed.notify_one();
    body
}
