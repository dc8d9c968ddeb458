//! WebSocket listener.
//!
//! Socket I/O runs on tokio tasks; every pipeline callback is posted to the
//! RunLoop with `perform`, so application code is single-threaded.
//!
//! ```text
//! socket reader ──perform──▶ RunLoop ──pipeline──▶ application
//!                                            │
//! socket writer ◀──── Outbound queue ◀───────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use sockethub_runloop::RunLoop;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connection::{Connection, ConnectionSender, Handshake, Outbound};
use crate::error::PipelineError;
use crate::pipeline::{ConnectionHandler, Message};

#[derive(Clone)]
pub struct ListenerState {
    run_loop: Arc<RunLoop>,
    pipeline: Arc<dyn ConnectionHandler>,
}

impl ListenerState {
    pub fn new(run_loop: Arc<RunLoop>, pipeline: Arc<dyn ConnectionHandler>) -> Self {
        Self { run_loop, pipeline }
    }
}

/// Router serving the WebSocket endpoint at `path`.
pub fn router(state: ListenerState, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<ListenerState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let handshake = Handshake::new(remote_addr, uri.path(), headers);

    let (tx, rx) = oneshot::channel();
    let pipeline = state.pipeline.clone();
    let request = handshake.clone();
    state.run_loop.perform(move || {
        let _ = tx.send(pipeline.on_handshake(&request));
    });

    match rx.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            debug!(remote_addr = %remote_addr, "Handshake refused: {}", err);
            return (err.http_status(), err.to_string()).into_response();
        }
        Err(_) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }

    ws.on_upgrade(move |socket| serve_socket(socket, handshake, state))
}

async fn serve_socket(socket: WebSocket, handshake: Handshake, state: ListenerState) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();

    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    let close = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = ws_tx.send(WsMessage::Close(Some(close))).await;
                    break;
                }
            }
        }
    });

    let conn = Arc::new(Mutex::new(Connection::new(
        handshake,
        ConnectionSender::new(conn_id.clone(), out_tx),
    )));
    debug!(conn_id = %conn_id, "WebSocket connection accepted");

    post(&state, &conn, |pipeline, conn| pipeline.on_open(conn));

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(WsMessage::Text(text)) => Message::Text(text.as_str().to_owned()),
            Ok(WsMessage::Binary(data)) => Message::Binary(data),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(conn_id = %conn_id, "WebSocket read error: {}", e);
                break;
            }
        };
        post(&state, &conn, move |pipeline, conn| pipeline.on_message(conn, message));
    }

    let pipeline = state.pipeline.clone();
    state.run_loop.perform(move || {
        let mut conn = conn.lock();
        pipeline.on_close(&mut conn);
        conn.close(1000, "closed");
    });
}

/// Run a pipeline callback for `conn` on the RunLoop.
fn post<F>(state: &ListenerState, conn: &Arc<Mutex<Connection>>, callback: F)
where
    F: FnOnce(&dyn ConnectionHandler, &mut Connection) -> Result<(), PipelineError> + Send + 'static,
{
    let pipeline = state.pipeline.clone();
    let conn = conn.clone();
    state.run_loop.perform(move || {
        let mut conn = conn.lock();
        if conn.is_closed() {
            return;
        }
        if let Err(err) = callback(pipeline.as_ref(), &mut conn) {
            handle_error(pipeline.as_ref(), &mut conn, err);
        }
    });
}

fn handle_error(pipeline: &dyn ConnectionHandler, conn: &mut Connection, err: PipelineError) {
    warn!(conn_id = conn.id(), "{}", err);
    pipeline.on_error(conn, &err);
    if err.is_fatal() {
        conn.close(err.close_code(), err.to_string());
    }
}
