//! Push transport bridge.
//!
//! Out-of-band publishers connect over TCP and send length-delimited frames
//! (4-byte big-endian length, then the payload). Each frame is delivered
//! unmodified to a [`PushHandler`] on the RunLoop, through a Source1.
//!
//! ```text
//! publisher ──TCP frames──▶ accept/read tasks ──PortMessage──▶ Source1 ──▶ PushHandler::on_push
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RunLoopError, RunLoopResult};
use crate::run_loop::RunLoop;
use crate::source::{PortMessage, Source1, Source1Receiver};

/// Host and port of a push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEndpoint {
    pub host: String,
    pub port: u16,
}

impl PushEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PushEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Configured push transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PushTransport {
    /// No bridge is created.
    #[default]
    Null,
    /// Length-delimited frames over TCP.
    Tcp(PushEndpoint),
}

impl PushTransport {
    /// Endpoint to bind, if any.
    pub fn endpoint(&self) -> Option<&PushEndpoint> {
        match self {
            PushTransport::Null => None,
            PushTransport::Tcp(endpoint) => Some(endpoint),
        }
    }
}

/// Receiver of pushed payloads. Called on the RunLoop.
pub trait PushHandler: Send + Sync {
    fn on_push(&self, payload: Bytes);
}

/// Source1 bound to a push transport endpoint.
pub struct PushBridge {
    id: String,
    local_addr: SocketAddr,
    handler: Arc<dyn PushHandler>,
    cancel: CancellationToken,
    cancelled: AtomicBool,
}

impl PushBridge {
    /// Bind the endpoint and register the bridge on the RunLoop.
    ///
    /// Binding failures are returned as [`RunLoopError::PushBind`].
    pub async fn bind(
        endpoint: &PushEndpoint,
        handler: Arc<dyn PushHandler>,
        run_loop: &RunLoop,
    ) -> RunLoopResult<Arc<Self>> {
        let listener = TcpListener::bind((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|source| RunLoopError::PushBind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(run_loop.config().source1_capacity.max(1));
        let bridge = Arc::new(Self {
            id: format!("push:{}", local_addr),
            local_addr,
            handler,
            cancel: CancellationToken::new(),
            cancelled: AtomicBool::new(false),
        });

        run_loop.add_source1(Source1Receiver::new(bridge.clone(), rx));
        tokio::spawn(accept_loop(
            listener,
            tx,
            bridge.cancel.clone(),
            bridge.id.clone(),
        ));

        info!("Push bridge bound on {}", local_addr);
        Ok(bridge)
    }

    /// Address the bridge actually listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and reading frames.
    pub fn shutdown(&self) {
        self.cancel();
    }
}

impl Source1 for PushBridge {
    fn id(&self) -> &str {
        &self.id
    }

    fn handle(&self, msg: PortMessage) -> RunLoopResult<()> {
        debug!("Push bridge received {} bytes", msg.payload.len());
        self.handler.on_push(msg.payload);
        Ok(())
    }

    fn is_valid(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<PortMessage>,
    cancel: CancellationToken,
    source_id: String,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Push publisher connected from {}", peer);
                    tokio::spawn(read_frames(
                        stream,
                        peer,
                        tx.clone(),
                        cancel.clone(),
                        source_id.clone(),
                    ));
                }
                Err(e) => warn!("Push transport accept error: {}", e),
            },
        }
    }
    debug!("Push bridge {} stopped accepting", source_id);
}

async fn read_frames(
    stream: TcpStream,
    peer: SocketAddr,
    tx: mpsc::Sender<PortMessage>,
    cancel: CancellationToken,
    source_id: String,
) {
    let mut frames = FramedRead::new(stream, LengthDelimitedCodec::new());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.next() => match frame {
                Some(Ok(frame)) => {
                    if tx.send(PortMessage::new(source_id.as_str(), frame.freeze())).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!("Push publisher {} sent an invalid frame: {}", peer, e);
                    break;
                }
                None => break,
            },
        }
    }
    debug!("Push publisher {} disconnected", peer);
}

#[cfg(test)]
#[path = "push_bridge_tests.rs"]
mod tests;
