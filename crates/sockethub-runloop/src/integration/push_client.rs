//! Sender side of the push transport.

use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

use crate::error::{RunLoopError, RunLoopResult};
use crate::integration::push_bridge::PushEndpoint;

/// Publishes payloads to a [`PushBridge`](crate::PushBridge).
pub struct PushClient {
    endpoint: PushEndpoint,
    framed: FramedWrite<TcpStream, LengthDelimitedCodec>,
}

impl PushClient {
    pub async fn connect(endpoint: &PushEndpoint) -> RunLoopResult<Self> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| RunLoopError::PushTransport(format!("connect to {}: {}", endpoint, e)))?;

        Ok(Self {
            endpoint: endpoint.clone(),
            framed: FramedWrite::new(stream, LengthDelimitedCodec::new()),
        })
    }

    pub fn endpoint(&self) -> &PushEndpoint {
        &self.endpoint
    }

    /// Send one payload as a single frame.
    pub async fn push(&mut self, payload: impl Into<Bytes>) -> RunLoopResult<()> {
        self.framed
            .send(payload.into())
            .await
            .map_err(|e| RunLoopError::PushTransport(format!("send to {}: {}", self.endpoint, e)))
    }

    /// Flush and close the connection.
    pub async fn close(mut self) -> RunLoopResult<()> {
        SinkExt::<Bytes>::close(&mut self.framed)
            .await
            .map_err(|e| RunLoopError::PushTransport(format!("close {}: {}", self.endpoint, e)))
    }
}
