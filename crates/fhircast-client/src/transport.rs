//! The event channel seam.
//!
//! [`Connector`] opens a channel for an endpoint URL and [`Transport`] yields
//! its inbound text frames. Sessions depend on these traits, not on
//! WebSockets, so tests can drive a session from a scripted transport.

use std::future::Future;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
  MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// An open event channel.
pub trait Transport: Send {
  /// The next inbound text frame. `None` once the remote end has closed.
  fn next_text(
    &mut self,
  ) -> impl Future<Output = Option<Result<String, TransportError>>> + Send + '_;

  /// Close the channel. Closing an already-closed channel is not an error the
  /// caller needs to act on.
  fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send + '_;
}

/// Opens event channels.
pub trait Connector: Send + Sync {
  type Transport: Transport;

  fn open(
    &self,
    endpoint: &Url,
  ) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}

// ─── WebSocket ───────────────────────────────────────────────────────────────

/// Opens WebSocket channels with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
  type Transport = WebSocketTransport;

  async fn open(&self, endpoint: &Url) -> Result<WebSocketTransport, TransportError> {
    let (stream, response) =
      connect_async(endpoint.as_str())
        .await
        .map_err(|e| TransportError::Connect {
          endpoint: endpoint.to_string(),
          reason:   e.to_string(),
        })?;
    debug!(status = ?response.status(), %endpoint, "websocket handshake complete");
    Ok(WebSocketTransport { stream })
  }
}

/// A WebSocket event channel.
///
/// Binary frames holding UTF-8 are treated as text. Ping and pong frames are
/// answered by the protocol layer and never surface.
pub struct WebSocketTransport {
  stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Transport for WebSocketTransport {
  async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
    loop {
      let message = match self.stream.next().await? {
        Ok(message) => message,
        Err(e) => return Some(Err(TransportError::Protocol(e.to_string()))),
      };
      match message {
        Message::Text(text) => return Some(Ok(text)),
        Message::Binary(bytes) => match String::from_utf8(bytes) {
          Ok(text) => return Some(Ok(text)),
          Err(_) => debug!("skipping non-UTF-8 binary frame"),
        },
        Message::Close(frame) => {
          debug!(?frame, "channel closed by hub");
          return None;
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
      }
    }
  }

  async fn close(&mut self) -> Result<(), TransportError> {
    self
      .stream
      .close(None)
      .await
      .map_err(|e| TransportError::Protocol(e.to_string()))
  }
}
