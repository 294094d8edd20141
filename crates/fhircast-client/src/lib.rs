//! FHIRcast hub client.
//!
//! Negotiates subscriptions over HTTP, receives events over a WebSocket
//! channel, and classifies every inbound frame with the
//! [`fhircast_core::EventModel`]. Publishing and unsubscribing are one-shot
//! HTTP calls on the same [`HubClient`].
//!
//! No retries: handshake and channel failures are returned to the caller,
//! which decides whether to call [`HubClient::connect`] again.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use fhircast_client::{HubClient, HubConfig, Inbound, SessionEvent};
//!
//! let client = HubClient::new(HubConfig::default())?;
//! let mut session = client.connect("test").await?;
//! while let Some(event) = session.next_event().await {
//!   if let SessionEvent::Message(Inbound::Valid { message, .. }) = event {
//!     println!("{}", message.scope());
//!   }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod handshake;
pub mod session;
pub mod transport;

pub use client::{DEFAULT_HUB_URL, HubClient, HubConfig};
pub use error::{ConnectError, HandshakeError, PublishError, TransportError};
pub use session::{
  Inbound, SessionEvent, SessionState, SubscriptionSession, classify,
};
pub use transport::{Connector, Transport, WebSocketConnector};
