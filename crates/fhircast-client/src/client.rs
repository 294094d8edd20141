//! Async HTTP client for a FHIRcast hub.

use std::{sync::Arc, time::Duration};

use fhircast_core::{EventModel, FhirCastMessage};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::{
  error::{ConnectError, HandshakeError, PublishError, TransportError},
  handshake::{SubscriptionRequest, channel_endpoint},
  session::{SessionState, SubscriptionSession},
  transport::{Connector, WebSocketConnector, WebSocketTransport},
};

/// Default hub base URL.
pub const DEFAULT_HUB_URL: &str = "http://localhost:8103/fhircast/STU2";

/// Connection settings for a hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
  pub hub_url:         String,
  /// Applies to each HTTP request (handshake, publish).
  pub request_timeout: Duration,
  /// How long to wait for the event channel to open after a successful
  /// handshake.
  pub open_timeout:    Duration,
}

impl Default for HubConfig {
  fn default() -> Self {
    Self {
      hub_url:         DEFAULT_HUB_URL.to_string(),
      request_timeout: Duration::from_secs(30),
      open_timeout:    Duration::from_secs(5),
    }
  }
}

/// Client for one hub: subscription handshakes, sessions, and publishing.
///
/// Cheap to clone. The inner [`reqwest::Client`] and [`EventModel`] are
/// `Arc`-based.
#[derive(Clone)]
pub struct HubClient {
  client: Client,
  config: HubConfig,
  model:  Arc<EventModel>,
}

impl HubClient {
  pub fn new(config: HubConfig) -> Result<Self, reqwest::Error> {
    Self::with_model(config, Arc::new(EventModel::new()))
  }

  /// Share an existing event model instead of building a new one.
  pub fn with_model(
    config: HubConfig,
    model: Arc<EventModel>,
  ) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(config.request_timeout).build()?;
    Ok(Self {
      client,
      config,
      model,
    })
  }

  pub fn config(&self) -> &HubConfig { &self.config }

  pub fn model(&self) -> &Arc<EventModel> { &self.model }

  fn topic_url(&self, topic: &str) -> String {
    format!("{}/{}", self.config.hub_url.trim_end_matches('/'), topic)
  }

  async fn post_form(
    &self,
    request: &SubscriptionRequest,
  ) -> Result<Response, HandshakeError> {
    let resp = self
      .client
      .post(&self.config.hub_url)
      .form(&request.form())
      .send()
      .await
      .map_err(HandshakeError::Unreachable)?;

    if !resp.status().is_success() {
      return Err(HandshakeError::Rejected {
        status: resp.status(),
      });
    }
    Ok(resp)
  }

  // ── Handshake ─────────────────────────────────────────────────────────────

  /// `POST {hub}` with `hub.mode=subscribe`; returns the channel endpoint.
  pub async fn subscribe(&self, topic: &str) -> Result<Url, HandshakeError> {
    let request = SubscriptionRequest::subscribe(topic);
    let resp = self.post_form(&request).await?;
    let body: Value = resp
      .json()
      .await
      .map_err(|e| HandshakeError::MalformedResponse(e.to_string()))?;
    channel_endpoint(&body)
  }

  /// `POST {hub}` with `hub.mode=unsubscribe`. The response body is ignored.
  pub async fn unsubscribe(&self, topic: &str) -> Result<(), HandshakeError> {
    self
      .post_form(&SubscriptionRequest::unsubscribe(topic))
      .await?;
    info!(%topic, "unsubscribed");
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  /// Subscribe to `topic` and open its WebSocket channel.
  pub async fn connect(
    &self,
    topic: &str,
  ) -> Result<SubscriptionSession<WebSocketTransport>, ConnectError> {
    self.connect_with(&WebSocketConnector, topic).await
  }

  /// Subscribe to `topic` and open the channel with `connector`.
  ///
  /// Fails without a session if the handshake fails or the channel does not
  /// open within [`HubConfig::open_timeout`].
  pub async fn connect_with<C: Connector>(
    &self,
    connector: &C,
    topic: &str,
  ) -> Result<SubscriptionSession<C::Transport>, ConnectError> {
    debug!(%topic, hub = %self.config.hub_url, state = %SessionState::Connecting, "subscribing");
    let endpoint = self.subscribe(topic).await?;
    info!(%topic, %endpoint, state = %SessionState::Subscribed, "subscription accepted");

    let timeout = self.config.open_timeout;
    let transport = tokio::time::timeout(timeout, connector.open(&endpoint))
      .await
      .map_err(|_| TransportError::OpenTimeout(timeout))??;

    Ok(SubscriptionSession::new(
      topic,
      endpoint,
      transport,
      Arc::clone(&self.model),
    ))
  }

  // ── Publishing ────────────────────────────────────────────────────────────

  /// `POST {hub}/{topic}` with the message as JSON.
  ///
  /// The message is validated first; an invalid message is never sent.
  pub async fn publish(
    &self,
    topic: &str,
    message: &FhirCastMessage,
  ) -> Result<(), PublishError> {
    self.model.validate_message(message)?;

    let resp = self
      .client
      .post(self.topic_url(topic))
      .json(message)
      .send()
      .await
      .map_err(PublishError::Unreachable)?;

    if !resp.status().is_success() {
      return Err(PublishError::Rejected {
        status: resp.status(),
      });
    }
    info!(%topic, scope = %message.scope(), id = %message.id, "published");
    Ok(())
  }
}
