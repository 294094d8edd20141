//! The HTTP side of a subscription: the form a hub expects and the channel
//! endpoint it answers with.

use fhircast_core::HubChannelScope;
use serde_json::Value;
use url::Url;

use crate::error::HandshakeError;

/// Channel type requested in every subscription.
pub const CHANNEL_TYPE: &str = "websocket";

/// Response field naming the WebSocket endpoint.
pub const ENDPOINT_FIELD: &str = "hub.channel.endpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Subscribe,
  Unsubscribe,
}

impl Mode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Subscribe => "subscribe",
      Self::Unsubscribe => "unsubscribe",
    }
  }
}

/// A subscription (or unsubscription) request for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
  pub mode:   Mode,
  pub topic:  String,
  pub events: Vec<HubChannelScope>,
}

impl SubscriptionRequest {
  /// Subscribe to every known event kind on `topic`.
  pub fn subscribe(topic: impl Into<String>) -> Self {
    Self {
      mode:   Mode::Subscribe,
      topic:  topic.into(),
      events: HubChannelScope::all().collect(),
    }
  }

  pub fn unsubscribe(topic: impl Into<String>) -> Self {
    Self {
      mode: Mode::Unsubscribe,
      ..Self::subscribe(topic)
    }
  }

  /// Form fields, in the order they are sent.
  pub fn form(&self) -> [(&'static str, String); 4] {
    [
      ("hub.channel.type", CHANNEL_TYPE.to_string()),
      ("hub.mode", self.mode.as_str().to_string()),
      ("hub.topic", self.topic.clone()),
      ("hub.events", HubChannelScope::joined(&self.events)),
    ]
  }
}

/// Extract the channel endpoint from a subscription response body.
pub fn channel_endpoint(body: &Value) -> Result<Url, HandshakeError> {
  let raw = match body.get(ENDPOINT_FIELD) {
    Some(Value::String(raw)) => raw,
    Some(_) => {
      return Err(HandshakeError::MalformedResponse(format!(
        "`{ENDPOINT_FIELD}` is not a string"
      )));
    }
    None => {
      return Err(HandshakeError::MalformedResponse(format!(
        "response has no `{ENDPOINT_FIELD}`"
      )));
    }
  };
  Url::parse(raw).map_err(|e| HandshakeError::InvalidEndpoint {
    endpoint: raw.clone(),
    reason:   e.to_string(),
  })
}
