//! Subscription sessions: one open event channel for one topic, and the
//! classification of everything that arrives on it.

use std::{fmt, sync::Arc};

use fhircast_core::{
  EventModel, FhirCastMessage, HubChannelScope, ValidationError,
  ValidationFailures,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::{error::TransportError, transport::Transport};

/// Lifecycle of a session.
///
/// `Connecting` and `Subscribed` are passed through inside
/// [`crate::HubClient::connect`]; a caller only ever holds an `Open` or
/// `Closed` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Connecting,
  Subscribed,
  Open,
  Closed,
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Connecting => "connecting",
      Self::Subscribed => "subscribed",
      Self::Open => "open",
      Self::Closed => "closed",
    })
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// What one inbound frame turned out to be.
#[derive(Debug, Clone)]
pub enum Inbound {
  /// The hub's bare `{"hub.topic": ...}` acknowledgement of the subscription.
  Confirmation { topic: String },
  Valid {
    message: Box<FhirCastMessage>,
    raw:     Value,
  },
  Invalid {
    failures: ValidationFailures,
    raw:      String,
  },
}

impl Inbound {
  pub fn scope(&self) -> Option<HubChannelScope> {
    match self {
      Self::Valid { message, .. } => Some(message.scope()),
      _ => None,
    }
  }
}

/// Classify one inbound text frame.
///
/// A JSON object with `hub.topic` at its top level is a subscription
/// confirmation and is never validated. Anything else goes through `model`.
pub fn classify(model: &EventModel, text: &str) -> Inbound {
  let raw: Value = match serde_json::from_str(text) {
    Ok(raw) => raw,
    Err(e) => {
      return Inbound::Invalid {
        failures: ValidationError::MalformedEnvelope {
          reason: format!("payload is not JSON: {e}"),
        }
        .into(),
        raw:      text.to_string(),
      };
    }
  };

  if let Some(topic) = raw.as_object().and_then(|map| map.get("hub.topic")) {
    let topic = match topic {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    return Inbound::Confirmation { topic };
  }

  match model.validate(&raw) {
    Ok(message) => Inbound::Valid {
      message: Box::new(message),
      raw,
    },
    Err(failures) => Inbound::Invalid {
      failures,
      raw: text.to_string(),
    },
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Notifications surfaced by [`SubscriptionSession::next_event`].
#[derive(Debug)]
pub enum SessionEvent {
  /// The channel is open. Emitted once, first.
  Connected { endpoint: Url },
  Message(Inbound),
  /// The channel closed; `error` is set when it failed rather than ended.
  /// Emitted once, last.
  Closed { error: Option<TransportError> },
}

/// An open subscription to one topic.
///
/// Owned by a single task; nothing is shared between sessions, so several
/// sessions for different topics can run side by side.
pub struct SubscriptionSession<T: Transport> {
  topic:           String,
  endpoint:        Url,
  state:           SessionState,
  transport:       T,
  model:           Arc<EventModel>,
  frames_received: u64,
  announced:       bool,
}

impl<T: Transport> SubscriptionSession<T> {
  /// Wrap an already-open transport.
  pub fn new(
    topic: impl Into<String>,
    endpoint: Url,
    transport: T,
    model: Arc<EventModel>,
  ) -> Self {
    let topic = topic.into();
    info!(%topic, %endpoint, state = %SessionState::Open, "session open");
    Self {
      topic,
      endpoint,
      state: SessionState::Open,
      transport,
      model,
      frames_received: 0,
      announced: false,
    }
  }

  pub fn topic(&self) -> &str { &self.topic }

  pub fn endpoint(&self) -> &Url { &self.endpoint }

  pub fn state(&self) -> SessionState { self.state }

  pub fn is_open(&self) -> bool { self.state == SessionState::Open }

  pub fn frames_received(&self) -> u64 { self.frames_received }

  /// Wait for the next notification. Returns `None` once the session is
  /// closed and its closing notification has been delivered.
  pub async fn next_event(&mut self) -> Option<SessionEvent> {
    if self.state == SessionState::Closed {
      return None;
    }
    if !self.announced {
      self.announced = true;
      return Some(SessionEvent::Connected {
        endpoint: self.endpoint.clone(),
      });
    }

    match self.transport.next_text().await {
      Some(Ok(text)) => {
        self.frames_received += 1;
        debug!(topic = %self.topic, frame = self.frames_received, bytes = text.len(), "frame received");
        let inbound = classify(&self.model, &text);
        match &inbound {
          Inbound::Confirmation { topic } => info!(%topic, "subscription confirmed"),
          Inbound::Valid { message, .. } => {
            debug!(scope = %message.scope(), id = %message.id, "valid event");
          }
          Inbound::Invalid { failures, .. } => {
            warn!(topic = %self.topic, failures = failures.len(), "invalid event");
          }
        }
        Some(SessionEvent::Message(inbound))
      }
      Some(Err(error)) => {
        warn!(topic = %self.topic, %error, "channel failed");
        self.state = SessionState::Closed;
        if let Err(e) = self.transport.close().await {
          debug!(error = %e, "close after failure");
        }
        Some(SessionEvent::Closed { error: Some(error) })
      }
      None => {
        info!(topic = %self.topic, "channel closed by hub");
        self.state = SessionState::Closed;
        Some(SessionEvent::Closed { error: None })
      }
    }
  }

  /// Close the session. Idempotent.
  pub async fn close(&mut self) {
    if self.state == SessionState::Closed {
      return;
    }
    self.state = SessionState::Closed;
    if let Err(e) = self.transport.close().await {
      debug!(error = %e, "closing channel");
    }
    info!(topic = %self.topic, frames = self.frames_received, "session closed");
  }
}
