//! Error types for `fhircast-client`.
//!
//! Handshake and transport failures are kept apart: "the hub rejected us or
//! could not be reached" and "the connection dropped" have different causes
//! and different remedies.

use std::time::Duration;

use fhircast_core::ValidationFailures;
use reqwest::StatusCode;
use thiserror::Error;

/// The subscription POST failed or produced no usable endpoint.
#[derive(Debug, Error)]
pub enum HandshakeError {
  #[error("hub unreachable: {0}")]
  Unreachable(#[source] reqwest::Error),

  #[error("hub rejected the request with {status}")]
  Rejected { status: StatusCode },

  #[error("malformed hub response: {0}")]
  MalformedResponse(String),

  #[error("hub returned an invalid channel endpoint {endpoint:?}: {reason}")]
  InvalidEndpoint { endpoint: String, reason: String },
}

/// The event channel never opened, or failed after opening.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("could not connect to {endpoint}: {reason}")]
  Connect { endpoint: String, reason: String },

  #[error("channel did not open within {0:?}")]
  OpenTimeout(Duration),

  #[error("channel error: {0}")]
  Protocol(String),
}

/// Why [`crate::HubClient::connect`] produced no session.
#[derive(Debug, Error)]
pub enum ConnectError {
  #[error("subscription handshake failed: {0}")]
  Handshake(#[from] HandshakeError),

  #[error("event channel failed: {0}")]
  Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("refusing to publish an invalid event: {0}")]
  Invalid(#[from] ValidationFailures),

  #[error("hub unreachable: {0}")]
  Unreachable(#[source] reqwest::Error),

  #[error("hub rejected the event with {status}")]
  Rejected { status: StatusCode },
}
