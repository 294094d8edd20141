//! Validation failures for `fhircast-core`.
//!
//! Failures are data, not control flow: a single inbound message yields zero
//! or many [`ValidationError`]s, which travel together in a
//! [`ValidationFailures`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single reason an inbound payload is not a valid FHIRcast message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
  /// The payload is not FHIRcast-shaped at all.
  #[error("not a FHIRcast message: {reason}")]
  MalformedEnvelope { reason: String },

  #[error("unknown event kind {kind:?}")]
  UnknownEventKind { kind: String },

  /// A `context` entry whose `key` is missing, unknown, or not permitted for
  /// the event kind.
  #[error("context[{index}]: {reason}")]
  InvalidContextEntry { index: usize, reason: String },

  #[error("{path}: required field is missing")]
  MissingRequiredField { path: String },

  #[error("{path}: expected {expected}, found {actual}")]
  TypeMismatch {
    path:     String,
    expected: String,
    actual:   String,
  },

  #[error("{path}: {value:?} is not a valid {format}")]
  InvalidFormat {
    path:   String,
    format: String,
    value:  String,
  },

  #[error("{path}: expected {expected:?}, found {actual:?}")]
  UnexpectedValue {
    path:     String,
    expected: String,
    actual:   String,
  },

  /// None of the alternative encodings of a field matched.
  #[error("{path}: does not match any form of {expected}")]
  NoVariantMatched { path: String, expected: String },
}

/// Coarse classification of a [`ValidationError`].
///
/// Keeps "not ours" (envelope) apart from "ours but broken" (discrimination
/// and field failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
  Envelope,
  Discrimination,
  Field,
}

impl ValidationError {
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::MalformedEnvelope { .. } => ErrorClass::Envelope,
      Self::UnknownEventKind { .. } | Self::InvalidContextEntry { .. } => {
        ErrorClass::Discrimination
      }
      Self::MissingRequiredField { .. }
      | Self::TypeMismatch { .. }
      | Self::InvalidFormat { .. }
      | Self::UnexpectedValue { .. }
      | Self::NoVariantMatched { .. } => ErrorClass::Field,
    }
  }

  /// The JSON path the failure refers to, if it has one.
  pub fn path(&self) -> Option<&str> {
    match self {
      Self::MissingRequiredField { path }
      | Self::TypeMismatch { path, .. }
      | Self::InvalidFormat { path, .. }
      | Self::UnexpectedValue { path, .. }
      | Self::NoVariantMatched { path, .. } => Some(path),
      _ => None,
    }
  }

  pub(crate) fn malformed(reason: impl Into<String>) -> Self {
    Self::MalformedEnvelope {
      reason: reason.into(),
    }
  }
}

/// The non-empty list of failures produced by one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationFailures(Vec<ValidationError>);

impl ValidationFailures {
  pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
    debug_assert!(!errors.is_empty());
    Self(errors)
  }

  pub(crate) fn single(error: ValidationError) -> Self { Self(vec![error]) }

  pub fn errors(&self) -> &[ValidationError] { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> { self.0.iter() }

  /// `true` when the payload was rejected as not being a FHIRcast message.
  pub fn is_envelope(&self) -> bool {
    self.0.iter().any(|e| e.class() == ErrorClass::Envelope)
  }

  /// Number of failures in the given class.
  pub fn count(&self, class: ErrorClass) -> usize {
    self.0.iter().filter(|e| e.class() == class).count()
  }

  pub fn into_inner(self) -> Vec<ValidationError> { self.0 }
}

impl fmt::Display for ValidationFailures {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} validation failure(s)", self.0.len())?;
    for error in &self.0 {
      write!(f, "\n  - {error}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationFailures {}

impl From<ValidationError> for ValidationFailures {
  fn from(error: ValidationError) -> Self { Self::single(error) }
}

impl<'a> IntoIterator for &'a ValidationFailures {
  type Item = &'a ValidationError;
  type IntoIter = std::slice::Iter<'a, ValidationError>;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

pub type Result<T, E = ValidationFailures> = std::result::Result<T, E>;
