//! FHIRcast events and the message envelope.
//!
//! Wire keys containing dots (`hub.event`, `hub.topic`, `context.versionId`)
//! are literal field names, not nested paths.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{resource::ResourceFragment, scope::HubChannelScope};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientOpen {
  #[serde(rename = "hub.topic")]
  pub topic:   String,
  pub context: Vec<ResourceFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingStudyOpen {
  #[serde(rename = "hub.topic")]
  pub topic:   String,
  pub context: Vec<ResourceFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReportOpen {
  #[serde(rename = "hub.topic")]
  pub topic:      String,
  #[serde(rename = "context.versionId")]
  pub version_id: String,
  pub context:    Vec<ResourceFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReportOpened {
  #[serde(rename = "hub.topic")]
  pub topic:   String,
  pub context: Vec<ResourceFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReportUpdate {
  #[serde(rename = "hub.topic")]
  pub topic:   String,
  pub context: Vec<ResourceFragment>,
}

/// A FHIRcast event, discriminated by `hub.event`.
///
/// The variant renames must match [`HubChannelScope::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hub.event")]
pub enum HubEvent {
  #[serde(rename = "Patient-open")]
  PatientOpen(PatientOpen),
  #[serde(rename = "ImagingStudy-open")]
  ImagingStudyOpen(ImagingStudyOpen),
  #[serde(rename = "DiagnosticReport-open")]
  DiagnosticReportOpen(DiagnosticReportOpen),
  #[serde(rename = "DiagnosticReport-opened")]
  DiagnosticReportOpened(DiagnosticReportOpened),
  #[serde(rename = "DiagnosticReport-update")]
  DiagnosticReportUpdate(DiagnosticReportUpdate),
}

impl HubEvent {
  pub fn scope(&self) -> HubChannelScope {
    match self {
      Self::PatientOpen(_) => HubChannelScope::PatientOpen,
      Self::ImagingStudyOpen(_) => HubChannelScope::ImagingStudyOpen,
      Self::DiagnosticReportOpen(_) => HubChannelScope::DiagnosticReportOpen,
      Self::DiagnosticReportOpened(_) => HubChannelScope::DiagnosticReportOpened,
      Self::DiagnosticReportUpdate(_) => HubChannelScope::DiagnosticReportUpdate,
    }
  }

  pub fn topic(&self) -> &str {
    match self {
      Self::PatientOpen(e) => &e.topic,
      Self::ImagingStudyOpen(e) => &e.topic,
      Self::DiagnosticReportOpen(e) => &e.topic,
      Self::DiagnosticReportOpened(e) => &e.topic,
      Self::DiagnosticReportUpdate(e) => &e.topic,
    }
  }

  pub fn context(&self) -> &[ResourceFragment] {
    match self {
      Self::PatientOpen(e) => &e.context,
      Self::ImagingStudyOpen(e) => &e.context,
      Self::DiagnosticReportOpen(e) => &e.context,
      Self::DiagnosticReportOpened(e) => &e.context,
      Self::DiagnosticReportUpdate(e) => &e.context,
    }
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The envelope every FHIRcast notification travels in.
///
/// `id` and `timestamp` are carried through untouched; nothing in this crate
/// orders or deduplicates by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FhirCastMessage {
  pub timestamp: DateTime<FixedOffset>,
  pub id:        Uuid,
  pub event:     HubEvent,
}

impl FhirCastMessage {
  /// Wrap `event` with a fresh v4 id and the current UTC time.
  pub fn new(event: HubEvent) -> Self {
    Self {
      timestamp: Utc::now().fixed_offset(),
      id: Uuid::new_v4(),
      event,
    }
  }

  pub fn scope(&self) -> HubChannelScope { self.event.scope() }

  pub fn to_value(&self) -> serde_json::Value {
    // Infallible: no maps with non-string keys, no floats.
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }
}
