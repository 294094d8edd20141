//! Hub channel scopes: the FHIRcast event vocabulary.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use strum::{EnumIter, IntoEnumIterator};

/// One discrete FHIRcast event kind. The discriminant of [`crate::HubEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum HubChannelScope {
  PatientOpen,
  ImagingStudyOpen,
  DiagnosticReportOpen,
  DiagnosticReportOpened,
  DiagnosticReportUpdate,
}

impl HubChannelScope {
  /// The canonical `hub.event` wire string.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::PatientOpen => "Patient-open",
      Self::ImagingStudyOpen => "ImagingStudy-open",
      Self::DiagnosticReportOpen => "DiagnosticReport-open",
      Self::DiagnosticReportOpened => "DiagnosticReport-opened",
      Self::DiagnosticReportUpdate => "DiagnosticReport-update",
    }
  }

  /// Every scope, in declaration order.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  /// Resolve a `hub.event` value.
  ///
  /// FHIRcast event names are case-insensitive, so `patient-open` resolves to
  /// [`HubChannelScope::PatientOpen`].
  pub fn from_wire(value: &str) -> Option<Self> {
    Self::iter().find(|scope| scope.as_str().eq_ignore_ascii_case(value))
  }

  /// Comma-joined list of every scope, as sent in `hub.events`.
  pub fn joined(scopes: &[Self]) -> String {
    scopes
      .iter()
      .map(Self::as_str)
      .collect::<Vec<_>>()
      .join(",")
  }
}

impl fmt::Display for HubChannelScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for HubChannelScope {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for HubChannelScope {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Self::from_wire(&raw)
      .ok_or_else(|| de::Error::custom(format!("unknown hub event {raw:?}")))
  }
}
