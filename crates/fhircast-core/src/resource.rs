//! FHIR resource fragments carried in a FHIRcast event `context`.
//!
//! These are deliberately minimal: only the elements FHIRcast imaging
//! workflows exchange are modelled. Every resource struct emits its
//! `resourceType` when serialized.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// HL7 v2 table 0203 (identifier type), used for accession numbers.
pub const IDENTIFIER_TYPE_SYSTEM: &str =
  "http://terminology.hl7.org/CodeSystem/v2-0203";

/// Identifier type code for an accession number.
pub const ACCESSION_CODE: &str = "ACSN";

// ─── Datatypes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
  pub reference: String,
}

impl Reference {
  pub fn new(reference: impl Into<String>) -> Self {
    Self {
      reference: reference.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
  pub system: String,
  pub code:   String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeableConcept {
  pub coding: Vec<Coding>,
}

/// An external identifier under some coding system.
///
/// The two forms are alternative encodings of the same concept: the coded
/// form nests the system under `type.coding`, the simple form carries it
/// inline. Deserialization tries the coded form first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
  Complex {
    #[serde(rename = "type")]
    kind:  CodeableConcept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
  },
  Simple {
    system: String,
    value:  String,
  },
}

impl Identifier {
  /// An accession number in the coded form.
  pub fn accession(value: impl Into<String>) -> Self {
    Self::Complex {
      kind:  CodeableConcept {
        coding: vec![Coding {
          system: IDENTIFIER_TYPE_SYSTEM.to_string(),
          code:   ACCESSION_CODE.to_string(),
        }],
      },
      value: Some(value.into()),
    }
  }

  /// The coding system, taken from the first coding of the coded form.
  pub fn system(&self) -> Option<&str> {
    match self {
      Self::Complex { kind, .. } => kind.coding.first().map(|c| c.system.as_str()),
      Self::Simple { system, .. } => Some(system),
    }
  }

  pub fn value(&self) -> Option<&str> {
    match self {
      Self::Complex { value, .. } => value.as_deref(),
      Self::Simple { value, .. } => Some(value),
    }
  }

  pub fn is_accession(&self) -> bool {
    match self {
      Self::Complex { kind, .. } => kind
        .coding
        .iter()
        .any(|c| c.system == IDENTIFIER_TYPE_SYSTEM && c.code == ACCESSION_CODE),
      Self::Simple { .. } => false,
    }
  }
}

// ─── Resources ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "Patient")]
pub struct Patient {
  pub id:         String,
  pub identifier: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "ImagingStudy")]
pub struct ImagingStudy {
  pub id:          String,
  pub description: String,
  pub started:     DateTime<FixedOffset>,
  pub status:      String,
  pub identifier:  Vec<Identifier>,
  pub subject:     Reference,
}

impl ImagingStudy {
  /// The first accession-number identifier, if any.
  pub fn accession_number(&self) -> Option<&str> {
    self
      .identifier
      .iter()
      .find(|i| i.is_accession())
      .and_then(Identifier::value)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
  tag = "resourceType",
  rename = "DiagnosticReport",
  rename_all = "camelCase"
)]
pub struct DiagnosticReport {
  pub id:            String,
  pub status:        String,
  pub subject:       Reference,
  pub imaging_study: Vec<Reference>,
}

/// The minimal report carried in a `DiagnosticReport-update` bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "DiagnosticReport")]
pub struct DiagnosticReportStatusUpdate {
  pub id:     String,
  pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
  Transaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
  Put,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRequest {
  pub method: HttpVerb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
  pub request:  BundleRequest,
  pub resource: DiagnosticReportStatusUpdate,
}

/// A transaction bundle of report updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "Bundle")]
pub struct Bundle {
  #[serde(rename = "type")]
  pub kind:  BundleType,
  pub entry: Vec<BundleEntry>,
}

impl Bundle {
  /// A transaction that PUTs each report.
  pub fn transaction(
    reports: impl IntoIterator<Item = DiagnosticReportStatusUpdate>,
  ) -> Self {
    Self {
      kind:  BundleType::Transaction,
      entry: reports
        .into_iter()
        .map(|resource| BundleEntry {
          request: BundleRequest {
            method: HttpVerb::Put,
          },
          resource,
        })
        .collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
  pub severity:    String,
  pub diagnostics: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename = "OperationOutcome")]
pub struct OperationOutcome {
  pub issue: Vec<Issue>,
}

// ─── Context fragments ───────────────────────────────────────────────────────

/// The kind of a [`ResourceFragment`], i.e. its `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
  Patient,
  ImagingStudy,
  DiagnosticReport,
  Updates,
  OperationOutcome,
}

impl FragmentKind {
  pub const ALL: [Self; 5] = [
    Self::Patient,
    Self::ImagingStudy,
    Self::DiagnosticReport,
    Self::Updates,
    Self::OperationOutcome,
  ];

  /// The `key` wire value. Must match the serde renames on
  /// [`ResourceFragment`].
  pub fn key(&self) -> &'static str {
    match self {
      Self::Patient => "patient",
      Self::ImagingStudy => "study",
      Self::DiagnosticReport => "report",
      Self::Updates => "updates",
      Self::OperationOutcome => "OperationOutcome",
    }
  }

  /// Keys compare exactly.
  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.key() == key)
  }
}

/// One entry of an event `context`, tagged by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
pub enum ResourceFragment {
  #[serde(rename = "patient")]
  Patient { resource: Patient },
  #[serde(rename = "study")]
  ImagingStudy { resource: ImagingStudy },
  #[serde(rename = "report")]
  DiagnosticReport { resource: DiagnosticReport },
  #[serde(rename = "updates")]
  Updates { resource: Bundle },
  /// Acknowledges that a report was opened.
  OperationOutcome {
    reference: Reference,
    resource:  OperationOutcome,
  },
}

impl ResourceFragment {
  pub fn kind(&self) -> FragmentKind {
    match self {
      Self::Patient { .. } => FragmentKind::Patient,
      Self::ImagingStudy { .. } => FragmentKind::ImagingStudy,
      Self::DiagnosticReport { .. } => FragmentKind::DiagnosticReport,
      Self::Updates { .. } => FragmentKind::Updates,
      Self::OperationOutcome { .. } => FragmentKind::OperationOutcome,
    }
  }

  pub fn key(&self) -> &'static str { self.kind().key() }
}
