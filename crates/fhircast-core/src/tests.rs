//! Validation tests for [`EventModel`] against realistic FHIRcast payloads.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::{
  ErrorClass, EventModel, HubChannelScope, HubEvent, Identifier,
  ResourceFragment, ValidationError,
};

const ID: &str = "6f1c2a9e-8a4e-4f7b-9c55-6b7a3d2c1e00";
const TIMESTAMP: &str = "2024-05-01T10:00:00.000Z";

fn envelope(event: Value) -> Value {
  json!({ "timestamp": TIMESTAMP, "id": ID, "event": event })
}

fn patient() -> Value {
  json!({
    "key": "patient",
    "resource": {
      "resourceType": "Patient",
      "id": "42",
      "identifier": [{ "system": "urn:mrn", "value": "MRN-1" }],
    },
  })
}

fn study() -> Value {
  json!({
    "key": "study",
    "resource": {
      "resourceType": "ImagingStudy",
      "id": "study-1",
      "description": "CT chest",
      "started": "2024-05-01T09:30:00Z",
      "status": "available",
      "identifier": [{
        "type": { "coding": [{
          "system": "http://terminology.hl7.org/CodeSystem/v2-0203",
          "code": "ACSN",
        }] },
        "value": "ABCD",
      }],
      "subject": { "reference": "Patient/42" },
    },
  })
}

fn report() -> Value {
  json!({
    "key": "report",
    "resource": {
      "resourceType": "DiagnosticReport",
      "id": "report-1",
      "status": "preliminary",
      "subject": { "reference": "Patient/42" },
      "imagingStudy": [{ "reference": "ImagingStudy/study-1" }],
    },
  })
}

fn updates() -> Value {
  json!({
    "key": "updates",
    "resource": {
      "resourceType": "Bundle",
      "type": "transaction",
      "entry": [{
        "request": { "method": "PUT" },
        "resource": { "resourceType": "DiagnosticReport", "id": "report-1", "status": "final" },
      }],
    },
  })
}

fn outcome() -> Value {
  json!({
    "key": "OperationOutcome",
    "reference": { "reference": "DiagnosticReport/report-1" },
    "resource": {
      "resourceType": "OperationOutcome",
      "issue": [{ "severity": "information", "diagnostics": "Report opened" }],
    },
  })
}

fn sample(scope: HubChannelScope) -> Value {
  let event = match scope {
    HubChannelScope::PatientOpen => json!({
      "hub.event": "Patient-open",
      "hub.topic": "test",
      "context": [patient()],
    }),
    HubChannelScope::ImagingStudyOpen => json!({
      "hub.event": "ImagingStudy-open",
      "hub.topic": "test",
      "context": [patient(), study()],
    }),
    HubChannelScope::DiagnosticReportOpen => json!({
      "hub.event": "DiagnosticReport-open",
      "hub.topic": "test",
      "context.versionId": "v1",
      "context": [report(), study(), patient()],
    }),
    HubChannelScope::DiagnosticReportOpened => json!({
      "hub.event": "DiagnosticReport-opened",
      "hub.topic": "test",
      "context": [outcome()],
    }),
    HubChannelScope::DiagnosticReportUpdate => json!({
      "hub.event": "DiagnosticReport-update",
      "hub.topic": "test",
      "context": [report(), updates()],
    }),
  };
  envelope(event)
}

fn failures(raw: &Value) -> Vec<ValidationError> {
  EventModel::new()
    .validate(raw)
    .expect_err("payload should be rejected")
    .into_inner()
}

// ─── Valid messages ──────────────────────────────────────────────────────────

#[test]
fn every_scope_validates_and_round_trips() {
  let model = EventModel::new();
  for scope in HubChannelScope::all() {
    let message = model
      .validate(&sample(scope))
      .unwrap_or_else(|f| panic!("{scope}: {f}"));
    assert_eq!(message.scope(), scope);
    assert_eq!(message.event.topic(), "test");

    let again = model
      .validate(&message.to_value())
      .unwrap_or_else(|f| panic!("{scope} round trip: {f}"));
    assert_eq!(again.scope(), scope);
    assert_eq!(again, message);
  }
}

#[test]
fn lowercase_patient_open_scenario() {
  let raw = envelope(json!({
    "hub.event": "patient-open",
    "hub.topic": "test",
    "context": [{
      "key": "patient",
      "resource": { "resourceType": "Patient", "id": "42", "identifier": [] },
    }],
  }));

  let message = EventModel::new().validate(&raw).unwrap();
  let HubEvent::PatientOpen(event) = &message.event else {
    panic!("expected PatientOpen, got {:?}", message.event.scope());
  };
  assert_eq!(event.topic, "test");
  let [ResourceFragment::Patient { resource }] = event.context.as_slice() else {
    panic!("expected a single patient fragment");
  };
  assert_eq!(resource.id, "42");
  assert!(resource.identifier.is_empty());
  assert_eq!(message.to_value()["event"]["hub.event"], "Patient-open");
}

#[test]
fn timestamp_offsets_are_accepted_and_kept() {
  let model = EventModel::new();
  let mut raw = sample(HubChannelScope::PatientOpen);
  raw["timestamp"] = json!("2024-05-01T12:00:00+02:00");

  let message = model.validate(&raw).unwrap();
  assert_eq!(message.timestamp.offset().local_minus_utc(), 2 * 3600);
  assert_eq!(message.timestamp.to_rfc3339(), "2024-05-01T12:00:00+02:00");

  raw["timestamp"] = json!("2024-05-01");
  let failures = model.validate(&raw).unwrap_err();
  assert_eq!(failures.len(), 1);
  assert!(matches!(
    &failures.errors()[0],
    ValidationError::InvalidFormat { path, value, .. }
      if path == "timestamp" && value == "2024-05-01"
  ));
}

#[test]
fn narrowed_event_exposes_version_id() {
  let message = EventModel::new()
    .validate(&sample(HubChannelScope::DiagnosticReportOpen))
    .unwrap();
  let HubEvent::DiagnosticReportOpen(event) = message.event else {
    panic!("expected DiagnosticReport-open");
  };
  assert_eq!(event.version_id, "v1");
  let kinds: Vec<_> = event.context.iter().map(ResourceFragment::key).collect();
  assert_eq!(kinds, ["report", "study", "patient"]);
}

#[test]
fn empty_context_is_valid() {
  let raw = envelope(json!({
    "hub.event": "Patient-open",
    "hub.topic": "test",
    "context": [],
  }));
  assert!(EventModel::new().validate(&raw).is_ok());
}

#[test]
fn unknown_extra_fields_are_ignored() {
  let mut raw = sample(HubChannelScope::ImagingStudyOpen);
  raw["event"]["context"][1]["resource"]["series"] = json!([]);
  raw["extension"] = json!("x");
  assert!(EventModel::new().validate(&raw).is_ok());
}

#[test]
fn accession_number_is_reachable_after_validation() {
  let message = EventModel::new()
    .validate(&sample(HubChannelScope::ImagingStudyOpen))
    .unwrap();
  let study = message
    .event
    .context()
    .iter()
    .find_map(|f| match f {
      ResourceFragment::ImagingStudy { resource } => Some(resource),
      _ => None,
    })
    .unwrap();
  assert_eq!(study.accession_number(), Some("ABCD"));
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

#[test]
fn both_identifier_encodings_are_accepted() {
  let model = EventModel::new();
  let with_identifier = |identifier: Value| {
    envelope(json!({
      "hub.event": "Patient-open",
      "hub.topic": "test",
      "context": [{
        "key": "patient",
        "resource": { "resourceType": "Patient", "id": "42", "identifier": [identifier] },
      }],
    }))
  };

  let simple = model
    .validate(&with_identifier(json!({ "system": "urn:acc", "value": "A1" })))
    .unwrap();
  let coded = model
    .validate(&with_identifier(json!({
      "type": { "coding": [{ "system": "urn:acc", "code": "ACSN" }] },
      "value": "A1",
    })))
    .unwrap();

  let id_of = |event: &HubEvent| -> Identifier {
    match &event.context()[0] {
      ResourceFragment::Patient { resource } => resource.identifier[0].clone(),
      other => panic!("unexpected fragment {other:?}"),
    }
  };
  let (simple, coded) = (id_of(&simple.event), id_of(&coded.event));
  assert!(matches!(simple, Identifier::Simple { .. }));
  assert!(matches!(coded, Identifier::Complex { .. }));
  assert_eq!(simple.system(), coded.system());
  assert_eq!(simple.value(), coded.value());
}

#[test]
fn identifier_matching_neither_encoding_fails_once() {
  let mut raw = sample(HubChannelScope::PatientOpen);
  raw["event"]["context"][0]["resource"]["identifier"] = json!([{ "value": "A1" }]);

  let errors = failures(&raw);
  assert_eq!(errors, vec![ValidationError::NoVariantMatched {
    path:     "event.context[0].resource.identifier[0]".into(),
    expected: "identifier".into(),
  }]);
}

// ─── Envelope ────────────────────────────────────────────────────────────────

#[test]
fn missing_event_is_an_envelope_error() {
  let errors = failures(&json!({ "timestamp": TIMESTAMP, "id": ID }));
  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].class(), ErrorClass::Envelope);
}

#[test]
fn missing_hub_event_is_an_envelope_error() {
  let errors = failures(&envelope(json!({ "hub.topic": "test", "context": [] })));
  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].class(), ErrorClass::Envelope);
}

#[test]
fn non_objects_are_envelope_errors() {
  for raw in [json!(null), json!([1, 2]), json!("Patient-open"), json!({ "hub.topic": "t" })] {
    let errors = failures(&raw);
    assert!(
      errors.iter().all(|e| e.class() == ErrorClass::Envelope),
      "{raw}: {errors:?}"
    );
  }
}

#[test]
fn unparseable_text_is_an_envelope_error() {
  let failures = EventModel::new().validate_str("{not json").unwrap_err();
  assert!(failures.is_envelope());
}

#[test]
fn malformed_id_and_timestamp_are_field_errors() {
  let mut raw = sample(HubChannelScope::PatientOpen);
  raw["id"] = json!("not-a-uuid");
  raw["timestamp"] = json!("yesterday");

  let errors = failures(&raw);
  assert_eq!(errors.len(), 2);
  assert!(errors.iter().all(|e| e.class() == ErrorClass::Field));
  let paths: Vec<_> = errors.iter().filter_map(|e| e.path()).collect();
  assert_eq!(paths, ["timestamp", "id"]);
}

// ─── Discrimination ──────────────────────────────────────────────────────────

#[test]
fn unknown_event_kind_is_a_discrimination_error() {
  let errors = failures(&envelope(json!({
    "hub.event": "not-a-real-scope",
    "hub.topic": "test",
    "context": [],
  })));
  assert_eq!(errors, vec![ValidationError::UnknownEventKind {
    kind: "not-a-real-scope".into(),
  }]);
  assert_eq!(errors[0].class(), ErrorClass::Discrimination);
}

#[test]
fn non_string_event_kind_is_a_discrimination_error() {
  let errors = failures(&envelope(json!({ "hub.event": 7, "context": [] })));
  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].class(), ErrorClass::Discrimination);
}

#[test]
fn forbidden_fragment_is_reported_once_and_validation_continues() {
  let mut broken_study = study();
  broken_study["resource"]["started"] = json!("not a date");
  let raw = envelope(json!({
    "hub.event": "DiagnosticReport-open",
    "hub.topic": "test",
    "context.versionId": "v1",
    "context": [report(), outcome(), broken_study],
  }));

  let errors = failures(&raw);
  let discrimination: Vec<_> = errors
    .iter()
    .filter(|e| e.class() == ErrorClass::Discrimination)
    .collect();
  assert_eq!(discrimination.len(), 1);
  assert!(matches!(
    discrimination[0],
    ValidationError::InvalidContextEntry { index: 1, .. }
  ));

  // The entry after the forbidden one was still checked.
  assert!(errors.iter().any(|e| matches!(
    e,
    ValidationError::InvalidFormat { path, .. } if path == "event.context[2].resource.started"
  )));
  assert_eq!(errors.len(), 2);
}

#[test]
fn unknown_and_missing_keys_are_context_errors() {
  let raw = envelope(json!({
    "hub.event": "ImagingStudy-open",
    "hub.topic": "test",
    "context": [
      { "key": "encounter", "resource": {} },
      { "resource": {} },
      "patient",
      { "key": "Patient", "resource": {} },
    ],
  }));
  let errors = failures(&raw);
  let indices: Vec<_> = errors
    .iter()
    .map(|e| match e {
      ValidationError::InvalidContextEntry { index, .. } => *index,
      other => panic!("unexpected {other:?}"),
    })
    .collect();
  assert_eq!(indices, [0, 1, 2, 3]);
}

#[test]
fn fragment_permission_follows_event_kind() {
  let model = EventModel::new();
  let cases = [
    ("Patient-open", study()),
    ("ImagingStudy-open", report()),
    ("DiagnosticReport-opened", patient()),
    ("DiagnosticReport-update", patient()),
  ];
  for (kind, entry) in cases {
    let raw = envelope(json!({ "hub.event": kind, "hub.topic": "t", "context": [entry] }));
    let errors = model.validate(&raw).unwrap_err();
    assert_eq!(errors.count(ErrorClass::Discrimination), 1, "{kind}");
  }
}

// ─── Field checks ────────────────────────────────────────────────────────────

#[test]
fn all_field_failures_are_collected() {
  let raw = envelope(json!({
    "hub.event": "DiagnosticReport-open",
    "context": [
      {
        "key": "report",
        "resource": {
          "resourceType": "DiagnosticReport",
          "id": 17,
          "subject": { "reference": "Patient/42" },
          "imagingStudy": [],
        },
      },
      {
        "key": "patient",
        "resource": { "resourceType": "Practitioner", "id": "p", "identifier": [] },
      },
    ],
  }));

  let errors = failures(&raw);
  let rendered: Vec<_> = errors.iter().map(ToString::to_string).collect();
  assert_eq!(rendered, [
    "event[\"hub.topic\"]: required field is missing",
    "event[\"context.versionId\"]: required field is missing",
    "event.context[0].resource.id: expected string, found number",
    "event.context[0].resource.status: required field is missing",
    "event.context[1].resource.resourceType: expected \"Patient\", found \"Practitioner\"",
  ]);
  assert!(errors.iter().all(|e| e.class() == ErrorClass::Field));
}

#[test]
fn context_must_be_an_array() {
  let errors = failures(&envelope(json!({
    "hub.event": "Patient-open",
    "hub.topic": "test",
    "context": {},
  })));
  assert_eq!(errors, vec![ValidationError::TypeMismatch {
    path:     "event.context".into(),
    expected: "array".into(),
    actual:   "object".into(),
  }]);
}

#[test]
fn bundle_entries_must_be_puts() {
  let mut raw = sample(HubChannelScope::DiagnosticReportUpdate);
  raw["event"]["context"][1]["resource"]["entry"][0]["request"]["method"] = json!("POST");
  let errors = failures(&raw);
  assert_eq!(errors.len(), 1);
  assert_eq!(
    errors[0].path(),
    Some("event.context[1].resource.entry[0].request.method")
  );
}

#[test]
fn operation_outcome_requires_entry_reference() {
  let mut raw = sample(HubChannelScope::DiagnosticReportOpened);
  raw["event"]["context"][0]
    .as_object_mut()
    .unwrap()
    .remove("reference");
  let errors = failures(&raw);
  assert_eq!(errors, vec![ValidationError::MissingRequiredField {
    path: "event.context[0].reference".into(),
  }]);
}

#[test]
fn permitted_table() {
  use crate::resource::FragmentKind as K;
  let model = EventModel::new();
  assert_eq!(model.permitted(HubChannelScope::PatientOpen), [K::Patient]);
  assert_eq!(model.permitted(HubChannelScope::DiagnosticReportOpen), [
    K::Patient,
    K::ImagingStudy,
    K::DiagnosticReport
  ]);
  assert_eq!(model.permitted(HubChannelScope::DiagnosticReportUpdate), [
    K::DiagnosticReport,
    K::Updates
  ]);
}

#[test]
fn outbound_messages_can_be_revalidated() {
  let model = EventModel::new();
  let message = model
    .validate(&sample(HubChannelScope::DiagnosticReportUpdate))
    .unwrap();
  assert!(model.validate_message(&message).is_ok());
}
