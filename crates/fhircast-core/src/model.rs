//! The event model: one immutable set of schemas and the validation entry
//! point built on them.
//!
//! Validation runs in three stages:
//!
//! 1. the envelope gate, which decides whether the payload is a FHIRcast
//!    message at all;
//! 2. discrimination on `hub.event`, selecting the event schema and the set of
//!    context fragments that kind permits;
//! 3. a structural pass over the envelope, the event fields, and every
//!    `context` entry, collecting all failures.
//!
//! Only a payload with zero failures is converted into a typed
//! [`FhirCastMessage`].

use std::collections::HashMap;

use serde_json::Value;

use crate::{
  error::{Result, ValidationError, ValidationFailures},
  event::FhirCastMessage,
  resource::FragmentKind,
  schema::{Format, JsonPath, ObjectSchema, Schema, type_name},
  scope::HubChannelScope,
};

const ENVELOPE_FIELDS: [&str; 3] = ["timestamp", "id", "event"];

/// Event-level schema for one [`HubChannelScope`].
#[derive(Debug, Clone)]
struct EventSchema {
  /// Fields of `event` other than `hub.event` and `context`.
  fields:    ObjectSchema,
  /// Fragment kinds permitted in `context`, in table order.
  permitted: Vec<FragmentKind>,
}

/// Immutable FHIRcast schemas plus the dispatch table keyed by event kind.
///
/// Construct once and share by reference (or `Arc`); nothing mutates it after
/// [`EventModel::new`].
#[derive(Debug, Clone)]
pub struct EventModel {
  envelope:  ObjectSchema,
  events:    HashMap<HubChannelScope, EventSchema>,
  fragments: HashMap<FragmentKind, ObjectSchema>,
}

impl Default for EventModel {
  fn default() -> Self { Self::new() }
}

impl EventModel {
  pub fn new() -> Self {
    let envelope = ObjectSchema::new()
      .required("timestamp", Schema::formatted(Format::DateTime))
      .required("id", Schema::formatted(Format::Uuid));

    let events = HubChannelScope::all()
      .map(|scope| (scope, event_schema(scope)))
      .collect();

    let fragments = FragmentKind::ALL
      .into_iter()
      .map(|kind| (kind, fragment_schema(kind)))
      .collect();

    Self {
      envelope,
      events,
      fragments,
    }
  }

  /// The context fragment kinds `scope` permits.
  pub fn permitted(&self, scope: HubChannelScope) -> &[FragmentKind] {
    self
      .events
      .get(&scope)
      .map(|e| e.permitted.as_slice())
      .unwrap_or_default()
  }

  /// Validate an arbitrary JSON value as a FHIRcast message.
  ///
  /// Envelope and event-kind failures are returned alone. Every other failure
  /// in the message is collected and returned together.
  pub fn validate(&self, raw: &Value) -> Result<FhirCastMessage> {
    let event = envelope_gate(raw).map_err(ValidationFailures::single)?;
    let scope = discriminate(event).map_err(ValidationFailures::single)?;
    let Some(schema) = self.events.get(&scope) else {
      return Err(ValidationFailures::single(ValidationError::UnknownEventKind {
        kind: scope.as_str().to_string(),
      }));
    };

    let mut errors = Vec::new();
    let mut path = JsonPath::root();
    self.envelope.check(raw, &mut path, &mut errors);

    path.push_key("event");
    schema.fields.check(event, &mut path, &mut errors);
    path.push_key("context");
    match event.get("context") {
      None => errors.push(ValidationError::MissingRequiredField {
        path: path.to_string(),
      }),
      Some(Value::Array(entries)) => {
        for (index, entry) in entries.iter().enumerate() {
          path.push_index(index);
          self.check_entry(scope, &schema.permitted, index, entry, &mut path, &mut errors);
          path.pop();
        }
      }
      Some(other) => errors.push(ValidationError::TypeMismatch {
        path:     path.to_string(),
        expected: "array".to_string(),
        actual:   type_name(other).to_string(),
      }),
    }

    if !errors.is_empty() {
      return Err(ValidationFailures::new(errors));
    }
    self.materialise(raw, scope)
  }

  /// Parse `text` as JSON, then [`validate`](Self::validate) it. Text that is
  /// not JSON at all is a malformed envelope.
  pub fn validate_str(&self, text: &str) -> Result<FhirCastMessage> {
    let raw: Value = serde_json::from_str(text).map_err(|e| {
      ValidationFailures::single(ValidationError::malformed(format!(
        "payload is not JSON: {e}"
      )))
    })?;
    self.validate(&raw)
  }

  /// Re-check a constructed message, e.g. before it is published.
  pub fn validate_message(&self, message: &FhirCastMessage) -> Result<()> {
    self.validate(&message.to_value()).map(|_| ())
  }

  fn check_entry(
    &self,
    scope: HubChannelScope,
    permitted: &[FragmentKind],
    index: usize,
    entry: &Value,
    path: &mut JsonPath,
    errors: &mut Vec<ValidationError>,
  ) {
    let invalid = |reason: String| ValidationError::InvalidContextEntry { index, reason };

    let Some(map) = entry.as_object() else {
      errors.push(invalid(format!("expected an object, found {}", type_name(entry))));
      return;
    };
    let key = match map.get("key") {
      Some(Value::String(key)) => key,
      Some(other) => {
        errors.push(invalid(format!("`key` must be a string, found {}", type_name(other))));
        return;
      }
      None => {
        errors.push(invalid("missing `key`".to_string()));
        return;
      }
    };
    let Some(kind) = FragmentKind::from_key(key) else {
      errors.push(invalid(format!("unknown fragment key {key:?}")));
      return;
    };
    if !permitted.contains(&kind) {
      let allowed: Vec<_> = permitted.iter().map(FragmentKind::key).collect();
      errors.push(invalid(format!(
        "fragment {key:?} is not permitted in {scope} (expected one of: {})",
        allowed.join(", ")
      )));
      return;
    }
    if let Some(schema) = self.fragments.get(&kind) {
      schema.check(entry, path, errors);
    }
  }

  /// Convert a structurally valid payload into its typed form.
  fn materialise(&self, raw: &Value, scope: HubChannelScope) -> Result<FhirCastMessage> {
    // `hub.event` matched case-insensitively; the typed form only knows the
    // canonical spelling.
    let mut normalised = raw.clone();
    if let Some(event) = normalised.get_mut("event").and_then(Value::as_object_mut) {
      event.insert("hub.event".to_string(), Value::from(scope.as_str()));
    }
    serde_json::from_value(normalised).map_err(|e| {
      ValidationFailures::single(ValidationError::malformed(format!(
        "payload passed validation but could not be decoded: {e}"
      )))
    })
  }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Decide whether `raw` is FHIRcast-shaped; returns the `event` object.
fn envelope_gate(raw: &Value) -> std::result::Result<&Value, ValidationError> {
  let Some(map) = raw.as_object() else {
    return Err(ValidationError::malformed(format!(
      "expected a JSON object, found {}",
      type_name(raw)
    )));
  };
  let missing: Vec<_> = ENVELOPE_FIELDS
    .into_iter()
    .filter(|field| !map.contains_key(*field))
    .collect();
  if !missing.is_empty() {
    return Err(ValidationError::malformed(format!(
      "missing {}",
      missing.join(", ")
    )));
  }
  let event = &map["event"];
  let Some(event_map) = event.as_object() else {
    return Err(ValidationError::malformed(format!(
      "`event` must be an object, found {}",
      type_name(event)
    )));
  };
  if !event_map.contains_key("hub.event") {
    return Err(ValidationError::malformed("`event` has no `hub.event`"));
  }
  Ok(event)
}

fn discriminate(event: &Value) -> std::result::Result<HubChannelScope, ValidationError> {
  match &event["hub.event"] {
    Value::String(kind) => HubChannelScope::from_wire(kind)
      .ok_or_else(|| ValidationError::UnknownEventKind { kind: kind.clone() }),
    other => Err(ValidationError::UnknownEventKind {
      kind: other.to_string(),
    }),
  }
}

// ─── Schema definitions ──────────────────────────────────────────────────────

fn event_schema(scope: HubChannelScope) -> EventSchema {
  use FragmentKind as K;

  let fields = ObjectSchema::new().required("hub.topic", Schema::string());
  match scope {
    HubChannelScope::PatientOpen => EventSchema {
      fields,
      permitted: vec![K::Patient],
    },
    HubChannelScope::ImagingStudyOpen => EventSchema {
      fields,
      permitted: vec![K::Patient, K::ImagingStudy],
    },
    HubChannelScope::DiagnosticReportOpen => EventSchema {
      fields:    fields.required("context.versionId", Schema::string()),
      permitted: vec![K::Patient, K::ImagingStudy, K::DiagnosticReport],
    },
    HubChannelScope::DiagnosticReportOpened => EventSchema {
      fields,
      permitted: vec![K::OperationOutcome],
    },
    HubChannelScope::DiagnosticReportUpdate => EventSchema {
      fields,
      permitted: vec![K::DiagnosticReport, K::Updates],
    },
  }
}

fn reference() -> ObjectSchema {
  ObjectSchema::new().required("reference", Schema::string())
}

fn identifier() -> Schema {
  let coding = ObjectSchema::new()
    .required("system", Schema::string())
    .required("code", Schema::string());
  let complex = ObjectSchema::new()
    .required(
      "type",
      ObjectSchema::new().required("coding", Schema::array_of(coding.into())),
    )
    .optional("value", Schema::string());
  let simple = ObjectSchema::new()
    .required("system", Schema::string())
    .required("value", Schema::string());
  Schema::any_of("identifier", vec![complex.into(), simple.into()])
}

fn resource(resource_type: &'static str) -> ObjectSchema {
  ObjectSchema::new().required("resourceType", Schema::literal(resource_type))
}

/// Schema for a whole context entry of `kind`; `key` is checked separately.
fn fragment_schema(kind: FragmentKind) -> ObjectSchema {
  let body = match kind {
    FragmentKind::Patient => resource("Patient")
      .required("id", Schema::string())
      .required("identifier", Schema::array_of(identifier())),
    FragmentKind::ImagingStudy => resource("ImagingStudy")
      .required("id", Schema::string())
      .required("description", Schema::string())
      .required("started", Schema::formatted(Format::DateTime))
      .required("status", Schema::string())
      .required("identifier", Schema::array_of(identifier()))
      .required("subject", reference()),
    FragmentKind::DiagnosticReport => resource("DiagnosticReport")
      .required("id", Schema::string())
      .required("status", Schema::string())
      .required("subject", reference())
      .required("imagingStudy", Schema::array_of(reference().into())),
    FragmentKind::Updates => {
      let entry = ObjectSchema::new()
        .required(
          "request",
          ObjectSchema::new().required("method", Schema::literal("PUT")),
        )
        .required(
          "resource",
          resource("DiagnosticReport")
            .required("id", Schema::string())
            .required("status", Schema::string()),
        );
      resource("Bundle")
        .required("type", Schema::literal("transaction"))
        .required("entry", Schema::array_of(entry.into()))
    }
    FragmentKind::OperationOutcome => {
      let issue = ObjectSchema::new()
        .required("severity", Schema::string())
        .required("diagnostics", Schema::string());
      resource("OperationOutcome").required("issue", Schema::array_of(issue.into()))
    }
  };

  let entry = ObjectSchema::new();
  let entry = if kind == FragmentKind::OperationOutcome {
    entry.required("reference", reference())
  } else {
    entry
  };
  entry.required("resource", body)
}
