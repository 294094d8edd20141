//! A small structural schema language for untyped JSON.
//!
//! A [`Schema`] describes the expected shape of a value: type, required or
//! optional fields, string formats, and ordered alternatives. Checking never
//! stops at the first problem; every failure is appended to the caller's list
//! together with the [`JsonPath`] it was found at.
//!
//! Schemas are plain immutable values. Build them once and share them.

use std::fmt;

use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;

// ─── Paths ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Key(String),
  Index(usize),
}

/// Location of a value inside a JSON document, e.g.
/// `event.context[2].resource.id`.
///
/// Keys that themselves contain a dot are bracketed so they cannot be misread
/// as nesting: `event["hub.topic"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(Vec<Segment>);

impl JsonPath {
  pub fn root() -> Self { Self::default() }

  pub fn push_key(&mut self, key: &str) { self.0.push(Segment::Key(key.to_string())); }

  pub fn push_index(&mut self, index: usize) { self.0.push(Segment::Index(index)); }

  pub fn pop(&mut self) { self.0.pop(); }

  /// A copy of this path extended by `key`.
  pub fn key(&self, key: &str) -> Self {
    let mut next = self.clone();
    next.push_key(key);
    next
  }

  pub fn index(&self, index: usize) -> Self {
    let mut next = self.clone();
    next.push_index(index);
    next
  }
}

impl fmt::Display for JsonPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.0.is_empty() {
      return f.write_str("$");
    }
    for (i, segment) in self.0.iter().enumerate() {
      match segment {
        Segment::Index(n) => write!(f, "[{n}]")?,
        Segment::Key(k) if k.contains('.') || k.is_empty() => write!(f, "[{k:?}]")?,
        Segment::Key(k) if i == 0 => f.write_str(k)?,
        Segment::Key(k) => write!(f, ".{k}")?,
      }
    }
    Ok(())
  }
}

// ─── Formats ─────────────────────────────────────────────────────────────────

/// A string format constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  /// RFC 3339 / ISO-8601 date-time with offset.
  DateTime,
  /// Hyphenated UUID.
  Uuid,
  /// Absolute URL.
  Url,
}

impl Format {
  pub fn name(&self) -> &'static str {
    match self {
      Self::DateTime => "ISO-8601 date-time",
      Self::Uuid => "UUID",
      Self::Url => "URL",
    }
  }

  pub fn accepts(&self, value: &str) -> bool {
    match self {
      Self::DateTime => DateTime::parse_from_rfc3339(value).is_ok(),
      Self::Uuid => value.len() == 36 && Uuid::try_parse(value).is_ok(),
      Self::Url => url::Url::parse(value).is_ok(),
    }
  }
}

/// The JSON type name of `value`, as used in failure messages.
pub fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Schema {
  /// Any string, optionally constrained by a format.
  String(Option<Format>),
  /// Exactly this string.
  Literal(&'static str),
  Array(Box<Schema>),
  Object(ObjectSchema),
  /// Ordered alternatives; the first one that matches wins.
  AnyOf {
    name:    &'static str,
    options: Vec<Schema>,
  },
}

impl Schema {
  pub fn string() -> Self { Self::String(None) }

  pub fn formatted(format: Format) -> Self { Self::String(Some(format)) }

  pub fn literal(value: &'static str) -> Self { Self::Literal(value) }

  pub fn array_of(item: Schema) -> Self { Self::Array(Box::new(item)) }

  pub fn any_of(name: &'static str, options: Vec<Schema>) -> Self {
    Self::AnyOf { name, options }
  }

  /// Check `value` against this schema, appending every failure to `errors`.
  pub fn check(
    &self,
    value: &Value,
    path: &mut JsonPath,
    errors: &mut Vec<ValidationError>,
  ) {
    match self {
      Self::String(format) => {
        let Some(s) = expect_str(value, path, errors) else {
          return;
        };
        if let Some(format) = format
          && !format.accepts(s)
        {
          errors.push(ValidationError::InvalidFormat {
            path:   path.to_string(),
            format: format.name().to_string(),
            value:  s.to_string(),
          });
        }
      }
      Self::Literal(expected) => {
        let Some(s) = expect_str(value, path, errors) else {
          return;
        };
        if s != *expected {
          errors.push(ValidationError::UnexpectedValue {
            path:     path.to_string(),
            expected: expected.to_string(),
            actual:   s.to_string(),
          });
        }
      }
      Self::Array(item) => {
        let Some(items) = value.as_array() else {
          errors.push(mismatch(path, "array", value));
          return;
        };
        for (i, v) in items.iter().enumerate() {
          path.push_index(i);
          item.check(v, path, errors);
          path.pop();
        }
      }
      Self::Object(object) => object.check(value, path, errors),
      Self::AnyOf { name, options } => {
        let matched = options.iter().any(|option| {
          let mut scratch = Vec::new();
          option.check(value, path, &mut scratch);
          scratch.is_empty()
        });
        if !matched {
          errors.push(ValidationError::NoVariantMatched {
            path:     path.to_string(),
            expected: name.to_string(),
          });
        }
      }
    }
  }

  /// Convenience wrapper: check from the document root and collect failures.
  pub fn validate(&self, value: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    self.check(value, &mut JsonPath::root(), &mut errors);
    errors
  }
}

impl From<ObjectSchema> for Schema {
  fn from(object: ObjectSchema) -> Self { Self::Object(object) }
}

fn expect_str<'v>(
  value: &'v Value,
  path: &JsonPath,
  errors: &mut Vec<ValidationError>,
) -> Option<&'v str> {
  let s = value.as_str();
  if s.is_none() {
    errors.push(mismatch(path, "string", value));
  }
  s
}

fn mismatch(path: &JsonPath, expected: &str, actual: &Value) -> ValidationError {
  ValidationError::TypeMismatch {
    path:     path.to_string(),
    expected: expected.to_string(),
    actual:   type_name(actual).to_string(),
  }
}

// ─── Objects ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FieldSchema {
  name:     &'static str,
  schema:   Schema,
  required: bool,
}

/// An object with named fields. Unknown fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
  fields: Vec<FieldSchema>,
}

impl ObjectSchema {
  pub fn new() -> Self { Self::default() }

  pub fn required(mut self, name: &'static str, schema: impl Into<Schema>) -> Self {
    self.fields.push(FieldSchema {
      name,
      schema: schema.into(),
      required: true,
    });
    self
  }

  /// An optional field may be absent, but if present must match.
  pub fn optional(mut self, name: &'static str, schema: impl Into<Schema>) -> Self {
    self.fields.push(FieldSchema {
      name,
      schema: schema.into(),
      required: false,
    });
    self
  }

  pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.fields.iter().map(|f| f.name)
  }

  pub fn check(
    &self,
    value: &Value,
    path: &mut JsonPath,
    errors: &mut Vec<ValidationError>,
  ) {
    let Some(map) = value.as_object() else {
      errors.push(mismatch(path, "object", value));
      return;
    };
    for field in &self.fields {
      path.push_key(field.name);
      match map.get(field.name) {
        Some(v) => field.schema.check(v, path, errors),
        None if field.required => {
          errors.push(ValidationError::MissingRequiredField {
            path: path.to_string(),
          });
        }
        None => {}
      }
      path.pop();
    }
  }
}
