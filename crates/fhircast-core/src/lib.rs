//! Event model and validation layer for FHIRcast.
//!
//! Turns arbitrary inbound JSON into a strongly-discriminated
//! [`FhirCastMessage`], or a structured list of everything that is wrong with
//! it. This crate is free of HTTP and transport dependencies; the hub client
//! in `fhircast-client` depends on it.
//!
//! # Quick start
//!
//! ```no_run
//! use fhircast_core::{EventModel, HubEvent};
//!
//! let model = EventModel::new();
//! let raw = serde_json::json!({
//!   "timestamp": "2024-05-01T10:00:00Z",
//!   "id": "6f1c2a9e-8a4e-4f7b-9c55-6b7a3d2c1e00",
//!   "event": {
//!     "hub.event": "Patient-open",
//!     "hub.topic": "test",
//!     "context": [],
//!   },
//! });
//!
//! match model.validate(&raw) {
//!   Ok(message) => println!("valid {}", message.event.scope()),
//!   Err(failures) => eprintln!("{failures}"),
//! }
//! ```

pub mod error;
pub mod event;
pub mod model;
pub mod resource;
pub mod schema;
pub mod scope;

pub use error::{
  ErrorClass, Result, ValidationError, ValidationFailures,
};
pub use event::{
  DiagnosticReportOpen, DiagnosticReportOpened, DiagnosticReportUpdate,
  FhirCastMessage, HubEvent, ImagingStudyOpen, PatientOpen,
};
pub use model::EventModel;
pub use resource::{Identifier, ResourceFragment};
pub use scope::HubChannelScope;

#[cfg(test)]
mod tests;
